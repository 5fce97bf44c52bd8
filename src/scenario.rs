//! JSON scenario files
//!
//! A scenario is a named list of steps replayed against a fresh [`Harness`]:
//!
//! ```json
//! {
//!   "name": "static link in a subproject",
//!   "tree": "basic",
//!   "steps": [
//!     { "run": { "subdir": "lib", "args": "link=static" } },
//!     { "expect_addition": "lib/bin/$toolset/debug/link-static/lib.a" },
//!     "expect_nothing_more"
//!   ]
//! }
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use jamcheck_core::{ExpectedPaths, MatchMode};
use serde::Deserialize;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::harness::{Harness, RunOptions};
use crate::invoker::ExitExpectation;

/// A parsed scenario file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    /// Fixture tree seeded before the first step
    #[serde(default)]
    pub tree: Option<String>,
    /// Overrides the configured match mode
    #[serde(default, rename = "match")]
    pub match_mode: Option<ScenarioMatch>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioMatch {
    Exact,
    #[serde(alias = "at_least")]
    AtLeast,
}

impl From<ScenarioMatch> for MatchMode {
    fn from(value: ScenarioMatch) -> Self {
        match value {
            ScenarioMatch::Exact => MatchMode::Exact,
            ScenarioMatch::AtLeast => MatchMode::AtLeast,
        }
    }
}

/// One scenario step
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Write { path: String, content: String },
    Seed(String),
    Copy { from: String, to: String },
    Remove(String),
    Ignore(String),
    Run(RunStep),
    ExpectAddition(PathSpec),
    ExpectRemoval(PathSpec),
    ExpectNothing,
    ExpectNothingMore,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Write { path, .. } => write!(f, "write {}", path),
            Step::Seed(tree) => write!(f, "seed {}", tree),
            Step::Copy { from, to } => write!(f, "copy {} -> {}", from, to),
            Step::Remove(path) => write!(f, "remove {}", path),
            Step::Ignore(pattern) => write!(f, "ignore {}", pattern),
            Step::Run(run) => {
                f.write_str("run")?;
                if !run.subdir.is_empty() {
                    write!(f, " in {}", run.subdir)?;
                }
                for arg in run.args.to_vec() {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
            Step::ExpectAddition(_) => f.write_str("expect_addition"),
            Step::ExpectRemoval(_) => f.write_str("expect_removal"),
            Step::ExpectNothing => f.write_str("expect_nothing"),
            Step::ExpectNothingMore => f.write_str("expect_nothing_more"),
        }
    }
}

/// Arguments of a `run` step
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunStep {
    #[serde(default)]
    pub subdir: String,
    #[serde(default)]
    pub args: Words,
    /// Exact exit code the build must return
    #[serde(default)]
    pub status: Option<i32>,
    #[serde(default)]
    pub expect_failure: bool,
}

impl RunStep {
    pub fn options(&self) -> RunOptions {
        let status = match (self.status, self.expect_failure) {
            (Some(code), _) => ExitExpectation::Code(code),
            (None, true) => ExitExpectation::Failure,
            (None, false) => ExitExpectation::Success,
        };
        self.args
            .to_vec()
            .into_iter()
            .fold(RunOptions::new().subdir(self.subdir.as_str()), |options, arg| options.arg(arg))
            .status(status)
    }
}

/// A whitespace-separated string or an explicit list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Words {
    Joined(String),
    List(Vec<String>),
}

impl Default for Words {
    fn default() -> Self {
        Words::List(Vec::new())
    }
}

impl Words {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Words::Joined(words) => words.split_whitespace().map(str::to_string).collect(),
            Words::List(words) => words.clone(),
        }
    }
}

/// Expected paths as written in a scenario
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PathSpec {
    Path(String),
    List(Vec<PathSpec>),
    Product { prefix: String, suffixes: Words },
}

impl From<&PathSpec> for ExpectedPaths {
    fn from(spec: &PathSpec) -> Self {
        match spec {
            PathSpec::Path(path) => ExpectedPaths::from(path.as_str()),
            PathSpec::List(specs) => ExpectedPaths::Union(specs.iter().map(ExpectedPaths::from).collect()),
            PathSpec::Product { prefix, suffixes } => ExpectedPaths::product_split(prefix.as_str(), suffixes.to_vec()),
        }
    }
}

impl Scenario {
    /// Read and parse a scenario file
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| HarnessError::Scenario {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&text, path)
    }

    /// Parse scenario JSON; `origin` is only used in error messages
    pub fn from_json(text: &str, origin: &Path) -> HarnessResult<Self> {
        serde_json::from_str(text).map_err(|e| HarnessError::Scenario {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Replay the scenario against a fresh harness. The harness is closed before returning.
    #[tracing::instrument(skip_all, fields(scenario = %self.name))]
    pub fn execute(&self, config: &HarnessConfig) -> ScenarioRun {
        let start = Instant::now();
        let mut config = config.clone();
        if let Some(mode) = self.match_mode {
            config.match_mode = mode.into();
        }

        let mut run = ScenarioRun {
            name: self.name.clone(),
            duration: Duration::ZERO,
            failure: None,
            last_output: None,
        };

        let mut harness = match Harness::new(config) {
            Ok(harness) => harness,
            Err(error) => {
                run.failure = Some(StepFailure {
                    index: None,
                    step: "create workspace".to_string(),
                    error,
                });
                run.duration = start.elapsed();
                return run;
            }
        };

        if let Some(tree) = &self.tree {
            if let Err(error) = harness.seed_tree(tree) {
                run.failure = Some(StepFailure {
                    index: None,
                    step: format!("seed {}", tree),
                    error,
                });
            }
        }

        if run.failure.is_none() {
            for (index, step) in self.steps.iter().enumerate() {
                tracing::debug!(index, step = %step, "step");
                if let Err(error) = apply(&mut harness, step) {
                    run.failure = Some(StepFailure {
                        index: Some(index),
                        step: step.to_string(),
                        error,
                    });
                    break;
                }
            }
        }

        run.last_output = harness.last_run().map(|record| record.output.clone());
        harness.close();
        run.duration = start.elapsed();
        run
    }
}

fn apply(harness: &mut Harness, step: &Step) -> HarnessResult<()> {
    match step {
        Step::Write { path, content } => harness.write(path, content),
        Step::Seed(tree) => harness.seed_tree(tree),
        Step::Copy { from, to } => harness.copy(from, to),
        Step::Remove(path) => harness.remove(path),
        Step::Ignore(pattern) => harness.ignore(pattern),
        Step::Run(run) => harness.run_build_system(run.options()).map(|_| ()),
        Step::ExpectAddition(paths) => harness.expect_addition(ExpectedPaths::from(paths)),
        Step::ExpectRemoval(paths) => harness.expect_removal(ExpectedPaths::from(paths)),
        Step::ExpectNothing => harness.expect_nothing(),
        Step::ExpectNothingMore => harness.expect_nothing_more(),
    }
}

/// Outcome of one scenario
#[derive(Debug)]
pub struct ScenarioRun {
    pub name: String,
    pub duration: Duration,
    pub failure: Option<StepFailure>,
    /// Output of the last build invocation, if any ran
    pub last_output: Option<String>,
}

impl ScenarioRun {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// The step that stopped a scenario
#[derive(Debug)]
pub struct StepFailure {
    /// Position in `steps`; `None` for workspace creation and the initial tree
    pub index: Option<usize>,
    pub step: String,
    pub error: HarnessError,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "step {} ({}): {}", index + 1, self.step, self.error),
            None => write!(f, "{}: {}", self.step, self.error),
        }
    }
}

/// Scenario files under `path`: the file itself, or every `*.json` below a directory, sorted
pub fn discover_scenarios(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}
