//! Scenario runner (pytest-style)
//!
//! ## ScenarioReporter Trait
//!
//! The runner uses a `ScenarioReporter` trait to separate reporting from
//! execution. This allows for custom output formats (JSON, TAP, etc.) by
//! implementing the trait.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::{CliError, CliResult, ExitCode};
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::scenario::{Scenario, ScenarioRun, discover_scenarios};

// ============================================================================
// Scenario Reporter Trait
// ============================================================================

/// Trait for reporting scenario results.
///
/// Implement this trait to customize output format (JSON, TAP, etc.)
pub trait ScenarioReporter {
    /// Called when scenario discovery is complete
    fn on_collection_complete(&mut self, scenario_count: usize);

    /// Called when a scenario file cannot be read or parsed
    fn on_load_error(&mut self, path: &Path, error: &HarnessError);

    /// Called when a scenario begins
    fn on_scenario_start(&mut self, _path: &Path, _scenario: &Scenario) {}

    /// Called when a scenario completes
    fn on_scenario_complete(&mut self, path: &Path, run: &ScenarioRun);

    /// Called when all scenarios have completed
    fn on_run_complete(&mut self, summary: &RunSummary);
}

/// Summary of a scenario run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Files that could not be loaded
    pub errors: usize,
    pub duration: Duration,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

/// Default console reporter (pytest-style)
#[derive(Default)]
pub struct ConsoleReporter {
    pub verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ScenarioReporter for ConsoleReporter {
    fn on_collection_complete(&mut self, scenario_count: usize) {
        if scenario_count == 0 {
            eprintln!("No scenarios collected");
        } else {
            eprintln!("collected {} scenario(s)", scenario_count);
        }
    }

    fn on_load_error(&mut self, path: &Path, error: &HarnessError) {
        eprintln!("\x1b[31mERROR\x1b[0m {}: {}", path.display(), error);
    }

    fn on_scenario_start(&mut self, path: &Path, scenario: &Scenario) {
        if self.verbose {
            eprint!("{}::{} ... ", file_name(path), scenario.name);
        }
    }

    fn on_scenario_complete(&mut self, _path: &Path, run: &ScenarioRun) {
        let status = match (run.passed(), self.verbose) {
            (true, true) => format!("\x1b[32mPASSED\x1b[0m ({:.0}ms)", run.duration.as_millis()),
            (true, false) => "\x1b[32m.\x1b[0m".to_string(),
            (false, true) => format!("\x1b[31mFAILED\x1b[0m ({:.0}ms)", run.duration.as_millis()),
            (false, false) => "\x1b[31mF\x1b[0m".to_string(),
        };

        if self.verbose {
            eprintln!("{}", status);
        } else {
            eprint!("{}", status);
        }

        // Print failure details
        if !run.passed() {
            eprintln!("\n{}", render_failure(run));
        }
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        if !self.verbose {
            eprintln!();
        }

        let mut parts = Vec::new();
        if summary.passed > 0 {
            parts.push(format!("\x1b[32m{} passed\x1b[0m", summary.passed));
        }
        if summary.failed > 0 {
            parts.push(format!("\x1b[31m{} failed\x1b[0m", summary.failed));
        }
        if summary.errors > 0 {
            parts.push(format!("\x1b[31m{} errors\x1b[0m", summary.errors));
        }
        if parts.is_empty() {
            parts.push("no scenarios ran".to_string());
        }

        eprintln!(
            "====== {} in {:.2}s ======",
            parts.join(", "),
            summary.duration.as_secs_f64()
        );
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("unknown")
}

/// Plain-text failure report: the failing step, the mismatch, and the last build output.
pub fn render_failure(run: &ScenarioRun) -> String {
    let mut out = format!("____ {} ____\n", run.name);
    if let Some(failure) = &run.failure {
        out.push_str(&failure.to_string());
        out.push('\n');
    }
    if let Some(output) = &run.last_output {
        out.push_str("---- last build output ----\n");
        out.push_str(output);
        if !output.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Run every scenario under `paths` with `config` and report to the console.
pub fn run_scenarios(paths: &[PathBuf], config: &HarnessConfig, verbose: bool, stop_on_fail: bool) -> CliResult<ExitCode> {
    let mut reporter = ConsoleReporter::new(verbose);
    let summary = run_with_reporter(paths, config, stop_on_fail, &mut reporter)?;
    if summary.success() {
        Ok(ExitCode::SUCCESS)
    } else {
        // Summary already printed
        Err(CliError::new("", ExitCode::FAILURE))
    }
}

/// Run every scenario under `paths`, reporting through `reporter`.
///
/// ## Errors
/// - When no scenario files exist under `paths`.
pub fn run_with_reporter(
    paths: &[PathBuf],
    config: &HarnessConfig,
    stop_on_fail: bool,
    reporter: &mut dyn ScenarioReporter,
) -> CliResult<RunSummary> {
    let start = Instant::now();
    let files: Vec<PathBuf> = paths.iter().flat_map(|p| discover_scenarios(p)).collect();
    if files.is_empty() {
        return Err(CliError::failure(format!(
            "No scenario files found in {}",
            paths.iter().map(|p| format!("'{}'", p.display())).collect::<Vec<_>>().join(", ")
        )));
    }
    reporter.on_collection_complete(files.len());

    let mut summary = RunSummary::default();
    for file in &files {
        summary.total += 1;
        let scenario = match Scenario::load(file) {
            Ok(scenario) => scenario,
            Err(err) => {
                reporter.on_load_error(file, &err);
                summary.errors += 1;
                if stop_on_fail {
                    break;
                }
                continue;
            }
        };

        reporter.on_scenario_start(file, &scenario);
        let run = scenario.execute(config);
        reporter.on_scenario_complete(file, &run);

        if run.passed() {
            summary.passed += 1;
        } else {
            summary.failed += 1;
            if stop_on_fail {
                break;
            }
        }
    }

    summary.duration = start.elapsed();
    reporter.on_run_complete(&summary);
    Ok(summary)
}
