//! Harness configuration
//!
//! Defaults match a stock `b2` run with the gcc toolset in debug variant. Environment variables override the
//! defaults, and the CLI overrides both.

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use jamcheck_core::{BuildProfile, MatchMode};

use crate::error::{HarnessError, HarnessResult};

/// Build tool launched when nothing else is configured
pub const DEFAULT_PROGRAM: &str = "b2";
/// Directory holding named fixture trees
pub const DEFAULT_FIXTURES_DIR: &str = "test-trees";
/// Upper bound for a single build invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Harness configuration
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Build tool executable
    pub program: PathBuf,
    /// Arguments passed before everything else on every invocation
    pub default_args: Vec<String>,
    /// Toolset identifier, used for `toolset=` and for `$toolset` in expectations
    pub toolset: String,
    /// Build variant, used for `$variant` in expectations
    pub variant: String,
    /// Whether to pass `toolset=<toolset>` on every invocation
    pub pass_toolset: bool,
    /// Environment overrides layered over the current process environment
    pub env: BTreeMap<String, String>,
    /// Per-invocation timeout
    pub timeout: Duration,
    /// Root of the named fixture trees used by `seed_tree`
    pub fixtures_dir: PathBuf,
    /// Strict equality or containment for expectations
    pub match_mode: MatchMode,
    /// Translate `.obj`/`.exe`/`.lib`/`.dll` for Unix-style toolsets
    pub translate_suffixes: bool,
    /// Parent directory for workspaces (system temp dir when `None`)
    pub temp_parent: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            default_args: Vec::new(),
            toolset: "gcc".to_string(),
            variant: "debug".to_string(),
            pass_toolset: true,
            env: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
            fixtures_dir: PathBuf::from(DEFAULT_FIXTURES_DIR),
            match_mode: MatchMode::Exact,
            translate_suffixes: true,
            temp_parent: None,
        }
    }
}

impl HarnessConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `JAMCHECK_*` environment variables
    pub fn from_env() -> HarnessResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `JAMCHECK_*` keys
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> HarnessResult<Self> {
        let mut config = Self::default();

        if let Some(program) = lookup("JAMCHECK_BUILD_TOOL") {
            config.program = PathBuf::from(program);
        }
        if let Some(toolset) = lookup("JAMCHECK_TOOLSET") {
            config.toolset = toolset;
        }
        if let Some(variant) = lookup("JAMCHECK_VARIANT") {
            config.variant = variant;
        }
        if let Some(secs) = lookup("JAMCHECK_TIMEOUT_SECS") {
            config.timeout = parse_timeout(&secs)?;
        }
        if let Some(dir) = lookup("JAMCHECK_FIXTURES") {
            config.fixtures_dir = PathBuf::from(dir);
        }
        if let Some(mode) = lookup("JAMCHECK_MATCH") {
            config.match_mode = parse_match_mode(&mode)?;
        }

        Ok(config)
    }

    /// Set the build tool executable
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Append an argument passed on every invocation
    pub fn with_default_arg(mut self, arg: impl Into<String>) -> Self {
        self.default_args.push(arg.into());
        self
    }

    /// Set the toolset
    pub fn with_toolset(mut self, toolset: impl Into<String>) -> Self {
        self.toolset = toolset.into();
        self
    }

    /// Set the build variant
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = variant.into();
        self
    }

    /// Set whether `toolset=<toolset>` is passed
    pub fn with_pass_toolset(mut self, pass: bool) -> Self {
        self.pass_toolset = pass;
        self
    }

    /// Add an environment override
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the per-invocation timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the fixture tree root
    pub fn with_fixtures_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixtures_dir = dir.into();
        self
    }

    /// Set the match mode
    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// Set whether suffixes are translated
    pub fn with_translate_suffixes(mut self, translate: bool) -> Self {
        self.translate_suffixes = translate;
        self
    }

    /// Set the parent directory for workspaces
    pub fn with_temp_parent(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_parent = Some(dir.into());
        self
    }

    /// The build profile expectations are rendered with
    pub fn profile(&self) -> BuildProfile {
        let profile = BuildProfile::new(&self.toolset, &self.variant);
        if self.translate_suffixes {
            profile
        } else {
            profile.verbatim()
        }
    }
}

/// Parse a timeout given in whole seconds
pub fn parse_timeout(value: &str) -> HarnessResult<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|_| HarnessError::Config(format!("timeout must be a whole number of seconds, got '{}'", value)))?;
    if secs == 0 {
        return Err(HarnessError::Config("timeout must be at least one second".to_string()));
    }
    Ok(Duration::from_secs(secs))
}

/// Parse `exact` / `at-least`
pub fn parse_match_mode(value: &str) -> HarnessResult<MatchMode> {
    match value.trim() {
        "exact" => Ok(MatchMode::Exact),
        "at-least" | "at_least" => Ok(MatchMode::AtLeast),
        other => Err(HarnessError::Config(format!(
            "match mode must be 'exact' or 'at-least', got '{}'",
            other
        ))),
    }
}
