//! Error taxonomy for harness operations
//!
//! Every variant aborts the current test case only. Workspace teardown does not depend on any of them: the harness
//! and workspace clean up on drop, and cleanup problems are logged instead of raised.

use std::path::PathBuf;
use std::time::Duration;

use jamcheck_core::{ExpectationFailure, PathEscape};
use miette::Diagnostic;
use thiserror::Error;

/// Errors raised by the harness and its components
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("cannot allocate workspace: {0}")]
    #[diagnostic(
        code(jamcheck::environment),
        help("check that the temporary directory is writable and not full")
    )]
    Environment(#[source] std::io::Error),

    #[error("fixture tree '{name}' not found under {}", root.display())]
    #[diagnostic(code(jamcheck::fixture_not_found), help("set JAMCHECK_FIXTURES or pass --fixtures"))]
    FixtureNotFound { name: String, root: PathBuf },

    #[error(transparent)]
    #[diagnostic(code(jamcheck::path_escape))]
    PathEscape(#[from] PathEscape),

    #[error("build timed out after {timeout:?} (subdir '{subdir}')")]
    #[diagnostic(
        code(jamcheck::build_timeout),
        help("the build tool was killed; raise the timeout with JAMCHECK_TIMEOUT_SECS if the build is just slow")
    )]
    BuildTimeout { timeout: Duration, subdir: String },

    #[error("build exited with {status} but {expected} was expected\n{output}")]
    #[diagnostic(code(jamcheck::build_failed))]
    BuildFailed {
        status: String,
        expected: String,
        output: String,
    },

    #[error(transparent)]
    #[diagnostic(code(jamcheck::expectation_failed))]
    ExpectationFailed(#[from] ExpectationFailure),

    #[error("build directory '{subdir}' does not exist in the workspace")]
    #[diagnostic(
        code(jamcheck::missing_subdir),
        help("seed or write the subproject before running the build in it")
    )]
    MissingSubdir { subdir: String },

    #[error("failed to launch build tool '{}': {source}", program.display())]
    #[diagnostic(code(jamcheck::spawn), help("set JAMCHECK_BUILD_TOOL or pass --tool"))]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid ignore pattern '{pattern}': {source}")]
    #[diagnostic(code(jamcheck::invalid_pattern))]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("invalid scenario {}: {message}", path.display())]
    #[diagnostic(code(jamcheck::scenario))]
    Scenario { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    #[diagnostic(code(jamcheck::config))]
    Config(String),

    #[error("harness is closed")]
    #[diagnostic(code(jamcheck::closed))]
    Closed,

    #[error("I/O error: {0}")]
    #[diagnostic(code(jamcheck::io))]
    Io(#[from] std::io::Error),
}

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

impl HarnessError {
    /// The structured mismatch, when this is an expectation failure.
    pub fn as_expectation_failure(&self) -> Option<&ExpectationFailure> {
        match self {
            HarnessError::ExpectationFailed(failure) => Some(failure),
            _ => None,
        }
    }
}
