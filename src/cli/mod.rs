//! CLI module for jamcheck
//!
//! ## Commands
//!
//! - `run <PATH>...` - Execute scenario files (or every `*.json` under a directory)
//! - `expand <PREFIX> <SUFFIXES>` - Print the paths an expectation would check
//!
//! ## Modules
//!
//! - `commands` - Command implementations and config assembly
//! - `scenario_runner` - Scenario execution and reporting
//!
//! ## Design
//!
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;
pub mod scenario_runner;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use crate::error::HarnessError;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    /// Bad invocation or configuration
    pub const USAGE: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Create a usage error (exit code 2).
    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::USAGE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<HarnessError> for CliError {
    fn from(err: HarnessError) -> Self {
        let usage = matches!(err, HarnessError::Config(_));
        // miette's Debug impl renders the full diagnostic (code, help, source chain).
        let message = format!("{:?}", miette::Report::new(err));
        if usage {
            Self::usage(message)
        } else {
            Self::failure(message)
        }
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Sandboxed verification harness for jam-style build tools
#[derive(Parser, Debug)]
#[command(name = "jamcheck")]
#[command(version = VERSION)]
#[command(about = "Sandboxed verification harness for jam-style build tools", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run scenario files
    Run {
        /// Scenario files or directories containing `*.json` scenarios
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
        #[command(flatten)]
        harness: HarnessArgs,
        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
        /// Stop on first failure
        #[arg(short = 'x', long = "exitfirst")]
        stop_on_fail: bool,
    },

    /// Print the paths a prefix/suffix expectation expands to
    Expand {
        /// Common prefix, may contain `$toolset` and `$variant`
        #[arg(value_name = "PREFIX")]
        prefix: String,
        /// Whitespace-separated suffixes
        #[arg(value_name = "SUFFIXES")]
        suffixes: String,
        #[command(flatten)]
        harness: HarnessArgs,
        /// Print names verbatim instead of translating `.obj`/`.exe`/`.lib`/`.dll`
        #[arg(long)]
        no_translate: bool,
    },
}

/// Overrides layered over the `JAMCHECK_*` environment
#[derive(Args, Debug, Default, Clone)]
pub struct HarnessArgs {
    /// Build tool executable
    #[arg(long, value_name = "PROGRAM")]
    pub tool: Option<PathBuf>,
    /// Argument passed before everything else (repeatable)
    #[arg(long = "tool-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub tool_args: Vec<String>,
    /// Toolset name
    #[arg(long)]
    pub toolset: Option<String>,
    /// Build variant
    #[arg(long)]
    pub variant: Option<String>,
    /// Per-invocation timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<String>,
    /// Directory holding fixture trees
    #[arg(long, value_name = "DIR")]
    pub fixtures: Option<PathBuf>,
    /// Accept extra changes in expect_addition/expect_removal
    #[arg(long)]
    pub at_least: bool,
    /// Do not pass `toolset=<toolset>` to the build tool
    #[arg(long)]
    pub no_toolset_arg: bool,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Run {
            paths,
            harness,
            verbose,
            stop_on_fail,
        } => {
            let config = commands::harness_config(&harness)?;
            scenario_runner::run_scenarios(&paths, &config, verbose, stop_on_fail)
        }
        Command::Expand {
            prefix,
            suffixes,
            harness,
            no_translate,
        } => commands::expand_paths(&prefix, &suffixes, &harness, no_translate),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::try_parse_from(["jamcheck", "run", "scenarios/", "-v", "-x"]).unwrap();
        if let Command::Run {
            paths,
            verbose,
            stop_on_fail,
            ..
        } = cli.command
        {
            assert_eq!(paths, vec![PathBuf::from("scenarios/")]);
            assert!(verbose);
            assert!(stop_on_fail);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_run_requires_path() {
        assert!(Cli::try_parse_from(["jamcheck", "run"]).is_err());
    }

    #[test]
    fn test_cli_parse_harness_flags() {
        let cli = Cli::try_parse_from([
            "jamcheck",
            "run",
            "a.json",
            "--tool",
            "sh",
            "--tool-arg",
            "fakejam.sh",
            "--tool-arg",
            "-d0",
            "--toolset",
            "clang",
            "--timeout",
            "30",
            "--at-least",
        ])
        .unwrap();
        let Command::Run { harness, .. } = cli.command else {
            panic!("Expected Run command");
        };
        assert_eq!(harness.tool, Some(PathBuf::from("sh")));
        assert_eq!(harness.tool_args, vec!["fakejam.sh", "-d0"]);
        assert_eq!(harness.toolset.as_deref(), Some("clang"));
        assert_eq!(harness.timeout.as_deref(), Some("30"));
        assert!(harness.at_least);
    }

    #[test]
    fn test_cli_parse_expand() {
        let cli = Cli::try_parse_from(["jamcheck", "expand", "bin/$toolset/debug/", "a.obj b.obj", "--no-translate"])
            .unwrap();
        if let Command::Expand {
            prefix,
            suffixes,
            no_translate,
            ..
        } = cli.command
        {
            assert_eq!(prefix, "bin/$toolset/debug/");
            assert_eq!(suffixes, "a.obj b.obj");
            assert!(no_translate);
        } else {
            panic!("Expected Expand command");
        }
    }

    #[test]
    fn test_config_error_is_usage() {
        let err = CliError::from(HarnessError::Config("bad".to_string()));
        assert_eq!(err.exit_code, ExitCode::USAGE);
        assert!(err.message.contains("bad"));
    }

    #[test]
    fn test_harness_error_is_failure() {
        let err = CliError::from(HarnessError::Closed);
        assert_eq!(err.exit_code, ExitCode::FAILURE);
        assert!(err.message.contains("harness is closed"));
    }
}
