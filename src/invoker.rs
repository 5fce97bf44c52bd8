//! Build tool subprocess
//!
//! One call to [`BuildInvoker::invoke`] runs the build tool to completion (or until the timeout), with stdout and
//! stderr captured together. A timed-out build is reported in the returned record, not as an error; the controller
//! decides what a timeout means.

use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::workspace::Workspace;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Which exit statuses a run accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExitExpectation {
    /// Exit code 0
    #[default]
    Success,
    /// Any non-zero exit code
    Failure,
    /// Exactly this exit code
    Code(i32),
    /// Whatever happens, as long as the tool terminates
    Any,
}

impl ExitExpectation {
    /// Whether `exit_code` satisfies this expectation. `None` means the tool died from a signal.
    pub fn accepts(self, exit_code: Option<i32>) -> bool {
        match self {
            ExitExpectation::Success => exit_code == Some(0),
            ExitExpectation::Failure => exit_code != Some(0),
            ExitExpectation::Code(code) => exit_code == Some(code),
            ExitExpectation::Any => true,
        }
    }
}

impl fmt::Display for ExitExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitExpectation::Success => f.write_str("exit code 0"),
            ExitExpectation::Failure => f.write_str("a non-zero exit code"),
            ExitExpectation::Code(code) => write!(f, "exit code {}", code),
            ExitExpectation::Any => f.write_str("any exit status"),
        }
    }
}

/// Outcome of one build tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRecord {
    /// Root-relative directory the tool ran in
    pub subdir: String,
    /// Full argument list, defaults included
    pub args: Vec<String>,
    /// `None` when the process was killed or died from a signal
    pub exit_code: Option<i32>,
    /// Stdout and stderr, interleaved as written
    pub output: String,
    pub timed_out: bool,
    pub duration: Duration,
}

impl InvocationRecord {
    /// Human-readable exit status
    pub fn status(&self) -> String {
        match (self.timed_out, self.exit_code) {
            (true, _) => "timeout".to_string(),
            (false, Some(code)) => format!("exit code {}", code),
            (false, None) => "signal".to_string(),
        }
    }
}

/// Launches the configured build tool inside a workspace
#[derive(Debug, Clone)]
pub struct BuildInvoker {
    program: PathBuf,
    default_args: Vec<String>,
    toolset_arg: Option<String>,
    env: Vec<(String, String)>,
    timeout: Duration,
}

impl BuildInvoker {
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            program: config.program.clone(),
            default_args: config.default_args.clone(),
            toolset_arg: config.pass_toolset.then(|| format!("toolset={}", config.toolset)),
            env: config.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            timeout: config.timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Argument list for one invocation: defaults, then `toolset=`, then `extra_args`.
    pub fn arguments(&self, extra_args: &[String]) -> Vec<String> {
        self.default_args
            .iter()
            .chain(self.toolset_arg.iter())
            .chain(extra_args.iter())
            .cloned()
            .collect()
    }

    /// Run the build tool in `workspace.resolve(subdir)` and wait for it.
    ///
    /// ## Errors
    /// - `PathEscape` when `subdir` leaves the workspace.
    /// - `MissingSubdir` when `subdir` is not a directory.
    /// - `Spawn` when the program cannot be launched.
    /// - `Io` when the output capture file cannot be created or read.
    #[tracing::instrument(skip_all, fields(subdir = %subdir))]
    pub fn invoke(&self, workspace: &Workspace, subdir: &str, extra_args: &[String]) -> HarnessResult<InvocationRecord> {
        let cwd = workspace.resolve(subdir)?;
        if !cwd.is_dir() {
            return Err(HarnessError::MissingSubdir {
                subdir: subdir.to_string(),
            });
        }
        let args = self.arguments(extra_args);

        // One unnamed file for both streams keeps their relative order.
        let mut capture = tempfile::tempfile()?;
        let stderr = capture.try_clone()?;
        let stdout = capture.try_clone()?;

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .current_dir(&cwd)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        tracing::debug!(program = %self.program.display(), ?args, "launching build tool");
        let start = Instant::now();
        let mut child = command.spawn().map_err(|source| HarnessError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let (status, timed_out) = self.wait_with_deadline(&mut child, start)?;
        let duration = start.elapsed();
        let output = read_capture(&mut capture)?;

        let exit_code = status.and_then(|s| s.code());
        if timed_out {
            tracing::warn!(timeout = ?self.timeout, "build tool timed out and was killed");
        } else {
            tracing::debug!(?exit_code, ?duration, "build tool finished");
        }

        Ok(InvocationRecord {
            subdir: subdir.to_string(),
            args,
            exit_code,
            output,
            timed_out,
            duration,
        })
    }

    fn wait_with_deadline(&self, child: &mut Child, start: Instant) -> HarnessResult<(Option<ExitStatus>, bool)> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok((Some(status), false)),
                Ok(None) => {}
                Err(e) => return Err(abandon(child, e)),
            }
            if start.elapsed() >= self.timeout {
                kill_tree(child);
                return Ok((child.wait().ok(), true));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Kill and reap a child we can no longer poll, turning `error` into the invocation's error.
fn abandon(child: &mut Child, error: std::io::Error) -> HarnessError {
    tracing::warn!(error = %error, "lost track of build tool, killing it");
    kill_tree(child);
    if let Err(e) = child.wait() {
        tracing::debug!(error = %e, "reaping abandoned build tool");
    }
    HarnessError::Io(error)
}

/// Kill the child and everything it spawned.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    kill_process_group(child.id());
    if let Err(e) = child.kill() {
        tracing::debug!(error = %e, "kill after process group signal");
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) has no memory-safety preconditions; a negative pid addresses the group created by
    // `process_group(0)`, whose id equals the child's pid.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        tracing::debug!(pgid, error = %std::io::Error::last_os_error(), "failed to signal process group");
    }
}

fn read_capture(capture: &mut File) -> HarnessResult<String> {
    capture.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    capture.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
