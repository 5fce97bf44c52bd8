//! Harness controller
//!
//! A [`Harness`] owns one workspace and sequences setup, build invocations and expectations against it:
//!
//! ```text
//! Ready --run--> AwaitingExpectation --expect_*--> Ready
//!   \______________________|________________________/
//!                        close
//!                          v
//!                       Closed
//! ```
//!
//! Diffing is lazy. Invocations only mark the workspace as unsettled; the next expectation (or setup mutation)
//! captures a snapshot and diffs it against the baseline. Changes from several invocations with no expectation in
//! between therefore accumulate into one delta.
//!
//! Paths matched by an expectation are consumed, so several expectations after one run each account for their own
//! part of the changes, and [`Harness::expect_nothing_more`] checks that nothing was left unaccounted for.

use std::collections::BTreeSet;
use std::path::Path;

use jamcheck_core::{
    BuildProfile, Delta, DeltaTracker, Expectation, ExpectedPaths, IgnoreRules, MatchMode, compare, normalize_relative,
};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::invoker::{BuildInvoker, ExitExpectation, InvocationRecord};
use crate::snapshot;
use crate::workspace::Workspace;

/// Lifecycle state of a [`Harness`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessState {
    /// No invocation awaits assertions
    Ready,
    /// At least one invocation ran since the last expectation
    AwaitingExpectation,
    /// Workspace destroyed; every operation fails with [`HarnessError::Closed`]
    Closed,
}

/// Options for one build invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub subdir: String,
    pub args: Vec<String>,
    pub status: ExitExpectation,
}

impl RunOptions {
    /// Run in the workspace root, no extra arguments, expect success
    pub fn new() -> Self {
        Self::default()
    }

    /// Run in a root-relative subdirectory
    pub fn subdir(mut self, subdir: impl Into<String>) -> Self {
        self.subdir = subdir.into();
        self
    }

    /// Append whitespace-separated arguments
    pub fn args(mut self, args: &str) -> Self {
        self.args.extend(args.split_whitespace().map(str::to_string));
        self
    }

    /// Append one argument verbatim
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn status(mut self, status: ExitExpectation) -> Self {
        self.status = status;
        self
    }

    /// Shorthand for `status(ExitExpectation::Failure)`
    pub fn expect_failure(self) -> Self {
        self.status(ExitExpectation::Failure)
    }
}

/// Sandboxed build verification session
#[derive(Debug)]
pub struct Harness {
    config: HarnessConfig,
    profile: BuildProfile,
    workspace: Workspace,
    invoker: BuildInvoker,
    tracker: DeltaTracker,
    ignore: IgnoreRules,
    /// Everything the settled invocations changed
    observed: Delta,
    /// What remains of `observed` after consumption by expectations
    pending: Delta,
    /// No expectation has looked at `pending` yet
    pending_fresh: bool,
    /// Invocations ran since the last capture
    unsettled: bool,
    last_run: Option<InvocationRecord>,
    state: HarnessState,
}

impl Harness {
    /// Create a fresh workspace and record its (empty) baseline.
    ///
    /// ## Errors
    /// - `Environment` when no temporary directory can be allocated.
    pub fn new(config: HarnessConfig) -> HarnessResult<Self> {
        let workspace = Workspace::create(&config)?;
        let baseline = snapshot::capture(workspace.root())?;
        tracing::debug!(root = %workspace.root().display(), toolset = %config.toolset, "harness ready");

        Ok(Self {
            profile: config.profile(),
            invoker: BuildInvoker::new(&config),
            config,
            workspace,
            tracker: DeltaTracker::with_baseline(baseline),
            ignore: IgnoreRules::new(),
            observed: Delta::default(),
            pending: Delta::default(),
            pending_fresh: false,
            unsettled: false,
            last_run: None,
            state: HarnessState::Ready,
        })
    }

    pub fn root(&self) -> &Path {
        self.workspace.root()
    }

    pub fn state(&self) -> HarnessState {
        self.state
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// The latest invocation, if any
    pub fn last_run(&self) -> Option<&InvocationRecord> {
        self.last_run.as_ref()
    }

    /// Everything the settled invocations added and removed
    pub fn delta(&self) -> &Delta {
        &self.observed
    }

    /// Settled changes no expectation has accounted for yet
    pub fn unasserted(&self) -> &Delta {
        &self.pending
    }

    // ========================================
    // Setup
    // ========================================

    /// Write a file relative to the root. Never reported as a build effect.
    pub fn write(&mut self, path: &str, content: impl AsRef<[u8]>) -> HarnessResult<()> {
        self.mutate(|ws| ws.write_file(path, content))
    }

    /// Copy a named fixture tree into the root
    pub fn seed_tree(&mut self, name: &str) -> HarnessResult<()> {
        self.mutate(|ws| ws.seed_tree(name))
    }

    /// Copy a file inside the workspace
    pub fn copy(&mut self, from: &str, to: &str) -> HarnessResult<()> {
        self.mutate(|ws| ws.copy_file(from, to))
    }

    /// Remove a file or directory tree
    pub fn remove(&mut self, path: &str) -> HarnessResult<()> {
        self.mutate(|ws| ws.remove(path))
    }

    /// Exclude paths matching a glob from every expectation
    pub fn ignore(&mut self, pattern: &str) -> HarnessResult<()> {
        self.ensure_open()?;
        self.ignore.add(pattern).map_err(|source| HarnessError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
    }

    fn mutate(&mut self, op: impl FnOnce(&Workspace) -> HarnessResult<()>) -> HarnessResult<()> {
        self.ensure_open()?;
        self.settle()?;
        // Partial setup from a failed `op` must not count as a build effect.
        let outcome = op(&self.workspace);
        let snapshot = snapshot::capture(self.workspace.root())?;
        self.tracker.rebaseline(snapshot);
        outcome
    }

    // ========================================
    // Invocation
    // ========================================

    /// Run the build tool with whitespace-separated `args` in the root, expecting success
    pub fn run(&mut self, args: &str) -> HarnessResult<&InvocationRecord> {
        self.run_build_system(RunOptions::new().args(args))
    }

    /// Invoke the build tool.
    ///
    /// ## Errors
    /// - `BuildTimeout` when the tool exceeds the timeout. The harness is closed and its workspace removed.
    /// - `BuildFailed` when the exit status is not accepted by `options.status`. The workspace is kept for
    ///   inspection until the harness is dropped.
    /// - `Spawn` / `PathEscape` from the invoker.
    #[tracing::instrument(skip_all, fields(subdir = %options.subdir))]
    pub fn run_build_system(&mut self, options: RunOptions) -> HarnessResult<&InvocationRecord> {
        self.ensure_open()?;
        let record = self.invoker.invoke(&self.workspace, &options.subdir, &options.args)?;

        if record.timed_out {
            let timeout = self.invoker.timeout();
            self.last_run = Some(record);
            self.close();
            return Err(HarnessError::BuildTimeout {
                timeout,
                subdir: options.subdir,
            });
        }

        let accepted = options.status.accepts(record.exit_code);
        let failure = (!accepted).then(|| HarnessError::BuildFailed {
            status: record.status(),
            expected: options.status.to_string(),
            output: record.output.clone(),
        });

        self.unsettled = true;
        self.state = HarnessState::AwaitingExpectation;
        let record = self.last_run.insert(record);
        match failure {
            Some(err) => Err(err),
            None => Ok(&*record),
        }
    }

    // ========================================
    // Expectations
    // ========================================

    /// Assert the build added exactly `paths` (or at least them, under [`MatchMode::AtLeast`]).
    pub fn expect_addition(&mut self, paths: impl Into<ExpectedPaths>) -> HarnessResult<()> {
        let expected = self.render(&paths.into())?;
        self.prepare()?;
        let actual = self.ignore.filter(&self.pending.added);
        let matched = compare(&actual, &expected, self.config.match_mode).into_result(Expectation::Addition)?;
        self.pending.consume_added(&matched);
        Ok(())
    }

    /// Assert the build removed exactly `paths` (or at least them, under [`MatchMode::AtLeast`]).
    pub fn expect_removal(&mut self, paths: impl Into<ExpectedPaths>) -> HarnessResult<()> {
        let expected = self.render(&paths.into())?;
        self.prepare()?;
        let actual = self.ignore.filter(&self.pending.removed);
        let matched = compare(&actual, &expected, self.config.match_mode).into_result(Expectation::Removal)?;
        self.pending.consume_removed(&matched);
        Ok(())
    }

    /// Assert the settled invocations changed nothing at all
    pub fn expect_nothing(&mut self) -> HarnessResult<()> {
        self.prepare()?;
        let changed = self.changed_paths(&self.observed);
        compare(&changed, &BTreeSet::new(), MatchMode::Exact).into_result(Expectation::Nothing)?;
        Ok(())
    }

    /// Assert every change has been accounted for by an earlier expectation
    pub fn expect_nothing_more(&mut self) -> HarnessResult<()> {
        self.prepare()?;
        let changed = self.changed_paths(&self.pending);
        compare(&changed, &BTreeSet::new(), MatchMode::Exact).into_result(Expectation::NothingMore)?;
        Ok(())
    }

    /// Expand, render and normalize an expectation's paths.
    fn render(&self, paths: &ExpectedPaths) -> HarnessResult<BTreeSet<String>> {
        let rendered = paths
            .expand()
            .iter()
            .map(|path| normalize_relative(&self.profile.render(path)))
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(rendered)
    }

    fn changed_paths(&self, delta: &Delta) -> BTreeSet<String> {
        let mut changed = self.ignore.filter(&delta.added);
        changed.extend(self.ignore.filter(&delta.removed));
        changed
    }

    /// Settle and leave `AwaitingExpectation`; `pending` is no longer fresh.
    fn prepare(&mut self) -> HarnessResult<()> {
        self.ensure_open()?;
        self.settle()?;
        self.pending_fresh = false;
        self.state = HarnessState::Ready;
        Ok(())
    }

    /// Capture and diff if any invocation ran since the last capture.
    fn settle(&mut self) -> HarnessResult<()> {
        if !self.unsettled {
            return Ok(());
        }
        let snapshot = snapshot::capture(self.workspace.root())?;
        let delta = self.tracker.diff(snapshot);
        self.observed = if self.pending_fresh {
            std::mem::take(&mut self.observed).merged(delta)
        } else {
            delta
        };
        self.pending = self.observed.clone();
        self.pending_fresh = true;
        self.unsettled = false;
        tracing::debug!(
            added = self.observed.added.len(),
            removed = self.observed.removed.len(),
            "settled build changes"
        );
        Ok(())
    }

    // ========================================
    // Teardown
    // ========================================

    /// Destroy the workspace. Idempotent.
    pub fn close(&mut self) {
        if self.state == HarnessState::Closed {
            return;
        }
        self.workspace.destroy();
        self.state = HarnessState::Closed;
    }

    fn ensure_open(&self) -> HarnessResult<()> {
        if self.state == HarnessState::Closed {
            return Err(HarnessError::Closed);
        }
        Ok(())
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn harness() -> Harness {
        Harness::new(HarnessConfig::new()).unwrap()
    }

    /// Stand-in for a build: mutate the workspace directly and flag it unsettled.
    fn simulate_build(h: &mut Harness, add: &[&str], remove: &[&str]) {
        for path in add {
            let full = h.root().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, "").unwrap();
        }
        for path in remove {
            std::fs::remove_file(h.root().join(path)).unwrap();
        }
        h.unsettled = true;
        h.state = HarnessState::AwaitingExpectation;
    }

    #[test]
    fn test_run_options_builder() {
        let options = RunOptions::new()
            .subdir("lib")
            .args("link=static  -j2")
            .arg("define=A B")
            .expect_failure();
        assert_eq!(options.subdir, "lib");
        assert_eq!(options.args, vec!["link=static", "-j2", "define=A B"]);
        assert_eq!(options.status, ExitExpectation::Failure);
    }

    #[test]
    fn test_new_harness_is_ready_and_empty() {
        let h = harness();
        assert_eq!(h.state(), HarnessState::Ready);
        assert!(h.delta().is_empty());
        assert!(h.last_run().is_none());
    }

    #[test]
    fn test_setup_writes_are_not_build_effects() {
        let mut h = harness();
        h.write("jamroot.jam", "").unwrap();
        h.write("src/a.cpp", "").unwrap();
        h.expect_nothing().unwrap();
    }

    #[test]
    fn test_addition_exact_and_consumed() {
        let mut h = harness();
        simulate_build(&mut h, &["bin/gcc/debug/a.o", "bin/gcc/debug/b.o"], &[]);
        h.expect_addition(ExpectedPaths::product("bin/$toolset/$variant/", "a.obj b.obj"))
            .unwrap();
        assert_eq!(h.state(), HarnessState::Ready);
        assert!(h.unasserted().is_empty());
        assert_eq!(h.delta().added.len(), 2);
        h.expect_nothing_more().unwrap();
    }

    #[test]
    fn test_addition_exact_reports_unexpected() {
        let mut h = harness();
        simulate_build(&mut h, &["a.o", "b.o"], &[]);
        let err = h.expect_addition("a.o").unwrap_err();
        let failure = err.as_expectation_failure().unwrap();
        assert_eq!(failure.unexpected, vec!["b.o".to_string()]);
        assert!(failure.missing.is_empty());
    }

    #[test]
    fn test_addition_at_least_partitions() {
        let mut h = Harness::new(HarnessConfig::new().with_match_mode(MatchMode::AtLeast)).unwrap();
        simulate_build(&mut h, &["a.o", "b.o", "c.o"], &[]);
        h.expect_addition("a.o").unwrap();
        h.expect_addition(vec!["b.o"]).unwrap();
        let err = h.expect_nothing_more().unwrap_err();
        assert_eq!(err.as_expectation_failure().unwrap().unexpected, vec!["c.o".to_string()]);
        h.expect_addition("c.o").unwrap();
        h.expect_nothing_more().unwrap();
    }

    #[test]
    fn test_chained_invocations_accumulate() {
        let mut h = harness();
        h.write("keep.txt", "").unwrap();
        simulate_build(&mut h, &["a.o"], &[]);
        simulate_build(&mut h, &["b.o"], &["keep.txt"]);
        h.expect_addition(vec!["a.o", "b.o"]).unwrap();
        h.expect_removal("keep.txt").unwrap();
    }

    #[test]
    fn test_unasserted_delta_merges_across_settles() {
        let mut h = harness();
        simulate_build(&mut h, &["a.o"], &[]);
        // A setup write settles the first build without asserting it.
        h.write("extra.cpp", "").unwrap();
        simulate_build(&mut h, &["b.o"], &[]);
        h.expect_addition(vec!["a.o", "b.o"]).unwrap();
    }

    #[test]
    fn test_new_run_replaces_asserted_delta() {
        let mut h = harness();
        simulate_build(&mut h, &["a.o"], &[]);
        h.expect_addition("a.o").unwrap();
        simulate_build(&mut h, &[], &[]);
        h.expect_nothing().unwrap();
    }

    #[test]
    fn test_ignore_rules_filter_noise() {
        let mut h = harness();
        h.ignore("*.rsp").unwrap();
        simulate_build(&mut h, &["a.o", "bin/link.rsp"], &[]);
        h.expect_addition("a.o").unwrap();
        h.expect_nothing_more().unwrap();
        assert!(matches!(h.ignore("[oops"), Err(HarnessError::InvalidPattern { .. })));
    }

    #[test]
    fn test_expectation_path_escape() {
        let mut h = harness();
        let err = h.expect_addition("../outside.o").unwrap_err();
        assert!(matches!(err, HarnessError::PathEscape(_)));
    }

    #[test]
    fn test_expect_nothing_fails_on_change() {
        let mut h = harness();
        simulate_build(&mut h, &["a.o"], &[]);
        let err = h.expect_nothing().unwrap_err();
        let failure = err.as_expectation_failure().unwrap();
        assert_eq!(failure.expectation, Expectation::Nothing);
        assert_eq!(failure.unexpected, vec!["a.o".to_string()]);
    }

    #[test]
    fn test_close_is_idempotent_and_final() {
        let mut h = harness();
        let root = h.root().to_path_buf();
        h.close();
        h.close();
        assert_eq!(h.state(), HarnessState::Closed);
        assert!(!root.exists());
        assert!(matches!(h.write("a", ""), Err(HarnessError::Closed)));
        assert!(matches!(h.run(""), Err(HarnessError::Closed)));
        assert!(matches!(h.expect_nothing(), Err(HarnessError::Closed)));
    }

    #[test]
    fn test_drop_removes_workspace() {
        let root = {
            let h = harness();
            h.root().to_path_buf()
        };
        assert!(!root.exists());
    }
}
