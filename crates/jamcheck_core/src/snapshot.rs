//! Snapshots of workspace contents and the deltas between them.
//!
//! ## Notes
//!
//! - A [`Snapshot`] is never mutated after construction; the [`DeltaTracker`] swaps whole snapshots.
//! - Every set lives in the single root-relative namespace, regardless of which subdirectory a build was scoped to, so
//!   cumulative deltas stay correct across scoped invocations.

use std::collections::BTreeSet;

/// Immutable set of root-relative file paths at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    files: BTreeSet<String>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &BTreeSet<String> {
        &self.files
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Snapshot {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Paths added and removed between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

impl Delta {
    /// Compute `new − old` and `old − new`.
    pub fn between(old: &Snapshot, new: &Snapshot) -> Self {
        Self {
            added: new.files.difference(&old.files).cloned().collect(),
            removed: old.files.difference(&new.files).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Compose this delta with one observed afterwards.
    ///
    /// ## Returns
    /// - (`Delta`): the net change, so that `between(s0, s1).merged(between(s1, s2)) == between(s0, s2)`. A path added
    ///   and then removed (or removed and then re-created) cancels out.
    pub fn merged(self, later: Delta) -> Delta {
        let added = self
            .added
            .difference(&later.removed)
            .chain(later.added.difference(&self.removed))
            .cloned()
            .collect();
        let removed = self
            .removed
            .difference(&later.added)
            .chain(later.removed.difference(&self.added))
            .cloned()
            .collect();
        Delta { added, removed }
    }

    /// Drop paths that have been accounted for by an assertion.
    pub fn consume_added(&mut self, paths: &BTreeSet<String>) {
        self.added.retain(|path| !paths.contains(path));
    }

    pub fn consume_removed(&mut self, paths: &BTreeSet<String>) {
        self.removed.retain(|path| !paths.contains(path));
    }
}

/// Running baseline against which each new snapshot is diffed.
#[derive(Debug, Clone, Default)]
pub struct DeltaTracker {
    baseline: Snapshot,
}

impl DeltaTracker {
    /// Start from an empty baseline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot, so pre-existing files never count as added.
    pub fn with_baseline(baseline: Snapshot) -> Self {
        Self { baseline }
    }

    pub fn baseline(&self) -> &Snapshot {
        &self.baseline
    }

    /// Diff against the baseline, then make `snapshot` the new baseline.
    pub fn diff(&mut self, snapshot: Snapshot) -> Delta {
        let delta = Delta::between(&self.baseline, &snapshot);
        self.baseline = snapshot;
        delta
    }

    /// Replace the baseline without reporting anything.
    pub fn rebaseline(&mut self, snapshot: Snapshot) {
        self.baseline = snapshot;
    }
}
