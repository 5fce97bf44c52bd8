//! Property-based tests for expansion and snapshot diffing.
//!
//! These use proptest to check the set-algebra invariants the harness relies on across many random inputs.

use std::collections::BTreeSet;

use jamcheck_core::{Delta, DeltaTracker, ExpectedPaths, Snapshot, expand, expand_split};
use proptest::prelude::*;

fn token() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}(\\.[a-z]{1,3})?"
}

fn path_set() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[a-c]{1,2}(/[a-c]{1,2}){0,2}", 0..12)
}

proptest! {
    /// Property: prefix expansion equals the literal enumeration of prefix + token.
    #[test]
    fn expansion_equals_enumeration(prefix in "[a-z/]{0,12}", tokens in prop::collection::vec(token(), 0..8)) {
        let joined = tokens.join(" ");
        let expected: BTreeSet<String> = tokens.iter().map(|t| format!("{prefix}{t}")).collect();
        prop_assert_eq!(expand(&prefix, &joined), expected);
    }

    /// Property: the order of suffix tokens does not matter.
    #[test]
    fn expansion_is_order_independent(prefix in "[a-z/]{0,12}", tokens in prop::collection::vec(token(), 0..8)) {
        let mut reversed = tokens.clone();
        reversed.reverse();
        prop_assert_eq!(expand_split(&prefix, &tokens), expand_split(&prefix, &reversed));
    }

    /// Property: a union expands to the union of its parts.
    #[test]
    fn union_is_set_union(a in path_set(), b in path_set()) {
        let spec = ExpectedPaths::from(a.clone()) + ExpectedPaths::from(b.clone());
        let union: BTreeSet<String> = a.union(&b).cloned().collect();
        prop_assert_eq!(spec.expand(), union);
    }

    /// Property: diffing the same snapshot twice reports nothing the second time.
    #[test]
    fn diff_is_idempotent(files in path_set()) {
        let mut tracker = DeltaTracker::new();
        let snapshot: Snapshot = files.iter().cloned().collect();
        tracker.diff(snapshot.clone());
        prop_assert!(tracker.diff(snapshot).is_empty());
    }

    /// Property: merging consecutive deltas equals the delta across the whole span.
    #[test]
    fn merge_composes(s0 in path_set(), s1 in path_set(), s2 in path_set()) {
        let s0: Snapshot = s0.into_iter().collect();
        let s1: Snapshot = s1.into_iter().collect();
        let s2: Snapshot = s2.into_iter().collect();
        let merged = Delta::between(&s0, &s1).merged(Delta::between(&s1, &s2));
        prop_assert_eq!(merged, Delta::between(&s0, &s2));
    }

    /// Property: added and removed never overlap.
    #[test]
    fn added_and_removed_are_disjoint(old in path_set(), new in path_set()) {
        let old: Snapshot = old.into_iter().collect();
        let new: Snapshot = new.into_iter().collect();
        let delta = Delta::between(&old, &new);
        prop_assert!(delta.added.is_disjoint(&delta.removed));
    }
}
