//! Provide the pure semantics behind jamcheck: expected-path expansion, snapshot diffing and expectation matching.
//!
//! This crate is intentionally small and dependency-light. Everything here is deterministic and testable without a
//! build tool or a filesystem:
//! - the harness uses it to turn compact path specifications into sets and to compare them against observed changes,
//! - the CLI uses it to render expansions for debugging.
//!
//! ## Notes
//!
//! - This is a "semantic core" crate: **no IO**, no global state, no process handling.
//! - All paths are root-relative strings using `/` as the only separator. Conversion from host paths happens at the
//!   boundary ([`paths::to_slash`]).

pub mod matcher;
pub mod paths;
pub mod profile;
pub mod snapshot;
pub mod template;

pub use matcher::{Expectation, ExpectationFailure, IgnoreRules, MatchMode, MatchOutcome, compare};
pub use paths::{PathEscape, normalize_relative, to_slash};
pub use profile::{BuildProfile, SuffixStyle};
pub use snapshot::{Delta, DeltaTracker, Snapshot};
pub use template::{ExpectedPaths, expand, expand_split};
