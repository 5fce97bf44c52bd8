//! Comparison of observed changes against expected paths.

use std::collections::BTreeSet;
use std::fmt;

/// How strictly the observed set must agree with the expected set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Observed and expected sets must be equal.
    #[default]
    Exact,
    /// Every expected path must be observed; extra observed paths are tolerated.
    AtLeast,
}

/// Which assertion produced a [`MatchOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Addition,
    Removal,
    /// No additions and no removals.
    Nothing,
    /// No changes left that an earlier assertion has not accounted for.
    NothingMore,
}

impl Expectation {
    pub fn as_str(self) -> &'static str {
        match self {
            Expectation::Addition => "addition",
            Expectation::Removal => "removal",
            Expectation::Nothing => "no changes",
            Expectation::NothingMore => "no further changes",
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partition of expected and observed paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Expected and observed.
    pub matched: BTreeSet<String>,
    /// Expected but not observed.
    pub missing: BTreeSet<String>,
    /// Observed but not expected. Always empty under [`MatchMode::AtLeast`].
    pub unexpected: BTreeSet<String>,
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }

    /// Turn a mismatch into an [`ExpectationFailure`] for `expectation`.
    pub fn into_result(self, expectation: Expectation) -> Result<BTreeSet<String>, ExpectationFailure> {
        if self.is_match() {
            return Ok(self.matched);
        }
        Err(ExpectationFailure {
            expectation,
            missing: self.missing.into_iter().collect(),
            unexpected: self.unexpected.into_iter().collect(),
            matched: self.matched.into_iter().collect(),
        })
    }
}

/// Compare observed paths against expected paths.
///
/// ## Parameters
/// - `actual`: paths observed in the delta (already filtered by ignore rules).
/// - `expected`: expanded expected paths.
/// - `mode`: strict equality or containment.
///
/// ## Returns
/// - (`MatchOutcome`): matched / missing / unexpected partitions, each sorted.
pub fn compare(actual: &BTreeSet<String>, expected: &BTreeSet<String>, mode: MatchMode) -> MatchOutcome {
    let matched = actual.intersection(expected).cloned().collect();
    let missing = expected.difference(actual).cloned().collect();
    let unexpected = match mode {
        MatchMode::Exact => actual.difference(expected).cloned().collect(),
        MatchMode::AtLeast => BTreeSet::new(),
    };
    MatchOutcome {
        matched,
        missing,
        unexpected,
    }
}

/// A failed expectation with enough detail to see exactly what differed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectationFailure {
    pub expectation: Expectation,
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
    pub matched: Vec<String>,
}

impl fmt::Display for ExpectationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected {} did not match: {} missing, {} unexpected, {} matched",
            self.expectation,
            self.missing.len(),
            self.unexpected.len(),
            self.matched.len()
        )?;
        write_section(f, "missing", &self.missing)?;
        write_section(f, "unexpected", &self.unexpected)?;
        write_section(f, "matched", &self.matched)
    }
}

impl std::error::Error for ExpectationFailure {}

fn write_section(f: &mut fmt::Formatter<'_>, title: &str, paths: &[String]) -> fmt::Result {
    if paths.is_empty() {
        return Ok(());
    }
    write!(f, "\n  {title}:")?;
    for path in paths {
        write!(f, "\n    {path}")?;
    }
    Ok(())
}

/// Glob patterns for paths that never take part in a comparison (editor droppings, debug-symbol files, logs).
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    patterns: Vec<glob::Pattern>,
}

impl IgnoreRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pattern. `*` also matches across `/`, so `*.pdb` ignores debug symbols at any depth.
    pub fn add(&mut self, pattern: &str) -> Result<(), glob::PatternError> {
        self.patterns.push(glob::Pattern::new(pattern)?);
        Ok(())
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(path))
    }

    pub fn filter(&self, paths: &BTreeSet<String>) -> BTreeSet<String> {
        paths.iter().filter(|path| !self.is_ignored(path)).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
