//! Expected-path specifications and their expansion.
//!
//! Build outputs share long configuration-dependent prefixes (`bin/gcc/debug/`), so expectations are usually written
//! as a prefix crossed with a list of file names rather than as a literal enumeration. [`ExpectedPaths`] keeps both
//! forms (and unions of them) until [`ExpectedPaths::expand`] flattens everything into a plain set.

use std::collections::BTreeSet;
use std::ops::Add;

/// Expand a prefix against a whitespace-separated suffix list.
///
/// ## Parameters
/// - `prefix`: string prepended to every suffix (may be empty).
/// - `suffixes`: whitespace-separated tokens.
///
/// ## Returns
/// - (`BTreeSet<String>`): `{ prefix + s : s in suffixes }`. An empty or whitespace-only suffix list yields the
///   empty set.
///
/// ## Examples
/// ```rust
/// use jamcheck_core::expand;
/// let paths = expand("bin/gcc/debug/", "a.o b.o");
/// assert!(paths.contains("bin/gcc/debug/a.o"));
/// assert_eq!(paths.len(), 2);
/// ```
pub fn expand(prefix: &str, suffixes: &str) -> BTreeSet<String> {
    expand_split(prefix, suffixes.split_whitespace())
}

/// Expand a prefix against an already-split suffix sequence.
pub fn expand_split<I, S>(prefix: &str, suffixes: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    suffixes
        .into_iter()
        .map(|suffix| format!("{prefix}{}", suffix.as_ref()))
        .collect()
}

/// A compact specification of a set of expected relative paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedPaths {
    /// Paths listed verbatim.
    Literal(BTreeSet<String>),
    /// `prefix` concatenated with every suffix.
    Expansion { prefix: String, suffixes: Vec<String> },
    /// Union of several specifications.
    Union(Vec<ExpectedPaths>),
}

impl ExpectedPaths {
    /// The empty specification ("no paths").
    pub fn none() -> Self {
        ExpectedPaths::Literal(BTreeSet::new())
    }

    /// Literal paths.
    pub fn literal<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExpectedPaths::Literal(paths.into_iter().map(Into::into).collect())
    }

    /// A prefix crossed with a whitespace-separated suffix list.
    pub fn product(prefix: impl Into<String>, suffixes: &str) -> Self {
        ExpectedPaths::Expansion {
            prefix: prefix.into(),
            suffixes: suffixes.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// A prefix crossed with a pre-split suffix list.
    pub fn product_split<I, S>(prefix: impl Into<String>, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExpectedPaths::Expansion {
            prefix: prefix.into(),
            suffixes: suffixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Combine with another specification (set union).
    pub fn and(self, other: impl Into<ExpectedPaths>) -> Self {
        match self {
            ExpectedPaths::Union(mut parts) => {
                parts.push(other.into());
                ExpectedPaths::Union(parts)
            }
            first => ExpectedPaths::Union(vec![first, other.into()]),
        }
    }

    /// Flatten into the set of literal paths.
    pub fn expand(&self) -> BTreeSet<String> {
        match self {
            ExpectedPaths::Literal(paths) => paths.clone(),
            ExpectedPaths::Expansion { prefix, suffixes } => expand_split(prefix, suffixes),
            ExpectedPaths::Union(parts) => parts.iter().flat_map(ExpectedPaths::expand).collect(),
        }
    }
}

impl Add for ExpectedPaths {
    type Output = ExpectedPaths;

    fn add(self, rhs: ExpectedPaths) -> ExpectedPaths {
        self.and(rhs)
    }
}

impl From<&str> for ExpectedPaths {
    fn from(path: &str) -> Self {
        ExpectedPaths::literal([path])
    }
}

impl From<String> for ExpectedPaths {
    fn from(path: String) -> Self {
        ExpectedPaths::literal([path])
    }
}

impl From<Vec<&str>> for ExpectedPaths {
    fn from(paths: Vec<&str>) -> Self {
        ExpectedPaths::literal(paths)
    }
}

impl From<Vec<String>> for ExpectedPaths {
    fn from(paths: Vec<String>) -> Self {
        ExpectedPaths::literal(paths)
    }
}

impl<const N: usize> From<[&str; N]> for ExpectedPaths {
    fn from(paths: [&str; N]) -> Self {
        ExpectedPaths::literal(paths)
    }
}

impl From<BTreeSet<String>> for ExpectedPaths {
    fn from(paths: BTreeSet<String>) -> Self {
        ExpectedPaths::Literal(paths)
    }
}
