//! Root-relative path normalization.
//!
//! Snapshots, expectations and workspace lookups all share one namespace: relative paths joined with `/`, without
//! `.` segments and without any way to climb above the root.

use std::path::{Component, Path};

/// A relative path that would resolve outside the workspace root.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("path '{path}' escapes the workspace root")]
pub struct PathEscape {
    pub path: String,
}

/// Normalize a caller-supplied relative path.
///
/// ## Parameters
/// - `input`: a relative path using `/` or `\` as separators.
///
/// ## Returns
/// - (`String`): the path with `/` separators, `.` segments dropped and `..` segments folded lexically. The empty
///   string denotes the root itself.
///
/// ## Errors
/// - [`PathEscape`] when the path is absolute, carries a drive prefix, or folds above the root.
///
/// ## Examples
/// ```rust
/// use jamcheck_core::normalize_relative;
/// assert_eq!(normalize_relative("lib/./bin\\gcc").unwrap(), "lib/bin/gcc");
/// assert_eq!(normalize_relative("lib/../a.o").unwrap(), "a.o");
/// assert!(normalize_relative("../outside").is_err());
/// ```
pub fn normalize_relative(input: &str) -> Result<String, PathEscape> {
    let escape = || PathEscape {
        path: input.to_string(),
    };

    let unified = input.replace('\\', "/");
    if unified.starts_with('/') || has_drive_prefix(&unified) {
        return Err(escape());
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(escape());
                }
            }
            other => segments.push(other),
        }
    }

    Ok(segments.join("/"))
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Render an already-relative host path with `/` separators.
///
/// Only normal components are kept; this is meant for paths produced by stripping the workspace root, which never
/// contain `..`.
pub fn to_slash(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
