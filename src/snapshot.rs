//! Filesystem snapshot engine
//!
//! Walks a workspace and records every regular file reachable from the root, following symlinks. A symlinked
//! directory that points back into the root is not descended, so its files are only recorded under their real
//! path. Other directory aliases and symlink cycles are walked once, in file name order. A build that deletes files
//! while we walk makes the walk start over.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use jamcheck_core::{Snapshot, to_slash};
use walkdir::WalkDir;

use crate::error::HarnessResult;

/// Walks restarted because an entry vanished before the walk gives up and tolerates it
pub const MAX_WALK_ATTEMPTS: usize = 3;

/// Capture the set of regular files under `root`, as root-relative `/`-separated paths.
///
/// ## Errors
/// - `Io` when the root itself cannot be read, or an entry fails for a reason other than vanishing.
#[tracing::instrument(skip_all, fields(root = %root.display()))]
pub fn capture(root: &Path) -> HarnessResult<Snapshot> {
    for attempt in 1..MAX_WALK_ATTEMPTS {
        match walk(root, false) {
            Ok(snapshot) => return Ok(snapshot),
            Err(WalkError::Vanished(path)) => {
                tracing::debug!(attempt, path = %path.display(), "entry vanished during walk, restarting");
            }
            Err(WalkError::Io(e)) => return Err(e.into()),
        }
    }
    walk(root, true).map_err(|e| match e {
        WalkError::Io(e) => e.into(),
        WalkError::Vanished(path) => io::Error::new(io::ErrorKind::NotFound, path.display().to_string()).into(),
    })
}

#[derive(Debug)]
enum WalkError {
    Vanished(PathBuf),
    Io(io::Error),
}

fn walk(root: &Path, tolerate_vanished: bool) -> Result<Snapshot, WalkError> {
    walk_observed(root, tolerate_vanished, |_| {})
}

/// [`walk`], calling `on_entry` for every entry before it is examined.
fn walk_observed(
    root: &Path,
    tolerate_vanished: bool,
    mut on_entry: impl FnMut(&Path),
) -> Result<Snapshot, WalkError> {
    let real_root = root.canonicalize().map_err(WalkError::Io)?;
    let mut files = Vec::new();
    let mut visited_dirs: HashSet<PathBuf> = HashSet::new();

    let mut walker = WalkDir::new(root).follow_links(true).sort_by_file_name().into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                if let Some(ancestor) = err.loop_ancestor() {
                    tracing::warn!(
                        path = ?err.path(),
                        ancestor = %ancestor.display(),
                        "symlink cycle, skipping directory"
                    );
                    continue;
                }
                let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                if err.depth() == 0 {
                    return Err(WalkError::Io(err.into()));
                }
                if is_broken_symlink(&path) {
                    tracing::debug!(path = %path.display(), "skipping broken symlink");
                    continue;
                }
                let io_err: io::Error = err.into();
                if io_err.kind() == io::ErrorKind::NotFound {
                    if tolerate_vanished {
                        continue;
                    }
                    return Err(WalkError::Vanished(path));
                }
                return Err(WalkError::Io(io_err));
            }
        };

        on_entry(entry.path());

        let file_type = entry.file_type();
        if file_type.is_dir() {
            let real = match entry.path().canonicalize() {
                Ok(real) => real,
                Err(e) if e.kind() == io::ErrorKind::NotFound && tolerate_vanished => {
                    walker.skip_current_dir();
                    continue;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(WalkError::Vanished(entry.path().to_path_buf()));
                }
                Err(e) => return Err(WalkError::Io(e)),
            };
            if entry.depth() > 0 && entry.path_is_symlink() && real.starts_with(&real_root) {
                tracing::debug!(
                    path = %entry.path().display(),
                    real = %real.display(),
                    "symlink into the workspace, recorded under its real path"
                );
                walker.skip_current_dir();
                continue;
            }
            if !visited_dirs.insert(real.clone()) {
                tracing::warn!(
                    path = %entry.path().display(),
                    real = %real.display(),
                    "directory already visited, skipping"
                );
                walker.skip_current_dir();
            }
            continue;
        }

        if !file_type.is_file() {
            continue;
        }

        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.push(to_slash(relative));
        }
    }

    Ok(files.into_iter().collect())
}

fn is_broken_symlink(path: &Path) -> bool {
    path.symlink_metadata().map(|m| m.file_type().is_symlink()).unwrap_or(false) && !path.exists()
}
