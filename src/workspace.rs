//! Disposable workspace directory
//!
//! A [`Workspace`] owns one freshly allocated temporary directory. All paths handed to it are root-relative and are
//! checked lexically before use, so a malformed path can never reach outside the sandbox.

use std::fs;
use std::path::{Path, PathBuf};

use jamcheck_core::normalize_relative;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};

const WORKSPACE_PREFIX: &str = "jamcheck-";

/// Temporary directory tree used as the sandbox for one harness
#[derive(Debug)]
pub struct Workspace {
    /// Canonical root path, kept after destruction for diagnostics
    root: PathBuf,
    /// `None` once destroyed
    dir: Option<TempDir>,
    fixtures_dir: PathBuf,
}

impl Workspace {
    /// Allocate a fresh, empty workspace.
    ///
    /// The directory name comes from `tempfile`'s random generator, so concurrently active workspaces never share a
    /// root.
    pub fn create(config: &HarnessConfig) -> HarnessResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match &config.temp_parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(HarnessError::Environment)?;

        // Canonicalize so stripping the root from walked paths works behind symlinked temp dirs (macOS /var).
        let root = dir.path().canonicalize().map_err(HarnessError::Environment)?;
        tracing::debug!(root = %root.display(), "created workspace");

        Ok(Self {
            root,
            dir: Some(dir),
            fixtures_dir: config.fixtures_dir.clone(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_destroyed(&self) -> bool {
        self.dir.is_none()
    }

    /// Absolute path for a root-relative path.
    ///
    /// ## Errors
    /// - `PathEscape` when `relative` is absolute or climbs above the root.
    pub fn resolve(&self, relative: &str) -> HarnessResult<PathBuf> {
        let normalized = normalize_relative(relative)?;
        if normalized.is_empty() {
            Ok(self.root.clone())
        } else {
            Ok(self.root.join(normalized))
        }
    }

    /// Write a file, creating parent directories and overwriting existing content
    pub fn write_file(&self, relative: &str, content: impl AsRef<[u8]>) -> HarnessResult<()> {
        self.ensure_alive()?;
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(())
    }

    /// Copy a file inside the workspace
    pub fn copy_file(&self, from: &str, to: &str) -> HarnessResult<()> {
        self.ensure_alive()?;
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&source, &target)?;
        Ok(())
    }

    /// Remove a file or a whole directory tree
    pub fn remove(&self, relative: &str) -> HarnessResult<()> {
        self.ensure_alive()?;
        let path = self.resolve(relative)?;
        if path == self.root {
            return Err(HarnessError::Config("refusing to remove the workspace root".to_string()));
        }
        let metadata = fs::symlink_metadata(&path)?;
        if metadata.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Copy the named fixture tree into the root, recreating its hierarchy verbatim.
    ///
    /// ## Errors
    /// - `FixtureNotFound` when `<fixtures_dir>/<name>` is not a directory.
    pub fn seed_tree(&self, name: &str) -> HarnessResult<()> {
        self.ensure_alive()?;
        let not_found = || HarnessError::FixtureNotFound {
            name: name.to_string(),
            root: self.fixtures_dir.clone(),
        };

        let relative = normalize_relative(name).map_err(|_| not_found())?;
        let source = self.fixtures_dir.join(&relative);
        if relative.is_empty() || !source.is_dir() {
            return Err(not_found());
        }

        let mut copied = 0usize;
        for entry in WalkDir::new(&source).min_depth(1) {
            let entry = entry.map_err(std::io::Error::from)?;
            let Ok(suffix) = entry.path().strip_prefix(&source) else {
                continue;
            };
            let target = self.root.join(suffix);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &target)?;
                copied += 1;
            }
        }

        tracing::debug!(tree = name, files = copied, "seeded fixture tree");
        Ok(())
    }

    /// Remove the workspace and everything in it.
    ///
    /// Safe to call repeatedly. Failures are logged, never raised, so cleanup can't mask a test outcome.
    pub fn destroy(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        match dir.close() {
            Ok(()) => tracing::debug!(root = %self.root.display(), "destroyed workspace"),
            Err(e) => tracing::warn!(root = %self.root.display(), error = %e, "failed to remove workspace"),
        }
    }

    fn ensure_alive(&self) -> HarnessResult<()> {
        if self.dir.is_none() {
            return Err(HarnessError::Closed);
        }
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.destroy();
    }
}
