//! On-disk output layout: one directory per artifact.
//!
//! Each directory holds a copy of the original artifact, the feature
//! document the analyzer writes, and a completion marker listing the
//! extracted feature keys one per line. Directory existence only means
//! work was claimed at some point; the marker is the success signal.
//! A directory without a marker is redone from scratch on resume.

use crate::error::{MinerError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Completion-marker file inside each artifact directory.
pub const MARKER_FILE: &str = "keys.txt";
/// Feature document the analyzer writes.
pub const FEATURES_FILE: &str = "features.json";

/// Maps artifacts to their destination directories and completion
/// signals.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Like `new`, but fails when the root does not already exist.
    /// Used at setup time: a missing output root aborts the run.
    pub fn open_existing(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(MinerError::MissingOutputDir(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination directory for one artifact.
    pub fn dest_dir(&self, artifact: &str) -> PathBuf {
        self.root.join(artifact)
    }

    fn marker_path(&self, artifact: &str) -> PathBuf {
        self.dest_dir(artifact).join(MARKER_FILE)
    }

    /// Create the destination directory if absent.
    pub fn ensure_dir(&self, artifact: &str) -> Result<PathBuf> {
        let dir = self.dest_dir(artifact);
        if !dir.exists() {
            debug!(dir = %dir.display(), "creating output folder");
            fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }

    /// Whether the artifact previously reached `Completed`.
    pub fn is_complete(&self, artifact: &str) -> bool {
        self.marker_path(artifact).is_file()
    }

    /// Copy the artifact into its directory unless a copy is already
    /// there. Returns true when a copy was actually performed.
    pub fn copy_in(&self, artifact: &str, source: &Path) -> Result<bool> {
        let target = self.dest_dir(artifact).join(artifact);
        if target.is_file() {
            return Ok(false);
        }
        fs::copy(source, &target)?;
        Ok(true)
    }

    /// Write the completion marker, one feature key per line.
    pub fn write_marker(&self, artifact: &str, keys: &[String]) -> Result<()> {
        fs::write(self.marker_path(artifact), keys.join("\n"))?;
        Ok(())
    }

    /// Delete the artifact's directory wholesale. Quarantine rollback
    /// for terminal failures; a no-op when nothing was claimed.
    pub fn discard(&self, artifact: &str) -> Result<()> {
        let dir = self.dest_dir(artifact);
        if dir.is_dir() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }
}
