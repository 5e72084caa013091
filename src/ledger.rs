//! Append-only quarantine ledger of artifacts that previously failed.
//!
//! The ledger is a flat text file, one free-text line per failed
//! artifact, conventionally `"<reason tag>: <artifact name>"`. It is
//! read once into memory at startup; writes are plain appends with no
//! deduplication, which the read-time membership scan tolerates.

use crate::error::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How ledger membership is tested against stored lines.
///
/// The reference behavior is substring containment: an artifact is
/// known-bad when its name occurs anywhere inside any stored line.
/// That makes `sample1.exe` shadow `sample10.exe`. It is kept as the
/// default on purpose; exact matching is opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Artifact name occurs anywhere within a stored line.
    #[default]
    Substring,
    /// Artifact name equals the name recorded after the reason tag.
    ExactName,
}

/// In-memory view of the quarantine ledger plus its backing file.
#[derive(Debug)]
pub struct ErrorLedger {
    path: PathBuf,
    entries: Vec<String>,
    policy: MatchPolicy,
}

impl ErrorLedger {
    /// Load existing entries from `path`, or start empty when the file
    /// does not exist yet.
    pub fn load(path: impl Into<PathBuf>, policy: MatchPolicy) -> Result<Self> {
        let path = path.into();
        let entries = if path.is_file() {
            fs::read_to_string(&path)?
                .lines()
                .map(str::to_owned)
                .collect()
        } else {
            Vec::new()
        };
        debug!(path = %path.display(), entries = entries.len(), "ledger loaded");
        Ok(Self {
            path,
            entries,
            policy,
        })
    }

    /// Whether `artifact` matches any stored line under the configured
    /// policy.
    pub fn contains(&self, artifact: &str) -> bool {
        match self.policy {
            MatchPolicy::Substring => self.entries.iter().any(|line| line.contains(artifact)),
            MatchPolicy::ExactName => self.entries.iter().any(|line| {
                line.split_once(": ")
                    .map(|(_, name)| name == artifact)
                    .unwrap_or(line == artifact)
            }),
        }
    }

    /// Append one `"<tag>: <artifact>"` line and remember it in memory
    /// so the current run also skips the artifact on a second pass.
    pub fn record(&mut self, tag: &str, artifact: &str) -> Result<()> {
        let line = format!("{tag}: {artifact}");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        warn!(ledger = %self.path.display(), %line, "artifact quarantined");
        self.entries.push(line);
        Ok(())
    }

    /// Number of lines currently known.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let ledger = ErrorLedger::load(dir.path().join("errors.txt"), MatchPolicy::default()).unwrap();
        assert!(ledger.is_empty());
        assert!(!ledger.contains("anything.exe"));
    }

    #[test]
    fn substring_containment_shadows_shorter_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("errors.txt");
        fs::write(&path, "Timeout error: sample10\n").unwrap();

        let ledger = ErrorLedger::load(&path, MatchPolicy::Substring).unwrap();
        assert!(ledger.contains("sample10"));
        // "sample1" occurs inside the line recorded for sample10, so a
        // never-failed artifact is reported as known-bad. Kept, not
        // corrected: callers wanting precision opt into ExactName.
        assert!(ledger.contains("sample1"));
    }

    #[test]
    fn substring_containment_matches_the_reason_tag_too() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("errors.txt");
        fs::write(&path, "Timeout error: sample1.exe\n").unwrap();

        let ledger = ErrorLedger::load(&path, MatchPolicy::Substring).unwrap();
        assert!(ledger.contains("sample1.exe"));
        // Any fragment of the stored line matches, tag included.
        assert!(ledger.contains("Timeout"));
        // The longer name is not a fragment of the shorter one's line.
        assert!(!ledger.contains("sample10.exe"));
    }

    #[test]
    fn exact_name_policy_ignores_shadowing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("errors.txt");
        fs::write(&path, "Timeout error: sample10\n").unwrap();

        let ledger = ErrorLedger::load(&path, MatchPolicy::ExactName).unwrap();
        assert!(ledger.contains("sample10"));
        assert!(!ledger.contains("sample1"));
    }

    #[test]
    fn record_appends_and_is_visible_in_memory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("errors.txt");

        let mut ledger = ErrorLedger::load(&path, MatchPolicy::Substring).unwrap();
        ledger.record("Analysis error", "bad.bin").unwrap();
        ledger.record("Analysis error", "bad.bin").unwrap();
        assert!(ledger.contains("bad.bin"));
        assert_eq!(ledger.len(), 2);

        // Duplicates land on disk unchanged; the reload tolerates them.
        let reloaded = ErrorLedger::load(&path, MatchPolicy::Substring).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("bad.bin"));
    }
}
