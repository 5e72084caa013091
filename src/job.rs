//! Job descriptions and the outcomes exchanged across the isolation
//! boundary.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

/// One scheduled analysis attempt for an artifact.
///
/// Built fresh each driver iteration and discarded with it; never
/// persisted.
#[derive(Debug, Clone)]
pub struct Job {
    /// Absolute path of the input artifact.
    pub artifact: PathBuf,
    /// Base name of the artifact within the corpus.
    pub name: String,
    /// Directory receiving the feature document.
    pub dest_dir: PathBuf,
    /// Wall-clock budget for the worker, enforced from outside.
    pub timeout: Option<Duration>,
    /// Skip the non-static analysis pass.
    pub static_only: bool,
    /// Key/value pairs merged verbatim into the feature document.
    pub hardcode: Map<String, Value>,
}

/// Terminal classification of a Job. Produced exactly once per Job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The worker reported success; `keys` lists the extracted feature
    /// keys in document order.
    Completed { keys: Vec<String> },
    /// The worker caught an analysis fault and reported it cleanly.
    AnalysisFailed,
    /// The worker died without reporting, or exited nonzero.
    WorkerCrashed,
    /// The worker outlived its budget plus the grace period.
    WorkerTimedOut,
    /// An interrupt arrived while waiting on this job; the run itself
    /// continues with the next artifact.
    RunInterrupted,
}

impl JobOutcome {
    /// Reason tag written to the quarantine ledger, or `None` for
    /// outcomes that keep their output.
    pub fn ledger_tag(&self) -> Option<&'static str> {
        match self {
            JobOutcome::Completed { .. } => None,
            JobOutcome::AnalysisFailed => Some("Analysis error"),
            JobOutcome::WorkerCrashed => Some("Worker crashed"),
            JobOutcome::WorkerTimedOut => Some("Timeout error"),
            JobOutcome::RunInterrupted => Some("Jumped"),
        }
    }
}

/// The single message a worker sends back before exiting.
///
/// Serialized as one JSON line on the worker's stdout; the absence of
/// a parseable report after a worker exits is the crash signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    /// True when the analyzer faulted, even if a partial document was
    /// still written.
    pub error: bool,
    /// Extracted feature keys; absent when the fault was caught before
    /// any keys existed.
    pub keys: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_tags_cover_every_failure() {
        assert_eq!(JobOutcome::Completed { keys: vec![] }.ledger_tag(), None);
        assert_eq!(JobOutcome::AnalysisFailed.ledger_tag(), Some("Analysis error"));
        assert_eq!(JobOutcome::WorkerCrashed.ledger_tag(), Some("Worker crashed"));
        assert_eq!(JobOutcome::WorkerTimedOut.ledger_tag(), Some("Timeout error"));
        assert_eq!(JobOutcome::RunInterrupted.ledger_tag(), Some("Jumped"));
    }

    #[test]
    fn report_round_trips_as_one_json_line() {
        let report = WorkerReport {
            error: false,
            keys: Some(vec!["size".into(), "static.format".into()]),
        };
        let line = serde_json::to_string(&report).unwrap();
        assert!(!line.contains('\n'));
        let back: WorkerReport = serde_json::from_str(&line).unwrap();
        assert_eq!(back, report);
    }
}
