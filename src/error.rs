//! Error types for the binminer batch orchestrator.
//!
//! Setup problems (a missing output directory, an unreadable hardcode
//! file) are fatal and abort the run before any artifact is touched.
//! Per-artifact failures never appear here: they are classified into a
//! [`crate::job::JobOutcome`] and contained at the driver's iteration
//! boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for binminer operations.
#[derive(Debug, Error)]
pub enum MinerError {
    /// The output root must exist before a run starts.
    #[error("output directory does not exist: {0}")]
    MissingOutputDir(PathBuf),

    /// The hardcode dictionary could not be read or parsed.
    #[error("problem with dictionary to hardcode ({path}): {reason}")]
    Hardcode { path: PathBuf, reason: String },

    /// A worker process could not be started at all.
    #[error("failed to spawn worker: {0}")]
    Spawn(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Feature extraction errors surfaced inside the worker.
    #[error("analysis error: {0}")]
    Analysis(String),
}

/// Result type alias for binminer operations
pub type Result<T> = std::result::Result<T, MinerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MinerError::MissingOutputDir(PathBuf::from("/tmp/nope"));
        assert_eq!(err.to_string(), "output directory does not exist: /tmp/nope");

        let err = MinerError::Hardcode {
            path: PathBuf::from("hard.json"),
            reason: "expected a JSON object".to_string(),
        };
        assert!(err.to_string().contains("hard.json"));
        assert!(err.to_string().contains("expected a JSON object"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = MinerError::from(io);
        assert!(matches!(err, MinerError::Io(_)));
    }
}
