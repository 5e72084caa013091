//! Cooperative stop flag for the whole run.
//!
//! SIGQUIT (Ctrl+\) trips the flag; the driver consults it only
//! between artifacts, so the in-flight job always runs to its natural
//! or timeout-bounded conclusion. The per-job interrupt path (SIGINT
//! while waiting on a worker) lives in the supervisor instead and has
//! single-job scope.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Process-wide flag checked at the top of each driver iteration.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Safe to call from any task.
    pub fn trip(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Spawn a background task that trips the flag on SIGQUIT.
    /// Must run inside a tokio runtime.
    #[cfg(unix)]
    pub fn install(&self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut quit = signal(SignalKind::quit())?;
        let flag = self.clone();
        tokio::spawn(async move {
            if quit.recv().await.is_some() {
                warn!("stop requested; finishing the current artifact first");
                flag.trip();
            }
        });
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn install(&self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trip_is_visible_through_clones() {
        let flag = StopFlag::new();
        let other = flag.clone();
        assert!(!other.is_set());

        flag.trip();
        assert!(other.is_set());
    }
}
