//! Bounded supervision of a worker process and outcome
//! classification.
//!
//! The wait here is the driver's only suspension point. Timeout
//! enforcement is external wall-clock from this side of the process
//! boundary: the analyzer body is untrusted and may never check a
//! cooperative cancellation signal, which is the whole reason jobs
//! run in their own processes.

use crate::error::Result;
use crate::job::{JobOutcome, WorkerReport};
use crate::runner::WorkerHandle;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Child;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Fixed extra wait added to a job's timeout budget before the worker
/// is forcibly terminated.
pub const GRACE_PERIOD: Duration = Duration::from_secs(3);

enum Waited {
    Exited(ExitStatus),
    TimedOut,
    Interrupted,
}

/// Wait for the worker within `budget` + `grace` and classify how the
/// job ended.
///
/// A Ctrl+C arriving during the wait aborts only this job: the worker
/// is killed, the outcome is [`JobOutcome::RunInterrupted`], and the
/// caller moves on to the next artifact.
///
/// The first wait installs the process-wide SIGINT handler, which
/// replaces the default disposition for the rest of the run. A Ctrl+C
/// landing between jobs, while no wait is in flight, is therefore
/// dropped instead of killing the process; that window is only the
/// driver's bookkeeping between artifacts. Use SIGQUIT (the stop
/// flag) to end the run.
pub async fn supervise(
    mut handle: WorkerHandle,
    budget: Option<Duration>,
    grace: Duration,
) -> Result<JobOutcome> {
    let waited = {
        let child = &mut handle.child;
        tokio::select! {
            waited = wait_bounded(child, budget, grace) => waited?,
            _ = tokio::signal::ctrl_c() => Waited::Interrupted,
        }
    };

    match waited {
        Waited::Exited(status) => classify(handle, status).await,
        Waited::TimedOut => {
            warn!("worker exceeded its budget; terminating");
            kill_and_reap(&mut handle.child).await;
            Ok(JobOutcome::WorkerTimedOut)
        }
        Waited::Interrupted => {
            warn!("interrupted while waiting; jumping to the next artifact");
            kill_and_reap(&mut handle.child).await;
            Ok(JobOutcome::RunInterrupted)
        }
    }
}

async fn wait_bounded(
    child: &mut Child,
    budget: Option<Duration>,
    grace: Duration,
) -> Result<Waited> {
    match budget {
        None => Ok(Waited::Exited(child.wait().await?)),
        Some(t) => match timeout(t + grace, child.wait()).await {
            Ok(status) => Ok(Waited::Exited(status?)),
            Err(_) => Ok(Waited::TimedOut),
        },
    }
}

async fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "worker already gone before kill");
    }
    let _ = child.wait().await;
}

async fn classify(handle: WorkerHandle, status: ExitStatus) -> Result<JobOutcome> {
    if !status.success() {
        // Death before the report takes priority over anything the
        // worker may still have printed.
        warn!(?status, "worker exited abnormally");
        return Ok(JobOutcome::WorkerCrashed);
    }
    match handle.report().await {
        Some(WorkerReport { error: true, .. }) => Ok(JobOutcome::AnalysisFailed),
        Some(WorkerReport { error: false, keys }) => Ok(JobOutcome::Completed {
            keys: keys.unwrap_or_default(),
        }),
        None => Ok(JobOutcome::WorkerCrashed),
    }
}
