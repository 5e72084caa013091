//! Worker process spawning and the one-shot report channel.
//!
//! Every job runs in its own OS process so a hanging or crashing
//! analyzer can never corrupt or halt the driver. The channel back is
//! the worker's stdout: exactly one JSON [`WorkerReport`] line printed
//! just before a clean exit. A worker that dies first simply never
//! produces that line, and the silence is itself the crash signal.

use crate::error::{MinerError, Result};
use crate::job::{Job, JobOutcome, WorkerReport};
use crate::supervisor::{self, GRACE_PERIOD};
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::debug;

/// Executes one job in an isolated worker and classifies the result.
///
/// The trait exists so the driver can be exercised with scripted
/// outcomes; the production implementation is [`ProcessRunner`].
pub trait JobRunner {
    fn run(&mut self, job: &Job) -> impl Future<Output = Result<JobOutcome>>;
}

/// A spawned worker plus the task draining its report pipe.
///
/// Stdout is drained concurrently with the wait so a long key list
/// can never fill the pipe and deadlock a worker that is about to
/// exit.
pub struct WorkerHandle {
    pub(crate) child: Child,
    drain: JoinHandle<String>,
}

impl WorkerHandle {
    /// Spawn `cmd` with stdout piped and start draining it.
    pub fn spawn(mut cmd: Command) -> Result<Self> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true);
        let mut child = cmd.spawn().map_err(|e| MinerError::Spawn(e.to_string()))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| MinerError::Spawn("worker stdout was not captured".into()))?;
        let drain = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stdout.read_to_string(&mut buf).await;
            buf
        });
        Ok(Self { child, drain })
    }

    /// The worker's report, if it managed to print one.
    ///
    /// Only meaningful after the child has been reaped. The report is
    /// the last non-empty stdout line; anything before it is
    /// incidental worker output.
    pub(crate) async fn report(self) -> Option<WorkerReport> {
        let buf = self.drain.await.ok()?;
        let line = buf.lines().rev().find(|l| !l.trim().is_empty())?;
        serde_json::from_str(line.trim()).ok()
    }
}

/// Spawns the current executable in hidden worker mode, one process
/// per job.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    grace: Duration,
}

impl ProcessRunner {
    /// Runner that re-executes the running binary.
    pub fn from_current_exe() -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            grace: GRACE_PERIOD,
        }
    }

    fn command(&self, job: &Job) -> Result<Command> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("worker")
            .arg("--artifact")
            .arg(&job.artifact)
            .arg("--dest")
            .arg(&job.dest_dir);
        if let Some(budget) = job.timeout {
            cmd.arg("--timeout").arg(budget.as_secs().to_string());
        }
        if job.static_only {
            cmd.arg("--only-static");
        }
        if !job.hardcode.is_empty() {
            cmd.arg("--hardcode")
                .arg(serde_json::to_string(&job.hardcode)?);
        }
        Ok(cmd)
    }
}

impl JobRunner for ProcessRunner {
    async fn run(&mut self, job: &Job) -> Result<JobOutcome> {
        debug!(artifact = %job.name, "spawning worker");
        let handle = WorkerHandle::spawn(self.command(job)?)?;
        supervisor::supervise(handle, job.timeout, self.grace).await
    }
}
