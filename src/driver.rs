//! The per-artifact loop: skip checks, delegation, outcome
//! application.
//!
//! Exactly one worker is alive at any time and artifacts are fully
//! resolved in enumeration order. No per-item failure is fatal to the
//! run; everything is contained at the iteration boundary and folded
//! into the returned [`RunStats`].

use crate::config::RunConfig;
use crate::error::Result;
use crate::job::{Job, JobOutcome};
use crate::layout::OutputLayout;
use crate::ledger::ErrorLedger;
use crate::runner::JobRunner;
use crate::signals::StopFlag;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Run-level progress counters, returned when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub done: u64,
    pub failed: u64,
}

/// Iterates the corpus and drives one job at a time.
pub struct Driver<R> {
    layout: OutputLayout,
    ledger: ErrorLedger,
    runner: R,
    stop: StopFlag,
    config: RunConfig,
}

impl<R: JobRunner> Driver<R> {
    pub fn new(
        layout: OutputLayout,
        ledger: ErrorLedger,
        runner: R,
        stop: StopFlag,
        config: RunConfig,
    ) -> Self {
        Self {
            layout,
            ledger,
            runner,
            stop,
            config,
        }
    }

    /// Process every artifact in `input_dir`, in lexicographic order
    /// of file name.
    pub async fn run(&mut self, input_dir: &Path) -> Result<RunStats> {
        let artifacts = enumerate(input_dir)?;
        info!(
            input = %input_dir.display(),
            count = artifacts.len(),
            "start sniffing"
        );

        let mut stats = RunStats::default();

        for path in artifacts {
            if self.stop.is_set() {
                warn!("stop flag set; ending the run");
                break;
            }

            let name = match path.file_name() {
                Some(n) => n.to_string_lossy().into_owned(),
                None => continue,
            };

            if self.config.quarantine && self.ledger.contains(&name) {
                warn!(artifact = %name, "in history of errors; skipping");
                stats.failed += 1;
                continue;
            }

            self.layout.ensure_dir(&name)?;

            if self.layout.is_complete(&name) {
                debug!(artifact = %name, "marker present; already done");
                stats.done += 1;
                continue;
            }

            info!(artifact = %name, done = stats.done, failed = stats.failed, "mining");
            self.layout.copy_in(&name, &path)?;

            let job = Job {
                artifact: path.clone(),
                name: name.clone(),
                dest_dir: self.layout.dest_dir(&name),
                timeout: self.config.timeout,
                static_only: self.config.static_only,
                hardcode: self.config.hardcode.clone(),
            };

            match self.runner.run(&job).await {
                Ok(JobOutcome::Completed { keys }) => {
                    self.layout.write_marker(&name, &keys)?;
                    stats.done += 1;
                    info!(artifact = %name, keys = keys.len(), "finished");
                }
                Ok(outcome) => {
                    // Every remaining variant is a terminal failure.
                    let tag = outcome.ledger_tag().unwrap_or("Driver error");
                    self.fail(&name, tag, &mut stats)?;
                }
                Err(e) => {
                    error!(artifact = %name, error = %e, "driver-side failure");
                    let tag = format!("Driver error {e}");
                    self.fail(&name, &tag, &mut stats)?;
                }
            }
        }

        info!(done = stats.done, failed = stats.failed, "run ended");
        Ok(stats)
    }

    /// Count a terminal failure and, in quarantine mode, record it and
    /// roll back the claimed output.
    fn fail(&mut self, name: &str, tag: &str, stats: &mut RunStats) -> Result<()> {
        stats.failed += 1;
        if self.config.quarantine {
            warn!(artifact = %name, tag, "dropping and deleting output folder");
            self.ledger.record(tag, name)?;
            self.layout.discard(name)?;
        }
        Ok(())
    }
}

/// Files directly under `input_dir`, sorted by file name. The order is
/// an explicit choice so resumed runs see a stable sequence.
fn enumerate(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(input_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort_by_key(|p| p.file_name().map(|n| n.to_owned()));
    Ok(files)
}
