//! binminer: resumable batch feature mining over binary corpora.
//!
//! The crate is built around a sequential batch orchestrator. For
//! every artifact in an input folder the [`driver::Driver`] consults
//! the on-disk [`layout::OutputLayout`] and the quarantine
//! [`ledger::ErrorLedger`] to skip already-resolved items, then runs
//! the [`analyzer`] in an isolated worker process via
//! [`runner::ProcessRunner`] under the bounded wait of the
//! [`supervisor`]. One bad artifact never aborts the batch: every
//! failure is classified into a [`job::JobOutcome`] and contained at
//! the iteration boundary, and a killed run resumes where it left
//! off.

pub mod analyzer;
pub mod config;
pub mod driver;
pub mod error;
pub mod job;
pub mod layout;
pub mod ledger;
pub mod logging;
pub mod runner;
pub mod signals;
pub mod supervisor;

pub use config::RunConfig;
pub use driver::{Driver, RunStats};
pub use error::{MinerError, Result};
pub use job::{Job, JobOutcome, WorkerReport};
pub use layout::OutputLayout;
pub use ledger::{ErrorLedger, MatchPolicy};
pub use runner::{JobRunner, ProcessRunner};
pub use signals::StopFlag;
