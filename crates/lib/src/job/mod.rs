//! Asynchronous, single-flight execution of package operations.
//!
//! A [`Job`] is an ordered list of atomic operations run by the
//! [`JobExecutor`] worker. Output is kept in memory for polling, mirrored to a
//! per-job log file, and each finished operation lands in the audit journal.

pub mod audit;
mod executor;
pub mod log;
mod types;

pub use executor::{ExecutorOptions, JobExecutor};
pub use types::{Job, JobError, JobFailure, JobId, JobKind, JobStatus, OutputChunk, OutputLine};
