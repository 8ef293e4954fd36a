//! Names shared across the crate.

pub const APP_NAME: &str = "pkgsnap";

/// Overrides the data directory (snapshots, job logs, audit journal).
pub const ENV_DATA_DIR: &str = "PKGSNAP_DATA_DIR";

/// Interpreter whose package set is managed.
pub const ENV_PYTHON: &str = "PKGSNAP_PYTHON";

/// Per-operation wall-clock limit, in seconds.
pub const ENV_OPERATION_TIMEOUT: &str = "PKGSNAP_OPERATION_TIMEOUT";

/// Upper bound on jobs waiting behind the running one.
pub const ENV_MAX_QUEUED_JOBS: &str = "PKGSNAP_MAX_QUEUED_JOBS";

pub const SNAPSHOTS_DIR: &str = "snapshots";
pub const JOBS_DIR: &str = "jobs";
pub const AUDIT_FILENAME: &str = "audit.jsonl";

/// Number of trailing output lines quoted in a failure reason.
pub const FAILURE_TAIL_LINES: usize = 20;

#[cfg(windows)]
pub const DEFAULT_PYTHON: &str = "python";

#[cfg(not(windows))]
pub const DEFAULT_PYTHON: &str = "python3";
