//! Point-in-time package snapshots.
//!
//! - [`SnapshotStore`] persists one requirements-style record per snapshot.
//! - [`diff`] compares any two package sets.

pub mod diff;
pub mod record;
mod storage;
mod types;

pub use diff::{PackageDiff, VersionChange, diff};
pub use storage::SnapshotStore;
pub use types::{Snapshot, SnapshotError, SnapshotMetadata};
