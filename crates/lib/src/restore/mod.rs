//! Restore planning: converge the live environment on a snapshot.

mod plan;

pub use plan::{RestorePlan, RestorePreview, plan_operations, plan_restore, preview_restore};
