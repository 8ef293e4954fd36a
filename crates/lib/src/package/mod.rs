//! Package records, installed-package sets and the operations that mutate them.

pub mod operation;
pub mod requirements;
pub mod types;

pub use operation::{AtomicPackageOperation, PackageAction};
pub use requirements::{ParsedRequirements, parse_pin, parse_requirements};
pub use types::{InventorySet, PackageRecord, normalize_name, normalize_version};
