mod diff;
mod info;
mod job;
mod list;
mod plan;
mod snapshot;

use pkgsnap_lib::PackageConsole;
use pkgsnap_lib::environment::PipEnvironment;

pub use diff::cmd_diff;
pub use info::cmd_info;
pub use job::{JobCommand, cmd_job};
pub use list::cmd_list;
pub use plan::cmd_plan;
pub use snapshot::{SnapshotCommand, cmd_snapshot};

pub type Console = PackageConsole<PipEnvironment>;
