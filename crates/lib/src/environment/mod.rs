//! Access to the managed interpreter's package set.
//!
//! [`PackageEnvironment`] is the capability the rest of the crate depends on:
//! enumerate installed packages and run one mutating operation as a
//! subprocess, streaming its output. [`PipEnvironment`] is the real
//! implementation; tests supply scripted fakes.

pub mod pip;
pub mod types;

use std::future::Future;

use crate::package::{AtomicPackageOperation, InventorySet, ParsedRequirements};

pub use pip::PipEnvironment;
pub use types::{
  CancelHandle, Cancellation, EnvironmentError, OperationOutcome, OperationStatus, OutputSink, OutputStream,
};

pub trait PackageEnvironment: Send + Sync + 'static {
  /// Enumerate installed packages.
  ///
  /// Fails with [`EnvironmentError::Unavailable`] when the interpreter or its
  /// installer cannot be queried.
  fn list_installed(&self) -> impl Future<Output = Result<InventorySet, EnvironmentError>> + Send;

  /// Installed packages as requirement lines.
  ///
  /// Pinned packages land in `packages`; editable installs and direct
  /// references, which cannot be reinstalled from an index, land in
  /// `unpinned` verbatim.
  fn freeze(&self) -> impl Future<Output = Result<ParsedRequirements, EnvironmentError>> + Send;

  /// One-line description of the interpreter (implementation, version, platform).
  fn interpreter_info(&self) -> impl Future<Output = Result<String, EnvironmentError>> + Send;

  /// Run a single operation, forwarding every output line to `sink` as it is produced.
  ///
  /// A non-zero exit is reported through the returned outcome, not as an error.
  /// When `cancel` fires the subprocess is terminated and the outcome is
  /// [`OperationStatus::Cancelled`].
  fn run_operation(
    &self,
    op: &AtomicPackageOperation,
    sink: &dyn OutputSink,
    cancel: Cancellation,
  ) -> impl Future<Output = Result<OperationOutcome, EnvironmentError>> + Send;
}
