//! Front-end facade.
//!
//! [`PackageConsole`] wires the inventory, snapshot store, restore planner and
//! job executor together and exposes the operations a UI needs. Read-only
//! calls run directly; every mutation goes through the job executor.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::environment::{EnvironmentError, PackageEnvironment, PipEnvironment};
use crate::inventory::Inventory;
use crate::job::{ExecutorOptions, Job, JobError, JobExecutor, JobId, JobKind, OutputChunk};
use crate::package::{AtomicPackageOperation, InventorySet};
use crate::restore::{RestorePlan, RestorePreview, plan_restore, preview_restore};
use crate::snapshot::{PackageDiff, Snapshot, SnapshotError, SnapshotMetadata, SnapshotStore, diff};

#[derive(Debug, Error)]
pub enum ConsoleError {
  #[error(transparent)]
  Environment(#[from] EnvironmentError),

  #[error(transparent)]
  Snapshot(#[from] SnapshotError),

  #[error(transparent)]
  Job(#[from] JobError),
}

pub struct PackageConsole<E> {
  python: String,
  inventory: Arc<Inventory<E>>,
  store: SnapshotStore,
  executor: JobExecutor,
}

impl PackageConsole<PipEnvironment> {
  /// Console over the interpreter named in `config`.
  ///
  /// Must be called from within a tokio runtime.
  pub fn from_config(config: &Config) -> Self {
    let env = PipEnvironment::new(&config.python).with_timeout(config.operation_timeout);
    Self::new(Arc::new(env), config)
  }
}

impl<E: PackageEnvironment> PackageConsole<E> {
  /// Must be called from within a tokio runtime.
  pub fn new(env: Arc<E>, config: &Config) -> Self {
    let inventory = Arc::new(Inventory::new(env));
    let executor = JobExecutor::start(
      inventory.clone(),
      ExecutorOptions {
        max_queued_jobs: config.max_queued_jobs,
        jobs_dir: Some(config.jobs_dir()),
        audit_path: Some(config.audit_path()),
      },
    );

    Self {
      python: config.python.display().to_string(),
      inventory,
      store: SnapshotStore::new(config.snapshots_dir()),
      executor,
    }
  }

  pub fn inventory(&self) -> &Inventory<E> {
    &self.inventory
  }

  pub fn store(&self) -> &SnapshotStore {
    &self.store
  }

  pub fn executor(&self) -> &JobExecutor {
    &self.executor
  }

  // Inventory

  pub async fn refresh_inventory(&self) -> Result<InventorySet, ConsoleError> {
    Ok(self.inventory.refresh().await?)
  }

  pub async fn interpreter_info(&self) -> Result<String, ConsoleError> {
    Ok(self.inventory.environment().interpreter_info().await?)
  }

  // Diff

  pub fn diff(&self, source: &InventorySet, target: &InventorySet) -> PackageDiff {
    diff(source, target)
  }

  /// What restoring `id` would change, against freshly frozen pins.
  pub async fn diff_snapshot_vs_current(&self, id: &str) -> Result<PackageDiff, ConsoleError> {
    let snapshot = self.store.load_snapshot(id)?;
    let current = self.inventory.freeze().await?.packages;
    Ok(diff(&current, &snapshot.packages))
  }

  pub fn diff_snapshots(&self, source_id: &str, target_id: &str) -> Result<PackageDiff, ConsoleError> {
    let source = self.store.load_snapshot(source_id)?;
    let target = self.store.load_snapshot(target_id)?;
    Ok(diff(&source.packages, &target.packages))
  }

  // Snapshots

  pub async fn save_snapshot(&self, label: Option<&str>, comment: Option<&str>) -> Result<Snapshot, ConsoleError> {
    Ok(self.store.save(&self.inventory, label, comment).await?)
  }

  pub fn list_snapshots(&self) -> Result<Vec<SnapshotMetadata>, ConsoleError> {
    Ok(self.store.list()?)
  }

  pub fn load_snapshot(&self, id: &str) -> Result<Snapshot, ConsoleError> {
    Ok(self.store.load_snapshot(id)?)
  }

  pub fn delete_snapshot(&self, id: &str) -> Result<(), ConsoleError> {
    Ok(self.store.delete_snapshot(id)?)
  }

  // Jobs

  pub fn submit_job(&self, kind: JobKind, operations: Vec<AtomicPackageOperation>) -> Result<Job, ConsoleError> {
    Ok(self.executor.submit(kind, operations)?)
  }

  pub fn job_status(&self, id: &JobId) -> Result<Job, ConsoleError> {
    Ok(self.executor.status(id)?)
  }

  pub fn job_output_since(&self, id: &JobId, position: usize) -> Result<OutputChunk, ConsoleError> {
    Ok(self.executor.output_since(id, position)?)
  }

  pub fn cancel_job(&self, id: &JobId) -> Result<Job, ConsoleError> {
    Ok(self.executor.cancel(id)?)
  }

  pub async fn wait_job(&self, id: &JobId) -> Result<Job, ConsoleError> {
    Ok(self.executor.wait(id).await?)
  }

  pub fn jobs(&self) -> Vec<Job> {
    self.executor.jobs()
  }

  pub fn install(&self, name: &str, version: Option<&str>) -> Result<Job, ConsoleError> {
    let op = AtomicPackageOperation::install(name, version.map(str::to_string));
    self.submit_job(JobKind::Install, vec![op])
  }

  pub fn uninstall<S: AsRef<str>>(&self, names: &[S]) -> Result<Job, ConsoleError> {
    let ops = names
      .iter()
      .map(|name| AtomicPackageOperation::uninstall(name.as_ref()))
      .collect();
    self.submit_job(JobKind::Uninstall, ops)
  }

  /// Install the latest available version.
  pub fn upgrade(&self, name: &str) -> Result<Job, ConsoleError> {
    self.submit_job(JobKind::Upgrade, vec![AtomicPackageOperation::install(name, None)])
  }

  // Restore

  /// Plan converging the live environment on a snapshot.
  pub async fn plan_restore(&self, snapshot_id: &str) -> Result<RestorePlan, ConsoleError> {
    let target = self.store.load_snapshot(snapshot_id)?;
    let current = self.inventory.freeze().await?.packages;
    Ok(plan_restore(&current, &target))
  }

  pub async fn preview_restore(&self, snapshot_id: &str) -> Result<RestorePreview, ConsoleError> {
    let target = self.store.load_snapshot(snapshot_id)?;
    let current = self.inventory.freeze().await?.packages;
    Ok(preview_restore(&current, &target, &self.python))
  }

  /// Plan and submit a `batch-restore` job.
  pub async fn restore(&self, snapshot_id: &str) -> Result<Job, ConsoleError> {
    let plan = self.plan_restore(snapshot_id).await?;
    info!(snapshot_id, operations = plan.operations.len(), "submitting restore");
    self.submit_job(JobKind::BatchRestore, plan.operations)
  }
}
