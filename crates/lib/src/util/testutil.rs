//! Test utilities for pkgsnap-lib.
//!
//! [`FakeEnvironment`] stands in for a real interpreter: it keeps an in-memory
//! package set and runs scripted outcomes per package instead of spawning pip.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use crate::environment::{
  Cancellation, EnvironmentError, OperationOutcome, OutputSink, OutputStream, PackageEnvironment,
};
use crate::package::{
  AtomicPackageOperation, InventorySet, PackageAction, PackageRecord, ParsedRequirements, normalize_name,
};

/// Version a fake "latest" install resolves to.
pub const FAKE_LATEST_VERSION: &str = "99.0";

pub const FAKE_INTERPRETER: &str = "CPython 3.12.1 (linux, venv)";

/// Scripted behaviour for operations on one package.
#[derive(Debug, Clone)]
pub enum Script {
  /// Apply the operation to the fake package set and exit 0.
  Succeed,
  /// Print `output` to stderr and exit with `code`, leaving the set untouched.
  Fail { output: Vec<String>, code: i32 },
  /// Run until cancelled.
  BlockUntilCancelled,
  /// Wait for the gate to open, then behave like `Succeed`.
  Gate(Arc<Notify>),
  /// Like `Gate`, but ignores cancellation.
  Uninterruptible(Arc<Notify>),
  /// Report the operation as force-terminated after `limit`.
  TimeOut(Duration),
}

impl Script {
  pub fn fail(message: &str) -> Self {
    Script::Fail {
      output: vec![message.to_string()],
      code: 1,
    }
  }
}

#[derive(Default)]
pub struct FakeEnvironment {
  installed: Mutex<InventorySet>,
  scripts: Mutex<HashMap<String, Script>>,
  editables: Mutex<Vec<(String, String)>>,
  calls: Mutex<Vec<AtomicPackageOperation>>,
  unavailable: AtomicBool,
  list_calls: AtomicUsize,
  running: AtomicUsize,
  max_running: AtomicUsize,
}

impl FakeEnvironment {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_packages(records: &[(&str, &str)]) -> Self {
    let env = Self::new();
    env.set_installed(records);
    env
  }

  pub fn set_installed(&self, records: &[(&str, &str)]) {
    *self.installed.lock().unwrap() = records.iter().map(|(n, v)| PackageRecord::new(*n, *v)).collect();
  }

  pub fn installed(&self) -> InventorySet {
    self.installed.lock().unwrap().clone()
  }

  pub fn script(&self, name: &str, script: Script) {
    self.scripts.lock().unwrap().insert(normalize_name(name), script);
  }

  /// Report the installed package `name` to freeze as the unpinned `line`.
  pub fn set_editable(&self, name: &str, line: &str) {
    self
      .editables
      .lock()
      .unwrap()
      .push((normalize_name(name), line.to_string()));
  }

  pub fn set_unavailable(&self, unavailable: bool) {
    self.unavailable.store(unavailable, Ordering::SeqCst);
  }

  /// Operations run so far, in order.
  pub fn calls(&self) -> Vec<AtomicPackageOperation> {
    self.calls.lock().unwrap().clone()
  }

  pub fn list_calls(&self) -> usize {
    self.list_calls.load(Ordering::SeqCst)
  }

  /// Highest number of operations ever observed running at once.
  pub fn max_concurrent(&self) -> usize {
    self.max_running.load(Ordering::SeqCst)
  }

  fn unavailable_error(&self) -> EnvironmentError {
    EnvironmentError::Unavailable {
      python: "fake-python".into(),
      reason: "scripted outage".into(),
    }
  }

  fn apply(&self, op: &AtomicPackageOperation) {
    let mut installed = self.installed.lock().unwrap();
    match op.action {
      PackageAction::Install => {
        let version = op.version.clone().unwrap_or_else(|| FAKE_LATEST_VERSION.to_string());
        installed.insert(PackageRecord::new(op.name.clone(), version));
      }
      PackageAction::Uninstall => {
        installed.remove(&op.name);
      }
    }
  }
}

/// Tracks concurrently running operations.
struct RunningGuard<'a>(&'a FakeEnvironment);

impl<'a> RunningGuard<'a> {
  fn enter(env: &'a FakeEnvironment) -> Self {
    let now = env.running.fetch_add(1, Ordering::SeqCst) + 1;
    env.max_running.fetch_max(now, Ordering::SeqCst);
    Self(env)
  }
}

impl Drop for RunningGuard<'_> {
  fn drop(&mut self) {
    self.0.running.fetch_sub(1, Ordering::SeqCst);
  }
}

impl PackageEnvironment for FakeEnvironment {
  async fn list_installed(&self) -> Result<InventorySet, EnvironmentError> {
    self.list_calls.fetch_add(1, Ordering::SeqCst);
    if self.unavailable.load(Ordering::SeqCst) {
      return Err(self.unavailable_error());
    }
    Ok(self.installed())
  }

  async fn freeze(&self) -> Result<ParsedRequirements, EnvironmentError> {
    if self.unavailable.load(Ordering::SeqCst) {
      return Err(self.unavailable_error());
    }
    let installed = self.installed();
    let editables = self.editables.lock().unwrap().clone();
    let is_editable = |record: &PackageRecord| editables.iter().any(|(name, _)| *name == record.key());

    Ok(ParsedRequirements {
      packages: installed.iter().filter(|r| !is_editable(r)).cloned().collect(),
      unpinned: editables
        .iter()
        .filter(|(name, _)| installed.contains(name))
        .map(|(_, line)| line.clone())
        .collect(),
    })
  }

  async fn interpreter_info(&self) -> Result<String, EnvironmentError> {
    if self.unavailable.load(Ordering::SeqCst) {
      return Err(self.unavailable_error());
    }
    Ok(FAKE_INTERPRETER.to_string())
  }

  async fn run_operation(
    &self,
    op: &AtomicPackageOperation,
    sink: &dyn OutputSink,
    mut cancel: Cancellation,
  ) -> Result<OperationOutcome, EnvironmentError> {
    self.calls.lock().unwrap().push(op.clone());
    if self.unavailable.load(Ordering::SeqCst) {
      return Err(self.unavailable_error());
    }
    let _guard = RunningGuard::enter(self);

    let script = self
      .scripts
      .lock()
      .unwrap()
      .get(&normalize_name(&op.name))
      .cloned()
      .unwrap_or(Script::Succeed);

    sink.line(OutputStream::Stdout, format!("fake: {op}"));
    tokio::task::yield_now().await;

    match script {
      Script::Succeed => {
        self.apply(op);
        Ok(OperationOutcome::succeeded())
      }
      Script::Fail { output, code } => {
        for line in output {
          sink.line(OutputStream::Stderr, line);
        }
        Ok(OperationOutcome::failed(code))
      }
      Script::BlockUntilCancelled => {
        cancel.cancelled().await;
        Ok(OperationOutcome::cancelled())
      }
      Script::Gate(gate) => {
        tokio::select! {
          _ = gate.notified() => {
            self.apply(op);
            Ok(OperationOutcome::succeeded())
          }
          _ = cancel.cancelled() => Ok(OperationOutcome::cancelled()),
        }
      }
      Script::Uninterruptible(gate) => {
        gate.notified().await;
        self.apply(op);
        Ok(OperationOutcome::succeeded())
      }
      Script::TimeOut(limit) => {
        sink.line(OutputStream::System, "process terminated: timed out".into());
        Ok(OperationOutcome::timed_out(limit))
      }
    }
  }
}
