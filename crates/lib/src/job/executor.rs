//! Single-flight job executor.
//!
//! Jobs are accepted by [`JobExecutor::submit`] without blocking and drained
//! in FIFO order by one background worker task. The worker runs at most one
//! atomic operation at a time, so at most one job is ever `running`.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::consts::FAILURE_TAIL_LINES;
use crate::environment::{
  CancelHandle, Cancellation, OperationOutcome, OperationStatus, OutputSink, OutputStream, PackageEnvironment,
};
use crate::inventory::Inventory;
use crate::package::AtomicPackageOperation;
use crate::util::clock::{format_timestamp, now_secs};

use super::audit::{AuditJournal, AuditRecord};
use super::log::JobLog;
use super::types::{Job, JobError, JobFailure, JobId, JobKind, JobStatus, OutputChunk, OutputLine};

const UNKNOWN_INTERPRETER: &str = "unknown";

#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
  /// Maximum number of jobs allowed to wait behind the running one.
  pub max_queued_jobs: Option<usize>,

  /// Directory receiving one `<job_id>.log` per job.
  pub jobs_dir: Option<PathBuf>,

  /// JSON Lines journal of finished operations.
  pub audit_path: Option<PathBuf>,
}

struct Slot {
  job: Job,
  cancel: CancelHandle,
  done: watch::Sender<JobStatus>,
}

#[derive(Default)]
struct State {
  jobs: HashMap<JobId, Slot>,
  /// Submission order.
  order: Vec<JobId>,
  /// Jobs accepted but not yet started.
  waiting: usize,
  running: Option<JobId>,
}

struct Shared {
  state: Mutex<State>,
  max_queued_jobs: Option<usize>,
}

impl Shared {
  fn lock(&self) -> MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn update(&self, id: &JobId, f: impl FnOnce(&mut Job)) {
    if let Some(slot) = self.lock().jobs.get_mut(id) {
      f(&mut slot.job);
    }
  }
}

/// Handle to the executor. Cloning shares the same queue and history.
#[derive(Clone)]
pub struct JobExecutor {
  shared: Arc<Shared>,
  queue: mpsc::UnboundedSender<JobId>,
}

impl JobExecutor {
  /// Spawn the worker on the current tokio runtime.
  pub fn start<E: PackageEnvironment>(inventory: Arc<Inventory<E>>, options: ExecutorOptions) -> Self {
    let (queue, rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared {
      state: Mutex::new(State::default()),
      max_queued_jobs: options.max_queued_jobs,
    });

    let worker = Worker {
      shared: shared.clone(),
      inventory,
      jobs_dir: options.jobs_dir,
      audit: options.audit_path.map(AuditJournal::new),
      interpreter: None,
    };
    tokio::spawn(worker.run(rx));

    Self { shared, queue }
  }

  /// Enqueue a job and return it immediately.
  ///
  /// The returned job is `running` when nothing else was active or waiting,
  /// `queued` otherwise. Only an empty `batch-restore` may have no operations.
  pub fn submit(&self, kind: JobKind, operations: Vec<AtomicPackageOperation>) -> Result<Job, JobError> {
    if operations.is_empty() && kind != JobKind::BatchRestore {
      return Err(JobError::EmptyJob);
    }

    let now = now_secs();
    let mut job = Job::new(kind, operations, now);
    let id = job.id.clone();

    let mut guard = self.shared.lock();
    let state = &mut *guard;

    let idle = state.running.is_none() && state.waiting == 0;
    if !idle
      && let Some(capacity) = self.shared.max_queued_jobs
      && state.waiting >= capacity
    {
      warn!(kind = %kind, capacity, "job rejected: queue full");
      return Err(JobError::QueueFull { capacity });
    }

    self.queue.send(id.clone()).map_err(|_| JobError::ExecutorStopped)?;

    if idle {
      job.status = JobStatus::Running;
      job.started_at = Some(now);
      state.running = Some(id.clone());
    } else {
      state.waiting += 1;
    }

    info!(job_id = %id, kind = %kind, operations = job.operations.len(), status = %job.status, "job submitted");

    let (cancel, _) = Cancellation::new();
    let (done, _) = watch::channel(job.status);
    state.order.push(id.clone());
    state.jobs.insert(
      id,
      Slot {
        job: job.clone(),
        cancel,
        done,
      },
    );

    Ok(job)
  }

  /// Current state of a job, including all output so far.
  pub fn status(&self, id: &JobId) -> Result<Job, JobError> {
    self
      .shared
      .lock()
      .jobs
      .get(id)
      .map(|slot| slot.job.clone())
      .ok_or_else(|| JobError::NotFound(id.clone()))
  }

  /// Output lines from `position` onward.
  pub fn output_since(&self, id: &JobId, position: usize) -> Result<OutputChunk, JobError> {
    let state = self.shared.lock();
    let slot = state.jobs.get(id).ok_or_else(|| JobError::NotFound(id.clone()))?;
    let output = &slot.job.output;
    let start = position.min(output.len());

    Ok(OutputChunk {
      lines: output[start..].to_vec(),
      next: output.len(),
      status: slot.job.status,
    })
  }

  /// Request cancellation.
  ///
  /// A queued job is cancelled on the spot. A running job has its current
  /// subprocess terminated and runs no further operations; work already done
  /// is not rolled back.
  pub fn cancel(&self, id: &JobId) -> Result<Job, JobError> {
    let mut guard = self.shared.lock();
    let state = &mut *guard;
    let slot = state.jobs.get_mut(id).ok_or_else(|| JobError::NotFound(id.clone()))?;

    match slot.job.status {
      JobStatus::Queued => {
        slot.cancel.cancel();
        slot.job.status = JobStatus::Cancelled;
        slot.job.ended_at = Some(now_secs());
        slot.job.output.push(system_line(None, "cancelled before start"));
        slot.done.send_replace(JobStatus::Cancelled);
        state.waiting = state.waiting.saturating_sub(1);
        info!(job_id = %id, "queued job cancelled");
      }
      JobStatus::Running => {
        if !slot.cancel.is_cancelled() {
          slot.cancel.cancel();
          slot.job.output.push(system_line(None, "cancellation requested"));
          info!(job_id = %id, "cancellation requested for running job");
        }
      }
      status => {
        return Err(JobError::NotCancellable { id: id.clone(), status });
      }
    }

    Ok(slot.job.clone())
  }

  /// Resolve once the job reaches a terminal state.
  pub async fn wait(&self, id: &JobId) -> Result<Job, JobError> {
    let mut done = {
      let state = self.shared.lock();
      state
        .jobs
        .get(id)
        .ok_or_else(|| JobError::NotFound(id.clone()))?
        .done
        .subscribe()
    };
    done
      .wait_for(|status| status.is_terminal())
      .await
      .map_err(|_| JobError::ExecutorStopped)?;
    self.status(id)
  }

  /// Every job submitted to this executor, in submission order.
  pub fn jobs(&self) -> Vec<Job> {
    let state = self.shared.lock();
    state
      .order
      .iter()
      .filter_map(|id| state.jobs.get(id).map(|slot| slot.job.clone()))
      .collect()
  }
}

fn system_line(operation: Option<usize>, text: impl Into<String>) -> OutputLine {
  OutputLine {
    operation,
    stream: OutputStream::System,
    text: text.into(),
  }
}

/// Appends a job's output to its buffer and its log file.
struct Emitter<'a> {
  shared: &'a Shared,
  id: &'a JobId,
  log: Option<&'a JobLog>,
}

impl Emitter<'_> {
  fn emit(&self, operation: Option<usize>, stream: OutputStream, text: String) {
    if let Some(log) = self.log {
      log.line(operation, stream, &text);
    }
    self.shared.update(self.id, |job| {
      job.output.push(OutputLine {
        operation,
        stream,
        text,
      })
    });
  }

  fn system(&self, operation: Option<usize>, text: impl Into<String>) {
    self.emit(operation, OutputStream::System, text.into());
  }
}

/// Sink for one operation; keeps the tail of its output for failure reports.
struct OperationSink<'a> {
  emitter: &'a Emitter<'a>,
  index: usize,
  tail: Mutex<VecDeque<String>>,
}

impl<'a> OperationSink<'a> {
  fn new(emitter: &'a Emitter<'a>, index: usize) -> Self {
    Self {
      emitter,
      index,
      tail: Mutex::new(VecDeque::with_capacity(FAILURE_TAIL_LINES)),
    }
  }

  fn into_tail(self) -> Vec<String> {
    self
      .tail
      .into_inner()
      .unwrap_or_else(PoisonError::into_inner)
      .into()
  }
}

impl OutputSink for OperationSink<'_> {
  fn line(&self, stream: OutputStream, text: String) {
    if stream != OutputStream::System {
      let mut tail = self.tail.lock().unwrap_or_else(PoisonError::into_inner);
      if tail.len() == FAILURE_TAIL_LINES {
        tail.pop_front();
      }
      tail.push_back(text.clone());
    }
    self.emitter.emit(Some(self.index), stream, text);
  }
}

struct Worker<E> {
  shared: Arc<Shared>,
  inventory: Arc<Inventory<E>>,
  jobs_dir: Option<PathBuf>,
  audit: Option<AuditJournal>,
  interpreter: Option<String>,
}

impl<E: PackageEnvironment> Worker<E> {
  async fn run(mut self, mut queue: mpsc::UnboundedReceiver<JobId>) {
    while let Some(id) = queue.recv().await {
      self.run_job(id).await;
    }
    debug!("job executor stopped");
  }

  /// Interpreter tag for audit records, looked up once.
  async fn interpreter(&mut self) -> String {
    if let Some(interpreter) = &self.interpreter {
      return interpreter.clone();
    }
    let interpreter = match self.inventory.environment().interpreter_info().await {
      Ok(info) => info,
      Err(e) => {
        warn!(error = %e, "could not describe interpreter for audit records");
        UNKNOWN_INTERPRETER.to_string()
      }
    };
    self.interpreter = Some(interpreter.clone());
    interpreter
  }

  fn open_log(&self, id: &JobId, kind: JobKind, operations: usize) -> Option<JobLog> {
    let dir = self.jobs_dir.as_ref()?;
    match JobLog::create(dir, id, kind, operations) {
      Ok(log) => Some(log),
      Err(e) => {
        warn!(job_id = %id, error = %e, "could not open job log");
        None
      }
    }
  }

  /// Move the job to `running` unless it was cancelled while queued.
  fn claim(&self, id: &JobId) -> Option<(JobKind, Vec<AtomicPackageOperation>, Cancellation)> {
    let mut guard = self.shared.lock();
    let state = &mut *guard;
    let slot = state.jobs.get_mut(id)?;

    match slot.job.status {
      JobStatus::Queued => {
        slot.job.status = JobStatus::Running;
        slot.job.started_at = Some(now_secs());
        slot.done.send_replace(JobStatus::Running);
        state.waiting = state.waiting.saturating_sub(1);
      }
      JobStatus::Running => {}
      _ => return None,
    }

    state.running = Some(id.clone());
    Some((slot.job.kind, slot.job.operations.clone(), slot.cancel.subscribe()))
  }

  async fn run_job(&mut self, id: JobId) {
    let Some((kind, operations, cancel)) = self.claim(&id) else {
      if let Ok(job) = self.status(&id)
        && let Some(log) = self.open_log(&id, job.kind, job.operations.len())
      {
        log.line(None, OutputStream::System, "cancelled before start");
        log.finish(job.status);
      }
      debug!(job_id = %id, "skipping job cancelled while queued");
      return;
    };

    let interpreter = self.interpreter().await;
    let total = operations.len();
    info!(job_id = %id, kind = %kind, operations = total, "job started");

    let log = self.open_log(&id, kind, total);
    let emitter = Emitter {
      shared: &self.shared,
      id: &id,
      log: log.as_ref(),
    };

    if operations.is_empty() {
      emitter.system(None, "nothing to do: environment already matches");
    }

    let mut status = JobStatus::Succeeded;
    let mut failure = None;

    for (index, op) in operations.iter().enumerate() {
      if cancel.is_cancelled() {
        emitter.system(None, format!("cancelled before {op}"));
        status = JobStatus::Cancelled;
        break;
      }

      emitter.system(Some(index), format!("==> {op}"));
      debug!(job_id = %id, op = %op, index, "running operation");

      let sink = OperationSink::new(&emitter, index);
      let result = self
        .inventory
        .environment()
        .run_operation(op, &sink, cancel.clone())
        .await;
      let tail = sink.into_tail();

      let (reason, exit_code) = match result {
        Ok(outcome) => {
          self.audit(&id, kind, op, outcome.status, outcome.exit_code, &interpreter);
          match outcome.status {
            OperationStatus::Succeeded => {
              emitter.system(Some(index), "<== succeeded");
              self.shared.update(&id, |job| job.completed_operations += 1);
              continue;
            }
            OperationStatus::Cancelled => {
              emitter.system(Some(index), "<== cancelled");
              status = JobStatus::Cancelled;
              break;
            }
            OperationStatus::Failed => (failed_reason(op, &outcome), outcome.exit_code),
            OperationStatus::TimedOut => (failed_reason(op, &outcome), None),
          }
        }
        Err(e) => {
          self.audit(&id, kind, op, OperationStatus::Failed, None, &interpreter);
          (format!("{op} could not run: {e}"), None)
        }
      };

      error!(job_id = %id, op = %op, reason = %reason, "operation failed");
      emitter.system(Some(index), format!("<== failed: {reason}"));
      status = JobStatus::Failed;
      failure = Some(JobFailure {
        operation_index: index,
        operation: op.clone(),
        exit_code,
        reason,
        output: tail,
      });
      break;
    }

    self.post_check(&emitter, failure.as_ref()).await;

    if let Some(log) = &log {
      log.finish(status);
    }

    let mut guard = self.shared.lock();
    let state = &mut *guard;
    if let Some(slot) = state.jobs.get_mut(&id) {
      slot.job.status = status;
      slot.job.ended_at = Some(now_secs());
      slot.job.failure = failure;
      slot.done.send_replace(status);
    }
    state.running = None;
    drop(guard);

    info!(job_id = %id, status = %status, "job finished");
  }

  fn status(&self, id: &JobId) -> Result<Job, JobError> {
    self
      .shared
      .lock()
      .jobs
      .get(id)
      .map(|slot| slot.job.clone())
      .ok_or_else(|| JobError::NotFound(id.clone()))
  }

  /// Refresh the inventory and report what it shows for the failing package.
  async fn post_check(&self, emitter: &Emitter<'_>, failure: Option<&JobFailure>) {
    match self.inventory.refresh().await {
      Ok(set) => match failure {
        Some(failure) => {
          let name = &failure.operation.name;
          let observed = match set.get(name) {
            Some(record) => format!("{} is installed at {}", record.name, record.version),
            None => format!("{name} is not installed"),
          };
          warn!(package = %name, observed = %observed, "environment state after failed operation");
          emitter.system(None, format!("post-check: {observed}"));
        }
        None => emitter.system(None, format!("post-check: inventory refreshed ({} packages)", set.len())),
      },
      Err(e) => {
        warn!(error = %e, "post-job inventory refresh failed");
        emitter.system(None, format!("post-check: inventory refresh failed: {e}"));
      }
    }
  }

  fn audit(
    &self,
    id: &JobId,
    kind: JobKind,
    op: &AtomicPackageOperation,
    outcome: OperationStatus,
    exit_code: Option<i32>,
    interpreter: &str,
  ) {
    let Some(journal) = &self.audit else {
      return;
    };
    let record = AuditRecord {
      timestamp: format_timestamp(now_secs()),
      job_id: id.clone(),
      kind,
      action: op.action,
      package: op.name.clone(),
      version: op.version.clone(),
      outcome,
      exit_code,
      interpreter: interpreter.to_string(),
    };
    if let Err(e) = journal.append(&record) {
      warn!(path = %journal.path().display(), error = %e, "failed to append audit record");
    }
  }
}

fn failed_reason(op: &AtomicPackageOperation, outcome: &OperationOutcome) -> String {
  match (outcome.timeout, outcome.exit_code) {
    (Some(limit), _) => format!("{op} timed out after {}", humantime::format_duration(limit)),
    (None, Some(code)) => format!("{op} exited with status {code}"),
    (None, None) => format!("{op} was terminated by a signal"),
  }
}
