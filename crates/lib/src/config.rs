//! Runtime configuration.
//!
//! Values come from environment variables; front ends layer their own flags
//! on top by mutating the returned [`Config`].

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::consts::{
  AUDIT_FILENAME, DEFAULT_PYTHON, ENV_MAX_QUEUED_JOBS, ENV_OPERATION_TIMEOUT, ENV_PYTHON, JOBS_DIR, SNAPSHOTS_DIR,
};
use crate::platform::paths::data_dir;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid value for {var}: {value:?} ({reason})")]
  InvalidValue {
    var: &'static str,
    value: String,
    reason: String,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
  /// Interpreter whose site-packages are inspected and mutated.
  pub python: PathBuf,

  /// Root for snapshots, job logs and the audit journal.
  pub data_dir: PathBuf,

  /// Wall-clock limit for a single atomic operation.
  pub operation_timeout: Option<Duration>,

  /// Maximum number of jobs allowed to wait behind the running one.
  pub max_queued_jobs: Option<usize>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      python: PathBuf::from(DEFAULT_PYTHON),
      data_dir: data_dir(),
      operation_timeout: None,
      max_queued_jobs: None,
    }
  }
}

impl Config {
  /// Build a config from the process environment.
  pub fn from_env() -> Result<Self, ConfigError> {
    let mut config = Self::default();

    if let Ok(python) = std::env::var(ENV_PYTHON)
      && !python.trim().is_empty()
    {
      config.python = PathBuf::from(python);
    }

    if let Ok(raw) = std::env::var(ENV_OPERATION_TIMEOUT) {
      let secs = parse_number::<u64>(ENV_OPERATION_TIMEOUT, &raw)?;
      config.operation_timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }

    if let Ok(raw) = std::env::var(ENV_MAX_QUEUED_JOBS) {
      config.max_queued_jobs = Some(parse_number::<usize>(ENV_MAX_QUEUED_JOBS, &raw)?);
    }

    Ok(config)
  }

  pub fn snapshots_dir(&self) -> PathBuf {
    self.data_dir.join(SNAPSHOTS_DIR)
  }

  pub fn jobs_dir(&self) -> PathBuf {
    self.data_dir.join(JOBS_DIR)
  }

  pub fn audit_path(&self) -> PathBuf {
    self.data_dir.join(AUDIT_FILENAME)
  }
}

fn parse_number<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
    var,
    value: raw.to_string(),
    reason: e.to_string(),
  })
}
