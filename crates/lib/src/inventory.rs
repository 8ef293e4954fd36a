//! Cached view of the live installed-package set.
//!
//! The cache is never authoritative: [`Inventory::refresh`] always asks the
//! environment, and [`Inventory::current`] only avoids the subprocess when a
//! previous refresh succeeded.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::environment::{EnvironmentError, PackageEnvironment};
use crate::package::{InventorySet, ParsedRequirements};

pub struct Inventory<E> {
  env: Arc<E>,
  cache: RwLock<Option<InventorySet>>,
}

impl<E: PackageEnvironment> Inventory<E> {
  pub fn new(env: Arc<E>) -> Self {
    Self {
      env,
      cache: RwLock::new(None),
    }
  }

  pub fn environment(&self) -> &Arc<E> {
    &self.env
  }

  /// Query the environment and replace the cached set.
  ///
  /// On failure the previous cache is left untouched.
  pub async fn refresh(&self) -> Result<InventorySet, EnvironmentError> {
    let set = self.env.list_installed().await?;
    info!(count = set.len(), "inventory refreshed");
    *self.cache.write().unwrap_or_else(PoisonError::into_inner) = Some(set.clone());
    Ok(set)
  }

  /// Refresh the cache, then read the environment's requirement lines.
  ///
  /// Editable and direct-reference installs come back in `unpinned`, never as pins.
  pub async fn freeze(&self) -> Result<ParsedRequirements, EnvironmentError> {
    self.refresh().await?;
    self.env.freeze().await
  }

  /// Last refreshed set, refreshing first if nothing is cached yet.
  pub async fn current(&self) -> Result<InventorySet, EnvironmentError> {
    if let Some(set) = self.cached() {
      debug!(count = set.len(), "using cached inventory");
      return Ok(set);
    }
    self.refresh().await
  }

  /// Cached set without touching the environment.
  pub fn cached(&self) -> Option<InventorySet> {
    self.cache.read().unwrap_or_else(PoisonError::into_inner).clone()
  }
}
