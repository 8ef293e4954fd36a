//! Diff computation between package sets.
//!
//! Compares a source set (usually the live inventory) with a target set
//! (usually a snapshot) and classifies every package. Names match after
//! normalization; versions are opaque tokens compared for equality only.

use serde::{Deserialize, Serialize};

use crate::package::{InventorySet, PackageRecord, normalize_name};

/// A package present on both sides with different versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionChange {
  /// Display name from the target side.
  pub name: String,
  pub old_version: String,
  pub new_version: String,
}

impl VersionChange {
  pub fn key(&self) -> String {
    normalize_name(&self.name)
  }
}

/// Difference between a source and a target package set.
///
/// Every list is sorted by normalized name.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDiff {
  /// In target, absent from source.
  pub added: Vec<PackageRecord>,

  /// In source, absent from target.
  pub removed: Vec<PackageRecord>,

  /// Same name, different version.
  pub changed: Vec<VersionChange>,

  /// Same name, same version (records from the target).
  pub unchanged: Vec<PackageRecord>,
}

impl PackageDiff {
  /// Returns true if the two sides hold the same packages at the same versions.
  pub fn is_empty(&self) -> bool {
    self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
  }

  /// Number of packages that differ.
  pub fn change_count(&self) -> usize {
    self.added.len() + self.removed.len() + self.changed.len()
  }
}

/// Compute the diff that takes `source` to `target`.
pub fn diff(source: &InventorySet, target: &InventorySet) -> PackageDiff {
  let mut result = PackageDiff::default();
  let mut src = source.entries().peekable();
  let mut dst = target.entries().peekable();

  loop {
    match (src.peek(), dst.peek()) {
      (Some((src_key, _)), Some((dst_key, _))) => match src_key.cmp(dst_key) {
        std::cmp::Ordering::Less => {
          if let Some((_, record)) = src.next() {
            result.removed.push(record.clone());
          }
        }
        std::cmp::Ordering::Greater => {
          if let Some((_, record)) = dst.next() {
            result.added.push(record.clone());
          }
        }
        std::cmp::Ordering::Equal => {
          if let (Some((_, old)), Some((_, new))) = (src.next(), dst.next()) {
            if old.same_version(new) {
              result.unchanged.push(new.clone());
            } else {
              result.changed.push(VersionChange {
                name: new.name.clone(),
                old_version: old.version.clone(),
                new_version: new.version.clone(),
              });
            }
          }
        }
      },
      (Some(_), None) => result.removed.extend(src.by_ref().map(|(_, r)| r.clone())),
      (None, Some(_)) => result.added.extend(dst.by_ref().map(|(_, r)| r.clone())),
      (None, None) => break,
    }
  }

  result
}
