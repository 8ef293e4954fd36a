use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

/// Canonical form of a distribution name.
///
/// Lowercases and collapses every run of `-`, `_` and `.` into a single `-`,
/// so `Foo_Bar`, `foo.bar` and `foo--bar` all compare equal.
pub fn normalize_name(name: &str) -> String {
  let mut out = String::with_capacity(name.len());
  let mut in_separator = false;
  for c in name.trim().chars() {
    if matches!(c, '-' | '_' | '.') {
      if !in_separator {
        out.push('-');
      }
      in_separator = true;
    } else {
      out.extend(c.to_lowercase());
      in_separator = false;
    }
  }
  out
}

/// Canonical form of a version token. Versions are opaque: no ordering is implied.
pub fn normalize_version(version: &str) -> String {
  version.trim().to_ascii_lowercase()
}

/// One installed distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
  /// Name as reported by the installer (display form).
  pub name: String,
  pub version: String,
}

impl PackageRecord {
  pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      name: name.into().trim().to_string(),
      version: version.into().trim().to_string(),
    }
  }

  /// Normalized name used for identity.
  pub fn key(&self) -> String {
    normalize_name(&self.name)
  }

  /// Whether both records pin the same version after normalization.
  pub fn same_version(&self, other: &PackageRecord) -> bool {
    normalize_version(&self.version) == normalize_version(&other.version)
  }

  /// Requirement line in `name==version` form.
  pub fn requirement(&self) -> String {
    format!("{}=={}", self.name, self.version)
  }
}

impl std::fmt::Display for PackageRecord {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}@{}", self.name, self.version)
  }
}

/// A point-in-time set of installed packages, unique by normalized name.
///
/// Iteration order is the normalized name, ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<PackageRecord>", into = "Vec<PackageRecord>")]
pub struct InventorySet {
  packages: BTreeMap<String, PackageRecord>,
}

impl InventorySet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert a record, replacing (and returning) any record with the same normalized name.
  pub fn insert(&mut self, record: PackageRecord) -> Option<PackageRecord> {
    self.packages.insert(record.key(), record)
  }

  pub fn remove(&mut self, name: &str) -> Option<PackageRecord> {
    self.packages.remove(&normalize_name(name))
  }

  pub fn get(&self, name: &str) -> Option<&PackageRecord> {
    self.packages.get(&normalize_name(name))
  }

  pub fn contains(&self, name: &str) -> bool {
    self.packages.contains_key(&normalize_name(name))
  }

  pub fn len(&self) -> usize {
    self.packages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.packages.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &PackageRecord> {
    self.packages.values()
  }

  /// Iterate `(normalized name, record)` pairs.
  pub(crate) fn entries(&self) -> btree_map::Iter<'_, String, PackageRecord> {
    self.packages.iter()
  }

  /// `name==version` lines in iteration order.
  pub fn requirement_lines(&self) -> Vec<String> {
    self.iter().map(PackageRecord::requirement).collect()
  }
}

impl FromIterator<PackageRecord> for InventorySet {
  fn from_iter<I: IntoIterator<Item = PackageRecord>>(iter: I) -> Self {
    let mut set = InventorySet::new();
    for record in iter {
      set.insert(record);
    }
    set
  }
}

impl From<Vec<PackageRecord>> for InventorySet {
  fn from(records: Vec<PackageRecord>) -> Self {
    records.into_iter().collect()
  }
}

impl From<InventorySet> for Vec<PackageRecord> {
  fn from(set: InventorySet) -> Self {
    set.packages.into_values().collect()
  }
}

impl<'a> IntoIterator for &'a InventorySet {
  type Item = &'a PackageRecord;
  type IntoIter = btree_map::Values<'a, String, PackageRecord>;

  fn into_iter(self) -> Self::IntoIter {
    self.packages.values()
  }
}
