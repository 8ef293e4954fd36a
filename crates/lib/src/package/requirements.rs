//! `pip freeze` style requirement text.

use super::types::{InventorySet, PackageRecord};

/// Result of reading requirement text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRequirements {
  /// Lines pinned as `name==version`.
  pub packages: InventorySet,

  /// Lines that cannot be expressed as a pin (editables, direct URLs, bare names).
  pub unpinned: Vec<String>,
}

/// Parse requirement text.
///
/// Blank lines and `#` comments are skipped. `-e ...` and `name @ url` lines,
/// and anything without `==`, land in `unpinned` verbatim. When a name repeats,
/// the last pin wins.
pub fn parse_requirements(text: &str) -> ParsedRequirements {
  let mut parsed = ParsedRequirements::default();

  for line in text.lines() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
      continue;
    }

    if line.starts_with("-e ") || line.contains(" @ ") {
      parsed.unpinned.push(line.to_string());
      continue;
    }

    match parse_pin(line) {
      Some(record) => {
        parsed.packages.insert(record);
      }
      None => parsed.unpinned.push(line.to_string()),
    }
  }

  parsed
}

/// Parse a single `name==version` line.
pub fn parse_pin(line: &str) -> Option<PackageRecord> {
  let (name, version) = line.split_once("==")?;
  let name = name.trim();
  let version = version.trim();
  if name.is_empty() || version.is_empty() || version.starts_with('=') {
    return None;
  }
  Some(PackageRecord::new(name, version))
}
