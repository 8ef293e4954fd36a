//! Hashing utilities for snapshot content verification.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A full 64-character SHA256 hash for content verification.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash a sequence of lines, each terminated by `\n`.
pub fn hash_lines<'a, I>(lines: I) -> ContentHash
where
  I: IntoIterator<Item = &'a str>,
{
  let mut hasher = Sha256::new();
  for line in lines {
    hasher.update(line.as_bytes());
    hasher.update(b"\n");
  }
  ContentHash(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_lines_known_value() {
    let hash = hash_lines(["requests==2.31.0", "urllib3==2.0.7"]);
    assert_eq!(hash.0, "1656e769657f3a2af2445b17f0c39fee05de2aa0ad267e82114e141688f3d3cf");
  }

  #[test]
  fn hash_of_no_lines_is_empty_digest() {
    let hash = hash_lines(std::iter::empty());
    assert_eq!(hash.0, "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
  }

  #[test]
  fn hash_lines_is_order_sensitive() {
    assert_ne!(hash_lines(["a==1", "b==1"]), hash_lines(["b==1", "a==1"]));
  }
}
