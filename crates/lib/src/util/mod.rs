//! Shared utilities.
//!
//! Common utilities used across the crate including hashing, clocks and test helpers.

pub mod clock;
pub mod hash;

#[cfg(test)]
pub mod testutil;
