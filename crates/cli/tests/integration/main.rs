//! CLI integration tests.
//!
//! Every test drives the real binary against a fake `python` shell script.

#![cfg(unix)]

mod common;
mod diff_tests;
mod job_tests;
mod snapshot_tests;
