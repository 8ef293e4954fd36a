//! pkgsnap-lib: Core types and logic for pkgsnap
//!
//! This crate provides the pieces of a local Python package console:
//! - `Inventory`: cached view of the interpreter's installed packages
//! - `Snapshot`: immutable, on-disk record of a package set
//! - `diff`: structured comparison of two package sets
//! - `restore`: ordered operations converging the environment on a snapshot
//! - `JobExecutor`: single-flight, asynchronous execution of package operations
//! - `PackageConsole`: the facade front ends talk to

pub mod config;
pub mod console;
pub mod consts;
pub mod environment;
pub mod inventory;
pub mod job;
pub mod package;
pub mod platform;
pub mod restore;
pub mod snapshot;
pub mod util;

pub use config::Config;
pub use console::{ConsoleError, PackageConsole};
