//! Nsbox - unprivileged namespace sandbox
//!
//! Runs one program inside private user, PID, and mount namespaces,
//! rooted at a read-only bind of a directory tree.

pub mod cli;
pub mod idmap;
pub mod runtime;
pub mod storage;

pub use storage::paths;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name, also the leaf of the per-user mount target directory
pub const APP_NAME: &str = "nsbox";

/// One-line description shown in --help
pub const APP_DESCRIPTION: &str =
    "Run a program inside private user, PID, and mount namespaces";
