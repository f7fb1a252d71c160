//! CLI command handlers

mod run;

pub use run::*;
