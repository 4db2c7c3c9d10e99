//! Command-line interface for activity-sync.
//!
//! Provides the `serve`, `sync` and `status` commands.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
