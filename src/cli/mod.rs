//! CLI command handlers
//!
//! Argument parsing, routing and the implementation of each subcommand.

pub mod args;
pub mod commands;
pub mod router;

pub use args::{Cli, Commands};
pub use router::execute_command;
