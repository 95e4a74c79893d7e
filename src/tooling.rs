//! Tooling & Integration Layer
//!
//! Command-line access to the tree service for operators and scripts.

pub mod cli;

pub use cli::{Cli, CliContext, Commands, NodeCommands, RoleCommands};
