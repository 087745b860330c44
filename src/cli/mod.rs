//! CLI module for specloop - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for the requirements
//! interview, the refinement loop, code generation and the research service.

pub mod commands;

pub use commands::{Cli, Commands};
