//! CLI module for fsinstall - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for installing, cleaning,
//! preflight checks and config inspection.

pub mod commands;

pub use commands::Cli;
