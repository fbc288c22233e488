//! CLI module for chatops - command-line interface and subcommands.
//!
//! Provides the entry point with subcommands for serving Slack, installing
//! vendored tools, checking the configuration and posting a one-off message.

pub mod commands;

pub use commands::Cli;
