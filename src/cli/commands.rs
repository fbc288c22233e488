//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: connect to Slack and serve commands (default)
//! - install-vendor-dependencies: run each dependency's install command
//! - check-config: validate the configuration and summarize its tools
//! - send-message: post one message to a channel

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// chatops - run catalogued shell tools from chat
#[derive(Parser, Debug)]
#[command(name = "chatops")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "CHATOPS_CONFIG_FILEPATH")]
    pub config_file: Option<PathBuf>,

    /// Slack bot token (xoxb-...)
    #[arg(long, global = true, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    pub slack_bot_token: Option<String>,

    /// Slack app-level token for Socket Mode (xapp-...)
    #[arg(long, global = true, env = "SLACK_APP_TOKEN", hide_env_values = true)]
    pub slack_app_token: Option<String>,

    /// Log level: debug, info, warn or error
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Kill commands that run longer than this many seconds
    #[arg(long, global = true, env = "CHATOPS_COMMAND_TIMEOUT_SECS")]
    pub command_timeout_secs: Option<u64>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Main subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Connect to Slack and serve commands
    Run,

    /// Install vendored dependencies listed in the configuration
    InstallVendorDependencies,

    /// Load and validate the configuration
    CheckConfig,

    /// Post a message to a channel
    SendMessage {
        /// Channel id
        #[arg(long)]
        channel: String,

        /// Message text
        #[arg(long)]
        message: String,
    },
}
