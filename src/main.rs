use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{LevelFilter, info};
use std::io::Write;
use std::sync::Arc;

use chatops::chat::{ChatClient, SlackClient, SocketModeListener, serve};
use chatops::dispatch::Dispatcher;
use chatops::exec::{ShellRunner, install_all};

mod cli;
mod config;

use cli::Cli;
use cli::commands::{Commands, LogFormat};
use config::{Config, Credentials};

/// Parse a level name; unknown names fall back to info
fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.to_ascii_lowercase().as_str() {
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warn" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        _ => None,
    }
}

fn setup_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = parse_level(level);

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(filter.unwrap_or(LevelFilter::Info))
        .target(env_logger::Target::Stdout);
    if format == LogFormat::Json {
        builder.format(|buf, record| {
            let line = serde_json::json!({
                "time": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                "level": record.level().to_string().to_lowercase(),
                "target": record.target(),
                "msg": record.args().to_string(),
            });
            writeln!(buf, "{}", line)
        });
    }
    builder.try_init().context("Failed to initialize logger")?;

    if filter.is_none() {
        log::warn!("Invalid log level '{}', using info", level);
    }
    info!("Logging initialized at {}", filter.unwrap_or(LevelFilter::Info));
    Ok(())
}

async fn run_application(cli: &Cli) -> Result<i32> {
    match &cli.command {
        None | Some(Commands::Run) => run_server(cli).await,
        Some(Commands::InstallVendorDependencies) => handle_install_command(cli).await,
        Some(Commands::CheckConfig) => handle_check_command(cli),
        Some(Commands::SendMessage { channel, message }) => {
            handle_send_command(cli, channel, message).await
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    Config::load(cli.config_file.as_ref(), cli.command_timeout_secs).context("Failed to load configuration")
}

async fn run_server(cli: &Cli) -> Result<i32> {
    let config = load_config(cli)?;
    let credentials = Credentials::new(cli.slack_bot_token.as_deref(), cli.slack_app_token.as_deref())?;
    let app_name = config.catalog.admin().app_name.clone();

    let chat = SlackClient::new(credentials.bot_token, app_name).context("Failed to create Slack client")?;
    let runner = match config.command_timeout {
        Some(limit) => {
            info!("Commands are limited to {:?}", limit);
            ShellRunner::new().with_timeout(limit)
        }
        None => ShellRunner::new(),
    };
    let dispatcher = Dispatcher::new(Arc::new(config.catalog), Arc::new(chat), Arc::new(runner))
        .context("Failed to create dispatcher")?;
    let listener = SocketModeListener::new(credentials.app_token).context("Failed to create Socket Mode listener")?;

    info!("Connecting to Slack");
    let code = serve(&listener, &dispatcher).await.context("Slack connection failed")?;
    info!("Exiting with code {}", code);
    Ok(code)
}

async fn handle_install_command(cli: &Cli) -> Result<i32> {
    let config = load_config(cli)?;
    let dependencies = config.catalog.dependencies();
    if dependencies.is_empty() {
        println!("{}", "No vendor dependencies configured".yellow());
        return Ok(0);
    }

    let reports = install_all(&ShellRunner::new(), dependencies).await;
    for report in &reports {
        if report.succeeded {
            println!("{} {}", "installed:".green(), report.name);
        } else {
            println!("{} {}", "failed:".red(), report.name);
            println!("{}", report.output);
        }
    }
    Ok(0)
}

fn handle_check_command(cli: &Cli) -> Result<i32> {
    let config = load_config(cli)?;
    let admin = config.catalog.admin();

    println!("{} {}", "Config:".green(), config.path.display());
    println!("  {} {}", "Trigger:".cyan(), admin.trigger);
    println!("  {} {}", "App name:".cyan(), admin.app_name);
    println!("  {} {}", "Log channel:".cyan(), admin.log_channel_id);
    println!("{} {}", "Tools:".green(), config.catalog.len());
    for tool in config.catalog.tools() {
        println!("  {} {}", tool.trigger.bold(), tool.name.dimmed());
        if !tool.parameters.is_empty() {
            let names: Vec<&str> = tool.parameters.iter().map(|p| p.name.as_str()).collect();
            println!("    parameters:  {}", names.join(", "));
        }
        println!("    permissions: {}", tool.permissions.join(", "));
    }
    Ok(0)
}

async fn handle_send_command(cli: &Cli, channel: &str, message: &str) -> Result<i32> {
    let config = load_config(cli)?;
    let token = config::bot_token(cli.slack_bot_token.as_deref())?;
    let chat = SlackClient::new(token, config.catalog.admin().app_name.clone())
        .context("Failed to create Slack client")?;
    chat.post_message(channel, message)
        .await
        .context(format!("Failed to send message to {}", channel))?;
    println!("{} {}", "Sent to".green(), channel);
    Ok(0)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging before anything else reports
    setup_logging(&cli.log_level, cli.log_format).context("Failed to setup logging")?;

    let code = run_application(&cli).await.context("Application failed")?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
