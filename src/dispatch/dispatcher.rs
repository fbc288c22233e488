//! Dispatcher - drives one chat message through the command pipeline
//!
//! Stages run in order and any gate can reject the invocation with exactly
//! one diagnostic template:
//!
//! ```text
//! Idle -> TriggerMatched -> ToolResolved -> EnvChecked -> DepsChecked
//!      -> Authorized -> ParamsValidated -> Built -> Executed -> Responded
//! ```
//!
//! Chat and filesystem failures while responding are logged and swallowed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::chat::ChatClient;
use crate::error::{ChatOpsError, DispatchError, Result};
use crate::exec::{CommandRunner, HostEnvironment, SystemHost, is_failure};
use crate::tools::{ToolCatalog, ToolDefinition};

use super::auth::{channel_names, is_authorized};
use super::builder::{BuiltCommand, RUNTIME_ENV_VARS, RuntimeContext, build};
use super::params::{bind, resolve};
use super::parse::{Invocation, Route, TriggerMatcher, route};
use super::response::{Delivery, audit_line, file_path, help_block, log_file_name, plan, transcript};

/// Word that turns any tool invocation into a help request
const HELP_WORD: &str = "help";

/// Pipeline position of an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    TriggerMatched,
    ToolResolved,
    EnvChecked,
    DepsChecked,
    Authorized,
    ParamsValidated,
    Built,
    Executed,
    Responded,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::TriggerMatched => "trigger_matched",
            Self::ToolResolved => "tool_resolved",
            Self::EnvChecked => "env_checked",
            Self::DepsChecked => "deps_checked",
            Self::Authorized => "authorized",
            Self::ParamsValidated => "params_validated",
            Self::Built => "built",
            Self::Executed => "executed",
            Self::Responded => "responded",
        }
    }
}

/// What happened to an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not addressed to the bot
    Ignored,
    /// Tool word not in the catalog
    NotFound(String),
    /// Help block sent
    Help,
    /// Stopped at a gate; `stage` is the last stage reached
    Rejected { stage: Stage, error: DispatchError },
    /// Command ran and its output was delivered
    Responded {
        delivery: &'static str,
        failure: Option<DispatchError>,
    },
    /// Operator asked the process to stop with this code
    Exit(i32),
}

/// Routes chat messages to catalog tools
pub struct Dispatcher {
    catalog: Arc<ToolCatalog>,
    chat: Arc<dyn ChatClient>,
    runner: Arc<dyn CommandRunner>,
    host: Arc<dyn HostEnvironment>,
    matcher: TriggerMatcher,
    transcript_dir: PathBuf,
}

impl Dispatcher {
    /// Create a dispatcher probing the real host
    pub fn new(
        catalog: Arc<ToolCatalog>,
        chat: Arc<dyn ChatClient>,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self> {
        let matcher = TriggerMatcher::new(&catalog.admin().trigger)
            .map_err(|e| ChatOpsError::Config(format!("invalid trigger: {}", e)))?;
        Ok(Self {
            catalog,
            chat,
            runner,
            host: Arc::new(SystemHost),
            matcher,
            transcript_dir: PathBuf::from("."),
        })
    }

    pub fn with_host(mut self, host: Arc<dyn HostEnvironment>) -> Self {
        self.host = host;
        self
    }

    /// Directory transcript files are written to before upload
    pub fn with_transcript_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.transcript_dir = dir.into();
        self
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Handle one message
    pub async fn dispatch(&self, invocation: &Invocation) -> Outcome {
        let Some(line) = self.matcher.parse(&invocation.text) else {
            return Outcome::Ignored;
        };
        self.advance(Stage::TriggerMatched, invocation);
        log::info!("Timestamp: {}", invocation.timestamp);

        match route(&self.catalog, &line) {
            Route::Tool(tool) => {
                self.advance(Stage::ToolResolved, invocation);
                self.send_template(&invocation.channel, "processing_command", "")
                    .await;
                self.run_tool(tool, &line.args, invocation).await
            }
            Route::Exit(request) => {
                self.post(&invocation.channel, request.message()).await;
                Outcome::Exit(request.code())
            }
            Route::Unrecognized(word) => {
                self.send_template(&invocation.channel, "command_not_found", "")
                    .await;
                Outcome::NotFound(word)
            }
        }
    }

    async fn run_tool(&self, tool: &ToolDefinition, args: &[String], invocation: &Invocation) -> Outcome {
        let channel = invocation.channel.as_str();

        if let Err(error) = self.check_env(tool) {
            return self.reject(Stage::ToolResolved, error, invocation).await;
        }
        self.advance(Stage::EnvChecked, invocation);

        if let Err(error) = self.check_dependencies(tool) {
            return self.reject(Stage::EnvChecked, error, invocation).await;
        }
        self.advance(Stage::DepsChecked, invocation);

        let user = match self.chat.user_info(&invocation.user).await {
            Ok(user) => user,
            Err(e) => {
                let error = DispatchError::UserLookupFailed {
                    user: invocation.user.clone(),
                    reason: e.to_string(),
                };
                return self.reject(Stage::DepsChecked, error, invocation).await;
            }
        };

        let allowed_channels = channel_names(self.chat.as_ref(), &tool.permissions).await;
        let help = help_block(tool, &allowed_channels);
        if args.iter().any(|arg| arg == HELP_WORD) {
            self.post(channel, &help).await;
            return Outcome::Help;
        }

        let admin = self.catalog.admin();
        let audit_text = format!("{} {}", tool.trigger, args.join(" "));
        if !is_authorized(tool, channel, &admin.private_channel_id) {
            let error = DispatchError::Unauthorized {
                tool: tool.trigger.clone(),
                channel: channel.to_string(),
                allowed: allowed_channels.join(", "),
            };
            let outcome = self.reject(Stage::DepsChecked, error, invocation).await;
            self.post(channel, &help).await;
            self.audit(&user.id, channel, &audit_text).await;
            return outcome;
        }
        self.advance(Stage::Authorized, invocation);

        let parameters = resolve(tool, self.runner.as_ref()).await;
        if tool.log {
            self.audit(&user.id, channel, &audit_text).await;
        }
        let bindings = match bind(&parameters, args) {
            Ok(bindings) => bindings,
            Err(error) => return self.reject(Stage::Authorized, error, invocation).await,
        };
        self.advance(Stage::ParamsValidated, invocation);

        let context = RuntimeContext {
            timestamp: invocation.timestamp.clone(),
            user_id: invocation.user.clone(),
            user_name: user.name.clone(),
            channel_id: channel.to_string(),
            channel_name: channel_names(self.chat.as_ref(), &[channel.to_string()])
                .await
                .join(""),
        };
        let command = build(&tool.command_line(), &user.email, &bindings, &tool.location, &context);
        self.advance(Stage::Built, invocation);
        log::info!("Triggered Command:\n{}", command.display());

        let output = self.runner.run(&command.argv()).await;
        self.advance(Stage::Executed, invocation);
        log::info!("Return length: {}", output.chars().count());

        let failure = is_failure(&output).then(|| {
            tracing::warn!(tool = %tool.trigger, channel = %channel, "command failed");
            DispatchError::ExecutionFailed {
                reason: output.lines().nth(2).unwrap_or_default().to_string(),
            }
        });

        let delivery = self.respond(tool, &user.email, &command, &output, invocation).await;
        self.advance(Stage::Responded, invocation);
        Outcome::Responded { delivery, failure }
    }

    fn check_env(&self, tool: &ToolDefinition) -> std::result::Result<(), DispatchError> {
        for var in &tool.envvars {
            if RUNTIME_ENV_VARS.contains(&var.as_str()) {
                continue;
            }
            if self.host.env_var(var).is_none() {
                return Err(DispatchError::MissingEnv { var: var.clone() });
            }
        }
        Ok(())
    }

    fn check_dependencies(&self, tool: &ToolDefinition) -> std::result::Result<(), DispatchError> {
        match tool.dependencies.iter().find(|dep| !self.host.has_executable(dep)) {
            Some(binary) => Err(DispatchError::MissingDependency {
                binary: binary.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn respond(
        &self,
        tool: &ToolDefinition,
        email: &str,
        command: &BuiltCommand,
        output: &str,
        invocation: &Invocation,
    ) -> &'static str {
        let channel = invocation.channel.as_str();
        let record = transcript(tool, email, &command.display(), output);
        let delivery = plan(tool, output, &record, &invocation.timestamp);
        let kind = delivery.kind();

        match delivery {
            Delivery::File { file_name, contents } => {
                self.upload(&[channel.to_string()], &file_name, &contents).await;
            }
            Delivery::Ephemeral { text } => {
                self.send_template(channel, "ephemeral", "").await;
                if let Err(e) = self.chat.post_ephemeral(channel, &invocation.user, &text).await {
                    log::error!("failed to send ephemeral message: {}", e);
                }
            }
            Delivery::Inline { text } => self.post(channel, &text).await,
        }

        if tool.log {
            let log_channel = self.catalog.admin().log_channel_id.clone();
            self.upload(&[log_channel], &log_file_name(&invocation.timestamp), &record)
                .await;
        }
        kind
    }

    /// Write `contents` under the transcript directory and upload it
    async fn upload(&self, channels: &[String], file_name: &str, contents: &str) {
        let path = file_path(&self.transcript_dir, file_name);
        log::info!("{}", path.display());
        if let Err(e) = write_file(&path, contents).await {
            log::error!("failed to write {}: {}", path.display(), e);
            return;
        }
        if let Err(e) = self.chat.upload_file(channels, &path).await {
            log::error!("Unexpected error uploading file: {}", e);
        }
    }

    async fn reject(&self, stage: Stage, error: DispatchError, invocation: &Invocation) -> Outcome {
        tracing::info!(
            stage = stage.as_str(),
            channel = %invocation.channel,
            user = %invocation.user,
            error = %error,
            "invocation rejected"
        );
        if let Some(template) = error.template() {
            self.send_template(&invocation.channel, template, error.passalong())
                .await;
        }
        Outcome::Rejected { stage, error }
    }

    /// Post the audit line to the log channel, except for the private channel
    async fn audit(&self, user_id: &str, channel: &str, text: &str) {
        let admin = self.catalog.admin();
        if channel == admin.private_channel_id {
            return;
        }
        let line = audit_line(&admin.app_name, user_id, channel, text);
        log::info!("{}", line);
        self.post(&admin.log_channel_id, &line).await;
    }

    async fn send_template(&self, channel: &str, name: &str, passalong: &str) {
        match self.catalog.render_message(name, passalong) {
            Some(text) => self.post(channel, &text).await,
            None => log::warn!("Message suppressed by configuration: {}", name),
        }
    }

    async fn post(&self, channel: &str, text: &str) {
        if let Err(e) = self.chat.post_message(channel, text).await {
            log::error!("failed to post to {}: {}", channel, e);
        }
    }

    fn advance(&self, stage: Stage, invocation: &Invocation) {
        tracing::debug!(
            stage = stage.as_str(),
            channel = %invocation.channel,
            user = %invocation.user,
            ts = %invocation.timestamp,
            "dispatch"
        );
    }
}

async fn write_file(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, contents).await
}
