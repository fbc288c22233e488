//! Catalog entry types
//!
//! These mirror the YAML configuration document one-to-one. Keys are camelCase
//! (`appName`, `privateChannelId`); every optional key defaults.

use serde::{Deserialize, Serialize};

/// How a tool's output is shaped for delivery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Upload a verbose transcript as a file
    File,
    /// Wrap inline output in a fixed-width block
    Code,
    /// Plain text; also what any unrecognized value means
    #[default]
    #[serde(other)]
    Text,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Code => "code",
            Self::Text => "text",
        }
    }
}

/// One positional argument of a tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParameterSpec {
    /// Substitution key, referenced as `${name}` in the command
    pub name: String,
    pub description: String,
    /// Literal values accepted for this position
    pub allowed: Vec<String>,
    /// Command whose output lines extend `allowed` on every invocation
    pub source: Vec<String>,
    /// Regex searched in the remaining argument text
    #[serde(rename = "match")]
    pub pattern: Option<String>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_allowed<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_source(mut self, command: impl Into<String>) -> Self {
        self.source = vec![command.into()];
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Whether this parameter swallows every remaining argument
    pub fn is_match(&self) -> bool {
        self.pattern.as_deref().is_some_and(|p| !p.is_empty())
    }

    pub fn has_source(&self) -> bool {
        !self.source.is_empty()
    }
}

/// A catalogued shell tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub help: String,
    /// Word after the global prefix that selects this tool
    pub trigger: String,
    /// Working directory for both the command and parameter sources
    pub location: String,
    /// Command tokens, joined with single spaces before substitution
    pub command: Vec<String>,
    /// Channel ids allowed to run the tool, or `all`
    pub permissions: Vec<String>,
    pub log: bool,
    pub ephemeral: bool,
    pub response: ResponseMode,
    pub parameters: Vec<ParameterSpec>,
    pub envvars: Vec<String>,
    pub dependencies: Vec<String>,
}

impl Default for ToolDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            help: String::new(),
            trigger: String::new(),
            location: ".".to_string(),
            command: Vec::new(),
            permissions: Vec::new(),
            log: false,
            ephemeral: false,
            response: ResponseMode::Text,
            parameters: Vec::new(),
            envvars: Vec::new(),
            dependencies: Vec::new(),
        }
    }
}

impl ToolDefinition {
    pub fn new(trigger: impl Into<String>, command: impl Into<String>) -> Self {
        let trigger = trigger.into();
        Self {
            name: trigger.clone(),
            trigger,
            command: vec![command.into()],
            ..Default::default()
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_permissions<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = channels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_response(mut self, response: ResponseMode) -> Self {
        self.response = response;
        self
    }

    pub fn with_ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn with_log(mut self) -> Self {
        self.log = true;
        self
    }

    /// The command template as one string
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

/// A named chat message, optionally disabled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MessageTemplate {
    pub name: String,
    pub text: String,
    pub active: bool,
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self {
            name: String::new(),
            text: String::new(),
            active: true,
        }
    }
}

impl MessageTemplate {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Fill the `%s` placeholder; an empty passalong leaves the text as is
    pub fn render(&self, passalong: &str) -> String {
        if passalong.is_empty() {
            return self.text.clone();
        }
        if self.text.contains("%s") {
            self.text.replacen("%s", passalong, 1)
        } else {
            format!("{} {}", self.text, passalong)
        }
    }
}

/// Bot identity and the channels it treats specially
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdminConfig {
    /// Global command prefix, e.g. `!bot`
    pub trigger: String,
    pub app_name: String,
    /// Always authorized, never audited
    pub private_channel_id: String,
    /// Receives audit lines and transcripts
    pub log_channel_id: String,
}

/// A vendored dependency installed by `install-vendor-dependencies`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DependencyInstall {
    pub name: String,
    pub install: Vec<String>,
}

impl DependencyInstall {
    /// Install command tokens re-split on whitespace and joined
    pub fn install_line(&self) -> String {
        self.install
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}
