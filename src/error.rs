//! Error types for chatops
//!
//! `ChatOpsError` covers infrastructure failures (config, I/O, chat transport).
//! `DispatchError` is the closed set of reasons an invocation is rejected and
//! reported back to the channel.

use thiserror::Error;

/// Infrastructure errors raised outside the dispatch pipeline
#[derive(Debug, Error)]
pub enum ChatOpsError {
    /// Configuration could not be read or failed validation
    #[error("Config error: {0}")]
    Config(String),

    /// Chat platform request failed
    #[error("Chat error: {0}")]
    Chat(String),

    /// Socket Mode connection failed
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for chatops operations
pub type Result<T> = std::result::Result<T, ChatOpsError>;

/// Why an invocation was rejected before or during execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("missing environment variable '{var}'")]
    MissingEnv { var: String },

    #[error("missing application/software dependency '{binary}'")]
    MissingDependency { binary: String },

    #[error("channel {channel} is not allowed to run '{tool}' (allowed in: {allowed})")]
    Unauthorized {
        tool: String,
        channel: String,
        allowed: String,
    },

    #[error("invalid value for parameter '{name}'")]
    InvalidParameter { name: String },

    #[error("can't look up user {user}: {reason}")]
    UserLookupFailed { user: String, reason: String },

    #[error("execution failed: {reason}")]
    ExecutionFailed { reason: String },
}

impl DispatchError {
    /// Message template announcing this rejection, if the channel gets one
    pub fn template(&self) -> Option<&'static str> {
        match self {
            Self::MissingEnv { .. } => Some("missingenvvar"),
            Self::MissingDependency { .. } => Some("missingdependency"),
            Self::Unauthorized { .. } => Some("unauthorized"),
            Self::InvalidParameter { .. } => Some("invalid_parameter"),
            Self::UserLookupFailed { .. } => Some("user_lookup_failed"),
            Self::ExecutionFailed { .. } => None,
        }
    }

    /// String handed to the template's `%s` placeholder
    pub fn passalong(&self) -> &str {
        match self {
            Self::MissingEnv { var } => var,
            Self::MissingDependency { binary } => binary,
            Self::Unauthorized { allowed, .. } => allowed,
            Self::InvalidParameter { name } => name,
            Self::UserLookupFailed { user, .. } => user,
            Self::ExecutionFailed { reason } => reason,
        }
    }
}
