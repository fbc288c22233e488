//! Chat platform layer
//!
//! This module provides:
//! - ChatClient trait for the messaging operations the dispatcher needs
//! - SlackClient implementation over the Slack Web API
//! - Socket Mode listener turning message events into invocations
//! - RecordingChatClient for tests

pub mod mock;
pub mod slack;
pub mod socket;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use mock::{RecordingChatClient, Sent};
pub use slack::SlackClient;
pub use socket::{SocketModeListener, serve};

/// A chat user as resolved by the platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A channel the bot can see
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub name: String,
}

impl Conversation {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Conversation listing filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationKind {
    Private,
    Public,
}

impl ConversationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private_channel",
            Self::Public => "public_channel",
        }
    }
}

/// Messaging operations consumed by the dispatcher
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Post to a channel; returns the channel the message landed in
    async fn post_message(&self, channel: &str, text: &str) -> Result<String>;

    /// Post a message only `user` can see
    async fn post_ephemeral(&self, channel: &str, user: &str, text: &str) -> Result<()>;

    /// Upload a local file to the given channels
    async fn upload_file(&self, channels: &[String], path: &Path) -> Result<()>;

    async fn user_info(&self, user: &str) -> Result<ChatUser>;

    async fn list_conversations(&self, kind: ConversationKind) -> Result<Vec<Conversation>>;
}

/// Outbound text with literal `\n` sequences turned into newlines
pub fn unescape_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
}
