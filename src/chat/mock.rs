//! In-memory chat client that records everything sent through it

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ChatOpsError, Result};

use super::{ChatClient, ChatUser, Conversation, ConversationKind, unescape_newlines};

/// One outbound call observed by the recorder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Message {
        channel: String,
        text: String,
    },
    Ephemeral {
        channel: String,
        user: String,
        text: String,
    },
    Upload {
        channels: Vec<String>,
        file_name: String,
        contents: String,
    },
}

/// Chat client double with configurable users and channels
#[derive(Debug, Default)]
pub struct RecordingChatClient {
    users: HashMap<String, ChatUser>,
    conversations: HashMap<ConversationKind, Vec<Conversation>>,
    sent: Mutex<Vec<Sent>>,
}

impl RecordingChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, id: &str, name: &str, email: &str) -> Self {
        self.users.insert(
            id.to_string(),
            ChatUser {
                id: id.to_string(),
                name: name.to_string(),
                email: email.to_string(),
            },
        );
        self
    }

    pub fn with_channel(mut self, kind: ConversationKind, id: &str, name: &str) -> Self {
        self.conversations
            .entry(kind)
            .or_default()
            .push(Conversation::new(id, name));
        self
    }

    /// Everything sent so far, in order
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Texts posted to `channel`, in order
    pub fn messages_to(&self, channel: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Message { channel: c, text } if c == channel => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Uploads that included `channel`
    pub fn uploads_to(&self, channel: &str) -> Vec<(String, String)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Upload {
                    channels,
                    file_name,
                    contents,
                } if channels.iter().any(|c| c == channel) => Some((file_name, contents)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, entry: Sent) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(entry);
        }
    }
}

#[async_trait]
impl ChatClient for RecordingChatClient {
    async fn post_message(&self, channel: &str, text: &str) -> Result<String> {
        self.record(Sent::Message {
            channel: channel.to_string(),
            text: unescape_newlines(text),
        });
        Ok(channel.to_string())
    }

    async fn post_ephemeral(&self, channel: &str, user: &str, text: &str) -> Result<()> {
        self.record(Sent::Ephemeral {
            channel: channel.to_string(),
            user: user.to_string(),
            text: unescape_newlines(text),
        });
        Ok(())
    }

    async fn upload_file(&self, channels: &[String], path: &Path) -> Result<()> {
        let contents = tokio::fs::read_to_string(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.record(Sent::Upload {
            channels: channels.to_vec(),
            file_name,
            contents,
        });
        Ok(())
    }

    async fn user_info(&self, user: &str) -> Result<ChatUser> {
        self.users
            .get(user)
            .cloned()
            .ok_or_else(|| ChatOpsError::Chat("user_not_found".to_string()))
    }

    async fn list_conversations(&self, kind: ConversationKind) -> Result<Vec<Conversation>> {
        Ok(self.conversations.get(&kind).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_messages() {
        let chat = RecordingChatClient::new();
        chat.post_message("C1", "line1\\nline2").await.unwrap();
        chat.post_ephemeral("C1", "U1", "secret").await.unwrap();
        assert_eq!(chat.messages_to("C1"), vec!["line1\nline2"]);
        assert_eq!(chat.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_user_lookup() {
        let chat = RecordingChatClient::new().with_user("U1", "alice", "alice@example.com");
        assert_eq!(chat.user_info("U1").await.unwrap().email, "alice@example.com");
        assert!(chat.user_info("U2").await.is_err());
    }

    #[tokio::test]
    async fn test_upload_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("123.txt");
        std::fs::write(&path, "output").unwrap();
        let chat = RecordingChatClient::new();
        chat.upload_file(&["C1".to_string()], &path).await.unwrap();
        assert_eq!(
            chat.uploads_to("C1"),
            vec![("123.txt".to_string(), "output".to_string())]
        );
    }
}
