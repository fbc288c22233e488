//! Channel authorization

use crate::chat::{ChatClient, ConversationKind};
use crate::tools::ToolDefinition;

/// Permission entry granting every channel
pub const ALL_CHANNELS: &str = "all";

/// Whether `channel` may run `tool`. The private admin channel may run anything.
pub fn is_authorized(tool: &ToolDefinition, channel: &str, private_channel_id: &str) -> bool {
    if !private_channel_id.is_empty() && channel == private_channel_id {
        return true;
    }
    tool.permissions
        .iter()
        .any(|permission| permission == channel || permission == ALL_CHANNELS)
}

/// Display names for channel ids, private channels first; `["all"]` when none resolve
pub async fn channel_names(chat: &dyn ChatClient, ids: &[String]) -> Vec<String> {
    let mut names = Vec::new();
    for kind in [ConversationKind::Private, ConversationKind::Public] {
        match chat.list_conversations(kind).await {
            Ok(conversations) => {
                log::debug!(
                    "Number of {} channels visible: {}",
                    kind.as_str(),
                    conversations.len()
                );
                names.extend(
                    conversations
                        .into_iter()
                        .filter(|c| ids.iter().any(|id| *id == c.id))
                        .map(|c| c.name),
                );
            }
            Err(e) => log::error!("failed to list {} conversations: {}", kind.as_str(), e),
        }
    }
    if names.is_empty() {
        vec![ALL_CHANNELS.to_string()]
    } else {
        names
    }
}
