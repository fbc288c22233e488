//! Slack Web API client
//!
//! This module implements the ChatClient trait over Slack's HTTP methods.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::error::{ChatOpsError, Result};

use super::{ChatClient, ChatUser, Conversation, ConversationKind, unescape_newlines};

/// Slack Web API base URL
const SLACK_API_URL: &str = "https://slack.com/api";

/// Page size for conversation listings
const CONVERSATION_LIMIT: u32 = 1000;

/// Envelope shared by every Web API response
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct UserProfile {
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    name: String,
    profile: UserProfile,
}

/// Slack API client
pub struct SlackClient {
    client: Client,
    bot_token: String,
    app_name: String,
    base_url: String,
}

impl SlackClient {
    /// Create a client posting as `app_name`
    pub fn new(bot_token: impl Into<String>, app_name: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ChatOpsError::Chat(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            bot_token: bot_token.into(),
            app_name: app_name.into(),
            base_url: SLACK_API_URL.to_string(),
        })
    }

    /// Point the client at another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), method)
    }

    async fn post_json(&self, method: &str, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(self.url(method))
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatOpsError::Chat(format!("{} request failed: {}", method, e)))?;
        Self::unwrap_response(method, response).await
    }

    async fn get(&self, method: &str, query: &[(&str, String)]) -> Result<Value> {
        let response = self
            .client
            .get(self.url(method))
            .bearer_auth(&self.bot_token)
            .query(query)
            .send()
            .await
            .map_err(|e| ChatOpsError::Chat(format!("{} request failed: {}", method, e)))?;
        Self::unwrap_response(method, response).await
    }

    async fn unwrap_response(method: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            return Err(ChatOpsError::Chat(format!("{} returned HTTP {}", method, status)));
        }
        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| ChatOpsError::Chat(format!("{} body parse failed: {}", method, e)))?;
        check_ok(method, parsed)
    }

    fn message_body(&self, channel: &str, text: &str) -> Value {
        json!({
            "channel": channel,
            "text": unescape_newlines(text),
            "username": self.app_name,
            "unfurl_links": true,
            "unfurl_media": true,
        })
    }
}

fn check_ok(method: &str, parsed: ApiResponse) -> Result<Value> {
    if parsed.ok {
        Ok(Value::Object(parsed.body))
    } else {
        Err(ChatOpsError::Chat(format!(
            "{} failed: {}",
            method,
            parsed.error.unwrap_or_else(|| "unknown_error".to_string())
        )))
    }
}

/// Query for `files.getUploadURLExternal`
fn upload_url_query(file_name: &str, length: usize) -> Vec<(&'static str, String)> {
    vec![("filename", file_name.to_string()), ("length", length.to_string())]
}

/// `upload_url` and `file_id` from `files.getUploadURLExternal`
fn parse_upload_ticket(body: &Value) -> Result<(String, String)> {
    match (body["upload_url"].as_str(), body["file_id"].as_str()) {
        (Some(url), Some(id)) => Ok((url.to_string(), id.to_string())),
        _ => Err(ChatOpsError::Chat(
            "files.getUploadURLExternal returned no upload_url/file_id".to_string(),
        )),
    }
}

/// Body for `files.completeUploadExternal`; one channel uses `channel_id`
fn complete_upload_body(file_id: &str, file_name: &str, channels: &[String]) -> Value {
    let mut body = json!({
        "files": [{ "id": file_id, "title": file_name }],
    });
    match channels {
        [channel] => body["channel_id"] = json!(channel),
        _ => body["channels"] = json!(channels.join(",")),
    }
    body
}

fn parse_user(body: Value) -> Result<ChatUser> {
    let payload: UserPayload = serde_json::from_value(body["user"].clone())?;
    Ok(ChatUser {
        id: payload.id,
        name: payload.name,
        email: payload.profile.email,
    })
}

fn parse_conversations(body: &Value) -> Vec<Conversation> {
    body["channels"]
        .as_array()
        .map(|channels| {
            channels
                .iter()
                .filter_map(|c| {
                    Some(Conversation::new(c["id"].as_str()?, c["name"].as_str().unwrap_or_default()))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl ChatClient for SlackClient {
    async fn post_message(&self, channel: &str, text: &str) -> Result<String> {
        let body = self
            .post_json("chat.postMessage", self.message_body(channel, text))
            .await?;
        let posted = body["channel"].as_str().unwrap_or(channel).to_string();
        log::info!("Sent slack message[Channel:{}]: {}", posted, text);
        Ok(posted)
    }

    async fn post_ephemeral(&self, channel: &str, user: &str, text: &str) -> Result<()> {
        let mut body = self.message_body(channel, text);
        body["user"] = json!(user);
        self.post_json("chat.postEphemeral", body).await?;
        log::info!("Sent ephemeral slack message[Channel:{}]: {}", channel, text);
        Ok(())
    }

    async fn upload_file(&self, channels: &[String], path: &Path) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "output.txt".to_string());

        let ticket = self
            .get(
                "files.getUploadURLExternal",
                &upload_url_query(&file_name, bytes.len()),
            )
            .await?;
        let (upload_url, file_id) = parse_upload_ticket(&ticket)?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str("text/plain")
            .map_err(|e| ChatOpsError::Chat(format!("file upload invalid mime: {}", e)))?;
        let response = self
            .client
            .post(&upload_url)
            .bearer_auth(&self.bot_token)
            .multipart(reqwest::multipart::Form::new().part("file", part))
            .send()
            .await
            .map_err(|e| ChatOpsError::Chat(format!("file upload request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(ChatOpsError::Chat(format!(
                "file upload returned HTTP {}",
                response.status()
            )));
        }

        self.post_json(
            "files.completeUploadExternal",
            complete_upload_body(&file_id, &file_name, channels),
        )
        .await?;
        log::info!("Uploaded {} to {}", file_name, channels.join(","));
        Ok(())
    }

    async fn user_info(&self, user: &str) -> Result<ChatUser> {
        let body = self.get("users.info", &[("user", user.to_string())]).await?;
        parse_user(body)
    }

    async fn list_conversations(&self, kind: ConversationKind) -> Result<Vec<Conversation>> {
        let body = self
            .get(
                "conversations.list",
                &[
                    ("limit", CONVERSATION_LIMIT.to_string()),
                    ("types", kind.as_str().to_string()),
                ],
            )
            .await?;
        Ok(parse_conversations(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SlackClient {
        SlackClient::new("xoxb-test", "Bot").unwrap()
    }

    #[test]
    fn test_url_join() {
        let slack = client().with_base_url("http://localhost:9999/api/");
        assert_eq!(slack.url("chat.postMessage"), "http://localhost:9999/api/chat.postMessage");
        assert_eq!(client().url("users.info"), "https://slack.com/api/users.info");
    }

    #[test]
    fn test_message_body() {
        let body = client().message_body("C1", "a\\nb");
        assert_eq!(body["channel"], "C1");
        assert_eq!(body["text"], "a\nb");
        assert_eq!(body["username"], "Bot");
        assert_eq!(body["unfurl_links"], true);
    }

    #[test]
    fn test_check_ok_error() {
        let parsed: ApiResponse =
            serde_json::from_value(json!({"ok": false, "error": "channel_not_found"})).unwrap();
        let err = check_ok("chat.postMessage", parsed).unwrap_err();
        assert!(err.to_string().contains("channel_not_found"));
    }

    #[test]
    fn test_parse_user() {
        let parsed: ApiResponse = serde_json::from_value(json!({
            "ok": true,
            "user": {"id": "U1", "name": "alice", "profile": {"email": "alice@example.com"}}
        }))
        .unwrap();
        let user = parse_user(check_ok("users.info", parsed).unwrap()).unwrap();
        assert_eq!(user.name, "alice");
        assert_eq!(user.email, "alice@example.com");
    }

    #[test]
    fn test_parse_conversations() {
        let body = json!({
            "channels": [
                {"id": "C1", "name": "ops"},
                {"id": "C2", "name": "releases"},
                {"name": "no-id"}
            ]
        });
        let conversations = parse_conversations(&body);
        assert_eq!(
            conversations,
            vec![Conversation::new("C1", "ops"), Conversation::new("C2", "releases")]
        );
    }

    #[test]
    fn test_upload_url_query() {
        assert_eq!(
            upload_url_query("1700.txt", 3501),
            vec![
                ("filename", "1700.txt".to_string()),
                ("length", "3501".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_upload_ticket() {
        let body = json!({"upload_url": "https://files.slack.com/upload/v1/abc", "file_id": "F123"});
        assert_eq!(
            parse_upload_ticket(&body).unwrap(),
            ("https://files.slack.com/upload/v1/abc".to_string(), "F123".to_string())
        );
        assert!(parse_upload_ticket(&json!({"file_id": "F123"})).is_err());
    }

    #[test]
    fn test_complete_upload_body_single_channel() {
        let body = complete_upload_body("F123", "1700.txt", &["C123".to_string()]);
        assert_eq!(
            body,
            json!({"files": [{"id": "F123", "title": "1700.txt"}], "channel_id": "C123"})
        );
    }

    #[test]
    fn test_complete_upload_body_many_channels() {
        let body = complete_upload_body("F1", "log.txt", &["C1".to_string(), "C2".to_string()]);
        assert_eq!(body["channels"], "C1,C2");
        assert!(body.get("channel_id").is_none());
    }
}
