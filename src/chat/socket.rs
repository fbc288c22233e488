//! Socket Mode listener - Slack's websocket event stream
//!
//! Provides:
//! - Connection URL negotiation via `apps.connections.open`
//! - Envelope parsing and acknowledgement
//! - The serve loop feeding message events to the dispatcher one at a time

use std::time::Duration;

use futures::{Sink, SinkExt, StreamExt};
use reqwest::Client;
use serde_json::{Value, json};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::dispatch::{Dispatcher, Invocation, Outcome};
use crate::error::{ChatOpsError, Result};

/// Slack Web API base URL
const SLACK_API_URL: &str = "https://slack.com/api";

/// Pause before reconnecting after the socket drops
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// One frame received over the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    Hello,
    /// Slack is about to close the connection
    Disconnect { reason: String },
    /// A user message worth dispatching
    Message {
        envelope_id: String,
        invocation: Invocation,
    },
    /// Anything else; acknowledged when it carries an id
    Other { envelope_id: Option<String> },
}

impl Envelope {
    pub fn envelope_id(&self) -> Option<&str> {
        match self {
            Self::Message { envelope_id, .. } => Some(envelope_id),
            Self::Other { envelope_id } => envelope_id.as_deref(),
            Self::Hello | Self::Disconnect { .. } => None,
        }
    }
}

/// Parse a Socket Mode frame; bot messages and text-less events are not dispatched
pub fn parse_envelope(frame: &str) -> Result<Envelope> {
    let value: Value = serde_json::from_str(frame)?;
    let envelope_id = value["envelope_id"].as_str().map(ToOwned::to_owned);

    match value["type"].as_str().unwrap_or_default() {
        "hello" => Ok(Envelope::Hello),
        "disconnect" => Ok(Envelope::Disconnect {
            reason: value["reason"].as_str().unwrap_or("unknown").to_string(),
        }),
        "events_api" => {
            let event = &value["payload"]["event"];
            let is_message = event["type"].as_str() == Some("message");
            let is_bot = event["subtype"].as_str() == Some("bot_message") || event.get("bot_id").is_some();
            match (is_message && !is_bot, envelope_id.clone(), event["text"].as_str()) {
                (true, Some(envelope_id), Some(text)) => Ok(Envelope::Message {
                    envelope_id,
                    invocation: Invocation {
                        text: text.to_string(),
                        channel: event["channel"].as_str().unwrap_or_default().to_string(),
                        user: event["user"].as_str().unwrap_or_default().to_string(),
                        timestamp: event["ts"].as_str().unwrap_or_default().to_string(),
                    },
                }),
                _ => Ok(Envelope::Other { envelope_id }),
            }
        }
        _ => Ok(Envelope::Other { envelope_id }),
    }
}

/// Acknowledgement frame for an envelope
pub fn ack_frame(envelope_id: &str) -> String {
    json!({ "envelope_id": envelope_id }).to_string()
}

/// Send a control frame, logging a failure; returns whether it was sent
async fn send_control<S>(sink: &mut S, frame: Message, kind: &str) -> bool
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    match sink.send(frame).await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("failed to send {} frame: {}", kind, e);
            false
        }
    }
}

/// Socket Mode connection factory
pub struct SocketModeListener {
    client: Client,
    app_token: String,
    base_url: String,
}

impl SocketModeListener {
    pub fn new(app_token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ChatOpsError::Gateway(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            app_token: app_token.into(),
            base_url: SLACK_API_URL.to_string(),
        })
    }

    /// Ask Slack for a fresh websocket URL
    pub async fn open_connection(&self) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/apps.connections.open", self.base_url))
            .bearer_auth(&self.app_token)
            .send()
            .await
            .map_err(|e| ChatOpsError::Gateway(format!("apps.connections.open failed: {}", e)))?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| ChatOpsError::Gateway(format!("apps.connections.open body: {}", e)))?;
        if body["ok"].as_bool() != Some(true) {
            return Err(ChatOpsError::Gateway(format!(
                "apps.connections.open rejected: {}",
                body["error"].as_str().unwrap_or("unknown_error")
            )));
        }
        body["url"]
            .as_str()
            .map(ToOwned::to_owned)
            .ok_or_else(|| ChatOpsError::Gateway("apps.connections.open returned no url".to_string()))
    }

    /// Run one websocket session. Returns `Some(code)` when an exit was
    /// requested, `None` when the socket closed and should be reopened.
    async fn session(&self, dispatcher: &Dispatcher) -> Result<Option<i32>> {
        let url = self.open_connection().await?;
        let (ws, _) = connect_async(url.as_str())
            .await
            .map_err(|e| ChatOpsError::Gateway(format!("websocket connect failed: {}", e)))?;
        let (mut write, mut read) = ws.split();

        while let Some(frame) = read.next().await {
            let frame = frame.map_err(|e| ChatOpsError::Gateway(format!("websocket read failed: {}", e)))?;
            let text = match frame {
                Message::Text(text) => text,
                Message::Ping(payload) => {
                    send_control(&mut write, Message::Pong(payload), "pong").await;
                    continue;
                }
                Message::Close(_) => break,
                Message::Binary(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };

            let envelope = match parse_envelope(&text) {
                Ok(envelope) => envelope,
                Err(e) => {
                    log::error!("Bad message received: {}", e);
                    continue;
                }
            };
            if let Some(id) = envelope.envelope_id() {
                if let Err(e) = write.send(Message::Text(ack_frame(id))).await {
                    log::error!("failed to acknowledge envelope {}: {}", id, e);
                }
            }

            match envelope {
                Envelope::Hello => {
                    log::info!(
                        "chatops is now connected to slack. Primary trigger: `{}`",
                        dispatcher.catalog().admin().trigger
                    );
                }
                Envelope::Disconnect { reason } => {
                    tracing::info!(reason = %reason, "Socket Mode disconnect requested");
                    break;
                }
                Envelope::Message { invocation, .. } => {
                    if let Outcome::Exit(code) = dispatcher.dispatch(&invocation).await {
                        send_control(&mut write, Message::Close(None), "close").await;
                        return Ok(Some(code));
                    }
                }
                Envelope::Other { .. } => {}
            }
        }
        Ok(None)
    }
}

/// Serve events until an exit is requested; returns the process exit code
pub async fn serve(listener: &SocketModeListener, dispatcher: &Dispatcher) -> Result<i32> {
    loop {
        match listener.session(dispatcher).await {
            Ok(Some(code)) => return Ok(code),
            Ok(None) => log::info!("Socket Mode connection closed, reconnecting"),
            Err(e) => log::error!("Slack socket connection error: {}", e),
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}
