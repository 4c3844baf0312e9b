// ABOUTME: Translates canonical outbound messages into Platform Client send calls
// ABOUTME: Sends a batch in order; one failed message is logged and never blocks the rest

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::context::ChatContextData;
use crate::error::TransportError;
use crate::traits::PlatformClient;

/// Text used when a message of an unrecognized kind carries none.
pub const DEFAULT_MESSAGE_TEXT: &str = "New message from Common bot";

/// Kind of an outbound message; decides which platform call delivers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    ViewOpen,
    ViewUpdate,
    PlainText,
    /// Any other kind; its payload is posted as a message body.
    Other(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::ViewOpen => "VIEW_OPEN",
            MessageKind::ViewUpdate => "VIEW_UPDATE",
            MessageKind::PlainText => "PLAIN_TEXT",
            MessageKind::Other(kind) => kind,
        }
    }
}

impl From<&str> for MessageKind {
    fn from(kind: &str) -> Self {
        match kind {
            "VIEW_OPEN" => MessageKind::ViewOpen,
            "VIEW_UPDATE" => MessageKind::ViewUpdate,
            "PLAIN_TEXT" => MessageKind::PlainText,
            other => MessageKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub kind: MessageKind,
    pub payload: Value,
}

impl OutboundMessage {
    pub fn new(kind: impl Into<MessageKind>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    pub fn plain_text(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::PlainText,
            payload: json!({ "text": text.into() }),
        }
    }

    /// Open a modal. `trigger_id` may be omitted when the context carries one.
    pub fn view_open(view: Value) -> Self {
        Self {
            kind: MessageKind::ViewOpen,
            payload: json!({ "view": view }),
        }
    }

    pub fn view_update(view_id: impl Into<String>, view: Value) -> Self {
        Self {
            kind: MessageKind::ViewUpdate,
            payload: json!({ "view_id": view_id.into(), "view": view }),
        }
    }
}

/// Counters from one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendReport {
    pub sent: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct OutboundSender {
    client: Arc<dyn PlatformClient>,
}

impl OutboundSender {
    pub fn new(client: Arc<dyn PlatformClient>) -> Self {
        Self { client }
    }

    /// Send `messages` in input order on behalf of `ctx`.
    pub async fn send(&self, ctx: &ChatContextData, messages: Vec<OutboundMessage>) -> SendReport {
        let mut report = SendReport::default();

        for (index, message) in messages.into_iter().enumerate() {
            let kind = message.kind.as_str().to_string();
            match self.send_one(ctx, message).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        index,
                        kind = %kind,
                        channel_id = %ctx.channel_id(),
                        error = %e,
                        "Failed to send outbound message, continuing with batch"
                    );
                }
            }
        }

        report
    }

    async fn send_one(&self, ctx: &ChatContextData, message: OutboundMessage) -> Result<(), TransportError> {
        match message.kind {
            MessageKind::ViewOpen => {
                let mut payload = into_object(message.payload);
                if !payload.contains_key("trigger_id") {
                    if let Some(trigger_id) = ctx.platform_str("triggerId") {
                        payload.insert("trigger_id".to_string(), json!(trigger_id));
                    }
                }
                self.client
                    .open_view(Value::Object(payload))
                    .await
                    .map_err(|e| TransportError::new("open_view", ctx.channel_id(), e))
            }
            MessageKind::ViewUpdate => self
                .client
                .update_view(message.payload)
                .await
                .map_err(|e| TransportError::new("update_view", ctx.channel_id(), e)),
            MessageKind::PlainText => {
                let text = message
                    .payload
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                self.client
                    .post_message(json!({ "channel": ctx.channel_id(), "text": text }))
                    .await
                    .map_err(|e| TransportError::new("post_message", ctx.channel_id(), e))
            }
            MessageKind::Other(_) => {
                let mut payload = into_object(message.payload);
                if payload.get("text").map_or(true, Value::is_null) {
                    payload.insert("text".to_string(), json!(DEFAULT_MESSAGE_TEXT));
                }
                if !payload.contains_key("channel") {
                    payload.insert("channel".to_string(), json!(ctx.channel_id()));
                }
                self.client
                    .post_message(Value::Object(payload))
                    .await
                    .map_err(|e| TransportError::new("post_message", ctx.channel_id(), e))
            }
        }
    }
}

/// Non-object payloads are wrapped as `{"value": ...}` so fields can be added.
fn into_object(payload: Value) -> Map<String, Value> {
    match payload {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}
