// ABOUTME: Typed decoding of raw Slack payloads into one tagged union of inbound events
// ABOUTME: Messages, block actions and view submissions are validated once, at the boundary

use commonbot_core::ParseError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Lists may arrive as `null` when re-serialized from typed Slack events.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// An inbound Slack delivery this layer knows how to normalize.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Message(MessageEvent),
    Action(BlockActionsEvent),
    ViewSubmission(ViewSubmissionEvent),
}

impl InboundEvent {
    /// Decode a raw payload. Push callbacks (`event_callback` envelopes) are
    /// unwrapped. Returns `Ok(None)` for event types this layer ignores.
    pub fn decode(raw: &Value) -> Result<Option<Self>, ParseError> {
        let kind = raw.get("type").and_then(Value::as_str);

        match kind {
            Some("event_callback") | None if raw.get("event").is_some_and(Value::is_object) => {
                Self::decode(&raw["event"])
            }
            Some("message") | Some("app_mention") => {
                let event = MessageEvent::deserialize(raw).map_err(|source| ParseError::Payload {
                    kind: "message",
                    source,
                })?;
                Ok(Some(InboundEvent::Message(event)))
            }
            Some("block_actions") => {
                let event =
                    BlockActionsEvent::deserialize(raw).map_err(|source| ParseError::Payload {
                        kind: "block_actions",
                        source,
                    })?;
                Ok(Some(InboundEvent::Action(event)))
            }
            Some("view_submission") => {
                let event =
                    ViewSubmissionEvent::deserialize(raw).map_err(|source| ParseError::Payload {
                        kind: "view_submission",
                        source,
                    })?;
                Ok(Some(InboundEvent::ViewSubmission(event)))
            }
            _ => Ok(None),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Message(_) => "message",
            InboundEvent::Action(_) => "block_actions",
            InboundEvent::ViewSubmission(_) => "view_submission",
        }
    }
}

// =============================================================================
// Messages
// =============================================================================

/// A `message` or `app_mention` event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
}

/// Top-level message block. Only `rich_text` is inspected.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    RichText {
        #[serde(default, deserialize_with = "null_as_default")]
        elements: Vec<RichTextSection>,
    },
    #[serde(other)]
    Other,
}

/// A `rich_text_section` (or list/quote/preformatted) inside a `rich_text` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RichTextSection {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub elements: Vec<RichTextElement>,
}

/// Inline element of a rich text section.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RichTextElement {
    User {
        #[serde(default)]
        user_id: String,
    },
    Text {
        #[serde(default)]
        text: String,
    },
    Link {
        #[serde(default)]
        url: String,
    },
    #[serde(other)]
    Other,
}

// =============================================================================
// Interactive components
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdRef {
    #[serde(default)]
    pub id: String,
}

/// A `block_actions` interaction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockActionsEvent {
    #[serde(default)]
    pub user: Option<IdRef>,
    #[serde(default)]
    pub channel: Option<IdRef>,
    #[serde(default)]
    pub trigger_id: Option<String>,
    #[serde(default)]
    pub response_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub actions: Vec<ComponentAction>,
    /// Present when the action came from inside a modal.
    #[serde(default)]
    pub view: Option<ViewState>,
}

/// One component action inside a `block_actions` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentAction {
    #[serde(default)]
    pub action_id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub block_id: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub selected_option: Option<Value>,
}

/// A `view_submission` interaction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewSubmissionEvent {
    #[serde(default)]
    pub user: Option<IdRef>,
    #[serde(default)]
    pub trigger_id: Option<String>,
    #[serde(default)]
    pub view: ViewState,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub callback_id: Option<String>,
    #[serde(default)]
    pub private_metadata: Option<String>,
    #[serde(default)]
    pub state: Option<Value>,
}

fn id_of(r: &Option<IdRef>) -> Option<&str> {
    r.as_ref().map(|r| r.id.as_str()).filter(|id| !id.is_empty())
}

impl BlockActionsEvent {
    pub fn user_id(&self) -> Option<&str> {
        id_of(&self.user)
    }

    pub fn channel_id(&self) -> Option<&str> {
        id_of(&self.channel)
    }
}

impl ViewSubmissionEvent {
    pub fn user_id(&self) -> Option<&str> {
        id_of(&self.user)
    }
}
