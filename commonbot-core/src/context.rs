// ABOUTME: Canonical chat context envelope handed to bot business logic
// ABOUTME: Users, channels, chatting types, action taxonomy and the ContextBuilder

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Identity
// =============================================================================

/// A resolved platform user. Immutable once cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub email: String,
}

/// Classification of a conversation surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChattingType {
    PublicChannel,
    PrivateChannel,
    Personal,
    Group,
    #[default]
    Unknown,
}

/// Conversation kind flags as reported by the platform's channel lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelKindFlags {
    #[serde(default)]
    pub is_channel: bool,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub is_im: bool,
    #[serde(default)]
    pub is_mpim: bool,
}

impl ChattingType {
    /// Derive the chatting type from kind flags. First match wins:
    /// public channel, private channel, personal, group, unknown.
    pub fn from_flags(flags: &ChannelKindFlags) -> Self {
        if flags.is_channel && !flags.is_mpim {
            ChattingType::PublicChannel
        } else if flags.is_group {
            ChattingType::PrivateChannel
        } else if flags.is_im {
            ChattingType::Personal
        } else if flags.is_mpim {
            ChattingType::Group
        } else {
            ChattingType::Unknown
        }
    }
}

/// A resolved conversation. The chatting type is derived once, when cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub chatting_type: ChattingType,
}

// =============================================================================
// Action taxonomy
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    ButtonClick,
    DropdownSelect,
    DialogOpen,
    DialogSubmit,
    #[default]
    Unsupported,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub token: String,
}

/// A classified interactive event, addressed to one plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub plugin_id: String,
    pub action: Action,
}

// =============================================================================
// Envelope
// =============================================================================

/// The normalized inbound unit: message text or a classified event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Payload {
    Message(String),
    Event(Event),
}

/// The bot this context was produced for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotRef {
    pub id: String,
    pub name: String,
}

impl BotRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// The `@Name` form used when addressing the bot in normalized text.
    pub fn mention(&self) -> String {
        format!("@{}", self.name)
    }

    /// True when `text` contains the mention as a whole token: not followed
    /// by a letter, digit or `_`, so `@Bot` does not match `@Bothy`.
    pub fn is_mentioned_in(&self, text: &str) -> bool {
        if self.name.is_empty() {
            return false;
        }
        let mention = self.mention();
        text.match_indices(&mention).any(|(start, _)| {
            text[start + mention.len()..]
                .chars()
                .next()
                .map_or(true, |next| !(next.is_alphanumeric() || next == '_'))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chatting {
    pub bot: BotRef,
    #[serde(rename = "type")]
    pub chatting_type: ChattingType,
    pub user: User,
    pub channel: Channel,
    /// Reserved; always empty.
    pub team: String,
    /// Reserved; always empty.
    pub tenant: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextInfo {
    pub chatting: Chatting,
    /// Opaque platform data for the handler that ends up processing this context.
    pub platform: Value,
}

/// Canonical context passed uniformly to listeners and routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatContextData {
    pub payload: Payload,
    pub context: ContextInfo,
}

impl ChatContextData {
    pub fn message_text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Message(text) => Some(text),
            Payload::Event(_) => None,
        }
    }

    pub fn event(&self) -> Option<&Event> {
        match &self.payload {
            Payload::Event(event) => Some(event),
            Payload::Message(_) => None,
        }
    }

    pub fn chatting_type(&self) -> ChattingType {
        self.context.chatting.chatting_type
    }

    pub fn channel_id(&self) -> &str {
        &self.context.chatting.channel.id
    }

    pub fn user_id(&self) -> &str {
        &self.context.chatting.user.id
    }

    pub fn bot(&self) -> &BotRef {
        &self.context.chatting.bot
    }

    /// Look up a string field in the platform passthrough.
    pub fn platform_str(&self, key: &str) -> Option<&str> {
        self.context.platform.get(key).and_then(Value::as_str)
    }
}

/// Assembles `ChatContextData`. Pure; no I/O.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    bot: BotRef,
}

impl ContextBuilder {
    pub fn new(bot: BotRef) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> &BotRef {
        &self.bot
    }

    pub fn build(
        &self,
        payload: Payload,
        chatting_type: ChattingType,
        user: User,
        channel: Channel,
        platform: Value,
    ) -> ChatContextData {
        ChatContextData {
            payload,
            context: ContextInfo {
                chatting: Chatting {
                    bot: self.bot.clone(),
                    chatting_type,
                    user,
                    channel,
                    team: String::new(),
                    tenant: String::new(),
                },
                platform,
            },
        }
    }
}
