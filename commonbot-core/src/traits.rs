// ABOUTME: The Platform Client seam consumed by the identity cache and outbound sender
// ABOUTME: Production code talks to Slack through it; tests substitute recording doubles

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ChannelKindFlags;

/// Profile data returned by a user lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub email: String,
}

/// Metadata returned by a channel lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub name: String,
    pub flags: ChannelKindFlags,
}

/// Calls this layer makes against the chat platform.
///
/// Implementations must be cheap to share across tasks; every inbound event
/// holds an `Arc` to the same client.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn fetch_user_profile(&self, user_id: &str) -> Result<UserProfile>;

    async fn fetch_channel_info(&self, channel_id: &str) -> Result<ChannelInfo>;

    /// Post a message; `payload` is the platform's message body (channel, text, blocks...).
    async fn post_message(&self, payload: Value) -> Result<()>;

    async fn open_view(&self, payload: Value) -> Result<()>;

    async fn update_view(&self, payload: Value) -> Result<()>;

    /// Acknowledge receipt of an interactive delivery. Must be called before
    /// any other work on actions and view submissions.
    async fn acknowledge(&self, delivery_id: &str) -> Result<()>;
}
