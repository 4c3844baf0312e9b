// ABOUTME: Recording Platform Client double for unit and integration tests
// ABOUTME: Serves canned profiles/channels and records every call in order

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::context::ChannelKindFlags;
use crate::traits::{ChannelInfo, PlatformClient, UserProfile};

/// One call observed by [`MockPlatformClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    FetchUser(String),
    FetchChannel(String),
    PostMessage(Value),
    OpenView(Value),
    UpdateView(Value),
    Acknowledge(String),
}

/// In-memory `PlatformClient`.
///
/// Unknown users and channels fail their lookup, as would a platform
/// `user_not_found` / `channel_not_found` error.
#[derive(Default)]
pub struct MockPlatformClient {
    users: HashMap<String, UserProfile>,
    channels: HashMap<String, ChannelInfo>,
    failing_texts: HashSet<String>,
    fetch_delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockPlatformClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, id: &str, display_name: &str, email: &str) -> Self {
        self.users.insert(
            id.to_string(),
            UserProfile {
                id: id.to_string(),
                display_name: display_name.to_string(),
                email: email.to_string(),
            },
        );
        self
    }

    pub fn with_channel(mut self, id: &str, name: &str, flags: ChannelKindFlags) -> Self {
        self.channels.insert(
            id.to_string(),
            ChannelInfo {
                name: name.to_string(),
                flags,
            },
        );
        self
    }

    /// Make `post_message` fail for payloads whose `text` equals `text`.
    pub fn with_failing_post(mut self, text: &str) -> Self {
        self.failing_texts.insert(text.to_string());
        self
    }

    /// Delay every profile/channel fetch, to widen race windows in tests.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().clone()
    }

    pub fn user_fetches(&self, id: &str) -> usize {
        self.lock()
            .iter()
            .filter(|c| matches!(c, RecordedCall::FetchUser(u) if u == id))
            .count()
    }

    pub fn channel_fetches(&self, id: &str) -> usize {
        self.lock()
            .iter()
            .filter(|c| matches!(c, RecordedCall::FetchChannel(ch) if ch == id))
            .count()
    }

    pub fn posted(&self) -> Vec<Value> {
        self.lock()
            .iter()
            .filter_map(|c| match c {
                RecordedCall::PostMessage(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: RecordedCall) {
        self.lock().push(call);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn delay(&self) {
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl PlatformClient for MockPlatformClient {
    async fn fetch_user_profile(&self, user_id: &str) -> Result<UserProfile> {
        self.record(RecordedCall::FetchUser(user_id.to_string()));
        self.delay().await;
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| anyhow!("user_not_found"))
    }

    async fn fetch_channel_info(&self, channel_id: &str) -> Result<ChannelInfo> {
        self.record(RecordedCall::FetchChannel(channel_id.to_string()));
        self.delay().await;
        self.channels
            .get(channel_id)
            .cloned()
            .ok_or_else(|| anyhow!("channel_not_found"))
    }

    async fn post_message(&self, payload: Value) -> Result<()> {
        let text = payload
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.record(RecordedCall::PostMessage(payload));
        if self.failing_texts.contains(&text) {
            return Err(anyhow!("chat.postMessage rejected"));
        }
        Ok(())
    }

    async fn open_view(&self, payload: Value) -> Result<()> {
        self.record(RecordedCall::OpenView(payload));
        Ok(())
    }

    async fn update_view(&self, payload: Value) -> Result<()> {
        self.record(RecordedCall::UpdateView(payload));
        Ok(())
    }

    async fn acknowledge(&self, delivery_id: &str) -> Result<()> {
        self.record(RecordedCall::Acknowledge(delivery_id.to_string()));
        Ok(())
    }
}
