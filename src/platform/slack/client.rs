// ABOUTME: slack-morphism backed PlatformClient for user/channel lookups, posting and modal views
// ABOUTME: Responses are projected through JSON so lookups only depend on Slack's documented fields

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use commonbot_core::{BotRef, ChannelInfo, ChannelKindFlags, PlatformClient, UserProfile};
use serde_json::Value;
use slack_morphism::prelude::*;

/// Slack Web API client bound to one bot token.
pub struct SlackApiClient {
    client: Arc<SlackHyperClient>,
    bot_token: SlackApiToken,
}

impl SlackApiClient {
    pub fn new(bot_token: &str) -> Result<Self> {
        let client = Arc::new(SlackClient::new(
            SlackClientHyperConnector::new().context("Failed to create Slack HTTP connector")?,
        ));
        Ok(Self {
            client,
            bot_token: SlackApiToken::new(SlackApiTokenValue(bot_token.to_string())),
        })
    }

    /// The shared HTTP client, also used by the Socket Mode listener.
    pub fn http_client(&self) -> Arc<SlackHyperClient> {
        Arc::clone(&self.client)
    }

    /// Resolve the bot's own user id and name via `auth.test`.
    pub async fn bot_identity(&self) -> Result<BotRef> {
        let session = self.client.open_session(&self.bot_token);
        let auth = session
            .auth_test()
            .await
            .context("Failed to call Slack auth.test, check bot_token")?;

        let auth = serde_json::to_value(&auth).context("Failed to read auth.test response")?;
        let bot = bot_from_auth_json(&auth);
        let team = non_empty(&auth, "/team").unwrap_or_default();

        tracing::info!(
            platform = "slack",
            bot_user = %bot.id,
            bot_name = %bot.name,
            team = %team,
            "Slack bot authenticated"
        );

        Ok(bot)
    }
}

#[async_trait]
impl PlatformClient for SlackApiClient {
    async fn fetch_user_profile(&self, user_id: &str) -> Result<UserProfile> {
        let session = self.client.open_session(&self.bot_token);
        let req = SlackApiUsersInfoRequest::new(SlackUserId(user_id.to_string()));
        let resp = session
            .users_info(&req)
            .await
            .context("Failed to call Slack users.info")?;

        let user = serde_json::to_value(&resp.user).context("Failed to read users.info response")?;
        Ok(profile_from_user_json(user_id, &user))
    }

    async fn fetch_channel_info(&self, channel_id: &str) -> Result<ChannelInfo> {
        let session = self.client.open_session(&self.bot_token);
        let req = SlackApiConversationsInfoRequest::new(SlackChannelId(channel_id.to_string()));
        let resp = session
            .conversations_info(&req)
            .await
            .context("Failed to call Slack conversations.info")?;

        let channel = serde_json::to_value(&resp.channel)
            .context("Failed to read conversations.info response")?;
        Ok(channel_info_from_json(&channel))
    }

    async fn post_message(&self, payload: Value) -> Result<()> {
        let req: SlackApiChatPostMessageRequest =
            serde_json::from_value(payload).context("Invalid chat.postMessage payload")?;
        let session = self.client.open_session(&self.bot_token);
        session
            .chat_post_message(&req)
            .await
            .context("Failed to send Slack message")?;
        Ok(())
    }

    async fn open_view(&self, payload: Value) -> Result<()> {
        let req: SlackApiViewsOpenRequest =
            serde_json::from_value(payload).context("Invalid views.open payload")?;
        let session = self.client.open_session(&self.bot_token);
        session
            .views_open(&req)
            .await
            .context("Failed to open Slack view")?;
        Ok(())
    }

    async fn update_view(&self, payload: Value) -> Result<()> {
        let req: SlackApiViewsUpdateRequest =
            serde_json::from_value(payload).context("Invalid views.update payload")?;
        let session = self.client.open_session(&self.bot_token);
        session
            .views_update(&req)
            .await
            .context("Failed to update Slack view")?;
        Ok(())
    }

    async fn acknowledge(&self, delivery_id: &str) -> Result<()> {
        // Socket Mode acks the envelope when the interaction callback returns,
        // which happens before the event is processed
        tracing::trace!(platform = "slack", delivery_id = %delivery_id, "Interaction acknowledged");
        Ok(())
    }
}

fn non_empty<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Display name preference: profile display name, real name, then handle.
pub fn profile_from_user_json(user_id: &str, user: &Value) -> UserProfile {
    let display_name = non_empty(user, "/profile/display_name")
        .or_else(|| non_empty(user, "/profile/real_name"))
        .or_else(|| non_empty(user, "/real_name"))
        .or_else(|| non_empty(user, "/name"))
        .unwrap_or_default();

    UserProfile {
        id: non_empty(user, "/id").unwrap_or(user_id).to_string(),
        display_name: display_name.to_string(),
        email: non_empty(user, "/profile/email").unwrap_or_default().to_string(),
    }
}

/// Channel name plus the four kind flags. Direct messages have no name.
pub fn channel_info_from_json(channel: &Value) -> ChannelInfo {
    let flag = |key: &str| channel.get(key).and_then(Value::as_bool).unwrap_or(false);
    ChannelInfo {
        name: non_empty(channel, "/name").unwrap_or_default().to_string(),
        flags: ChannelKindFlags {
            is_channel: flag("is_channel"),
            is_group: flag("is_group"),
            is_im: flag("is_im"),
            is_mpim: flag("is_mpim"),
        },
    }
}

fn bot_from_auth_json(auth: &Value) -> BotRef {
    BotRef::new(
        non_empty(auth, "/user_id").unwrap_or_default(),
        non_empty(auth, "/user").unwrap_or_default(),
    )
}
