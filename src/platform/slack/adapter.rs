// ABOUTME: Per-event pipeline turning raw Slack deliveries into ChatContextData and dispatching them
// ABOUTME: Interactive deliveries are acknowledged before any identity resolution or routing

use std::sync::Arc;

use commonbot_core::config::{Config, SlackConfig};
use commonbot_core::{
    dispatch_action, dispatch_message, BotRef, BridgeResult, Channel, ContextBuilder,
    DispatchReport, IdentityCache, Listener, OutboundSender, ParseError, Payload, PlatformClient,
    Router, TransportError,
};
use serde_json::{json, Value};

use super::classify::{classify_action, classify_view_submission, decode_view_metadata};
use super::content::{personalize, select_text};
use super::events::{BlockActionsEvent, InboundEvent, MessageEvent, ViewSubmissionEvent};

/// What happened to one inbound delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Filtered out before any dispatch.
    Ignored(&'static str),
    /// A message went through the listener chains.
    Dispatched(DispatchReport),
    /// An action or view submission was handed to the named route.
    Routed(String),
}

/// Normalizes Slack deliveries for one bot.
///
/// Owns the identity cache for the process lifetime. Each delivery is
/// processed by [`SlackAdapter::handle_event`], which never returns an error.
pub struct SlackAdapter {
    client: Arc<dyn PlatformClient>,
    cache: IdentityCache,
    builder: ContextBuilder,
    listeners: Vec<Listener>,
    router: Arc<Router>,
    sender: OutboundSender,
    config: SlackConfig,
}

impl SlackAdapter {
    /// Fails with a configuration error when the configured platform is not
    /// Slack. A configured `bot_name` overrides the name in `bot`.
    pub fn new(config: &Config, client: Arc<dyn PlatformClient>, bot: BotRef) -> BridgeResult<Self> {
        let slack = config.require_slack()?.clone();

        let bot = match slack.bot_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => BotRef::new(bot.id, name),
            _ => bot,
        };

        tracing::info!(
            platform = "slack",
            bot_id = %bot.id,
            bot_name = %bot.name,
            allowed_users = slack.allowed_users.len(),
            allowed_channels = slack.allowed_channels.len(),
            "Slack adapter created"
        );

        Ok(Self {
            cache: IdentityCache::new(Arc::clone(&client)),
            sender: OutboundSender::new(Arc::clone(&client)),
            builder: ContextBuilder::new(bot),
            listeners: Vec::new(),
            router: Arc::new(Router::new()),
            client,
            config: slack,
        })
    }

    pub fn with_listener(mut self, listener: Listener) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn bot(&self) -> &BotRef {
        self.builder.bot()
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    pub fn router(&self) -> Arc<Router> {
        Arc::clone(&self.router)
    }

    pub fn sender(&self) -> OutboundSender {
        self.sender.clone()
    }

    /// Task boundary: process one delivery, log any error and drop it.
    pub async fn handle_event(&self, raw: Value) {
        match self.process(&raw).await {
            Ok(Outcome::Ignored(reason)) => {
                tracing::debug!(platform = "slack", reason, "Ignored Slack event");
            }
            Ok(Outcome::Dispatched(report)) => {
                tracing::debug!(
                    platform = "slack",
                    matched = report.matched,
                    invoked = report.invoked,
                    failed = report.failed,
                    "Message dispatched"
                );
            }
            Ok(Outcome::Routed(route)) => {
                tracing::debug!(platform = "slack", route = %route, "Event routed");
            }
            Err(e) => {
                tracing::error!(
                    platform = "slack",
                    error = %e,
                    payload = %raw,
                    "Failed to process Slack event"
                );
            }
        }
    }

    /// Process one delivery and report what happened.
    pub async fn process(&self, raw: &Value) -> BridgeResult<Outcome> {
        // Interactive deliveries have a hard response deadline
        if is_interactive(raw) {
            let delivery_id = raw
                .get("trigger_id")
                .and_then(Value::as_str)
                .unwrap_or_default();
            self.client
                .acknowledge(delivery_id)
                .await
                .map_err(|e| TransportError::new("acknowledge", delivery_id, e))?;
        }

        let Some(event) = InboundEvent::decode(raw)? else {
            return Ok(Outcome::Ignored("unhandled event type"));
        };

        tracing::trace!(platform = "slack", kind = event.kind(), "Decoded Slack event");

        match event {
            InboundEvent::Message(msg) => self.on_message(msg, raw).await,
            InboundEvent::Action(action) => self.on_action(action, raw).await,
            InboundEvent::ViewSubmission(submission) => {
                self.on_view_submission(submission, raw).await
            }
        }
    }

    async fn on_message(&self, msg: MessageEvent, raw: &Value) -> BridgeResult<Outcome> {
        if !is_user_authored(msg.subtype.as_deref()) {
            return Ok(Outcome::Ignored("message subtype"));
        }
        if msg.bot_id.is_some() {
            return Ok(Outcome::Ignored("bot message"));
        }
        let Some(user_id) = msg.user.as_deref().filter(|u| !u.is_empty()) else {
            return Ok(Outcome::Ignored("no sender"));
        };
        if user_id == self.bot().id {
            return Ok(Outcome::Ignored("own message"));
        }
        let Some(channel_id) = msg.channel.as_deref().filter(|c| !c.is_empty()) else {
            return Ok(Outcome::Ignored("no channel"));
        };
        if let Some(reason) = self.access_denied(user_id, Some(channel_id)) {
            return Ok(Outcome::Ignored(reason));
        }

        let user = self.cache.resolve_user(user_id).await?;
        let channel = self.cache.resolve_channel(channel_id).await?;
        let chatting_type = channel.chatting_type;

        let text = select_text(&msg.blocks, msg.text.as_deref(), self.bot());
        let text = personalize(text, chatting_type, self.bot());

        let platform = json!({
            "eventType": msg.kind,
            "ts": msg.ts,
            "threadTs": msg.thread_ts,
            "channelType": msg.channel_type,
            "event": raw,
        });

        let ctx = self
            .builder
            .build(Payload::Message(text), chatting_type, user, channel, platform);
        let report = dispatch_message(Arc::new(ctx), &self.listeners).await;
        Ok(Outcome::Dispatched(report))
    }

    async fn on_action(&self, action: BlockActionsEvent, raw: &Value) -> BridgeResult<Outcome> {
        // Slack sends one action per block_actions delivery in practice
        let component = action
            .actions
            .first()
            .ok_or(ParseError::EmptyActions("block_actions"))?;

        let event = classify_action(&component.action_id, "block_actions", &component.kind);

        let Some(user_id) = action.user_id() else {
            return Ok(Outcome::Ignored("no sender"));
        };

        // Actions inside a modal have no channel; fall back to the one the
        // plugin stored in the modal's metadata
        let channel_id = action.channel_id().map(str::to_string).or_else(|| {
            action
                .view
                .as_ref()
                .and_then(|v| v.private_metadata.as_deref())
                .and_then(|m| decode_view_metadata(m).ok())
                .map(|m| m.channel_id)
                .filter(|c| !c.is_empty())
        });

        if let Some(reason) = self.access_denied(user_id, channel_id.as_deref()) {
            return Ok(Outcome::Ignored(reason));
        }

        let user = self.cache.resolve_user(user_id).await?;
        let channel = self.channel_or_unknown(channel_id.as_deref()).await?;
        let chatting_type = channel.chatting_type;

        let platform = json!({
            "triggerId": action.trigger_id,
            "responseUrl": action.response_url,
            "viewId": action.view.as_ref().and_then(|v| v.id.clone()),
            "blockId": component.block_id,
            "value": component.value,
            "selectedOption": component.selected_option,
            "event": raw,
        });

        let ctx = self
            .builder
            .build(Payload::Event(event), chatting_type, user, channel, platform);
        let route = dispatch_action(Arc::new(ctx), &self.router).await?;
        Ok(Outcome::Routed(route))
    }

    async fn on_view_submission(
        &self,
        submission: ViewSubmissionEvent,
        raw: &Value,
    ) -> BridgeResult<Outcome> {
        let metadata = submission.view.private_metadata.as_deref().unwrap_or_default();
        let (event, channel_id) = classify_view_submission(metadata)?;

        let Some(user_id) = submission.user_id() else {
            return Ok(Outcome::Ignored("no sender"));
        };
        let channel_id = Some(channel_id.as_str()).filter(|c| !c.is_empty());

        if let Some(reason) = self.access_denied(user_id, channel_id) {
            return Ok(Outcome::Ignored(reason));
        }

        let user = self.cache.resolve_user(user_id).await?;
        let channel = self.channel_or_unknown(channel_id).await?;
        let chatting_type = channel.chatting_type;

        let platform = json!({
            "triggerId": submission.trigger_id,
            "viewId": submission.view.id,
            "callbackId": submission.view.callback_id,
            "state": submission.view.state,
            "event": raw,
        });

        let ctx = self
            .builder
            .build(Payload::Event(event), chatting_type, user, channel, platform);
        let route = dispatch_action(Arc::new(ctx), &self.router).await?;
        Ok(Outcome::Routed(route))
    }

    async fn channel_or_unknown(&self, channel_id: Option<&str>) -> Result<Channel, TransportError> {
        match channel_id {
            Some(id) => self.cache.resolve_channel(id).await,
            None => Ok(Channel::default()),
        }
    }

    fn access_denied(&self, user_id: &str, channel_id: Option<&str>) -> Option<&'static str> {
        if !self.config.is_user_allowed(user_id) {
            tracing::debug!(platform = "slack", user_id = %user_id, "Skipping event from non-allowed user");
            return Some("user not allowed");
        }
        if let Some(channel_id) = channel_id {
            if !self.config.is_channel_allowed(channel_id) {
                tracing::debug!(
                    platform = "slack",
                    channel_id = %channel_id,
                    "Skipping event from non-allowed channel"
                );
                return Some("channel not allowed");
            }
        }
        None
    }
}

/// Subtypes that still carry a message a person wrote. Edits, deletions,
/// joins and `bot_message` are everything else.
fn is_user_authored(subtype: Option<&str>) -> bool {
    matches!(subtype, None | Some("file_share") | Some("thread_broadcast"))
}

/// Block actions and view submissions must be acknowledged before anything else.
fn is_interactive(raw: &Value) -> bool {
    matches!(
        raw.get("type").and_then(Value::as_str),
        Some("block_actions") | Some("view_submission")
    )
}
