// ABOUTME: Slack platform wiring: Socket Mode listener feeding raw deliveries into the SlackAdapter
// ABOUTME: Each delivery is processed on its own task so the envelope is acknowledged immediately

pub mod adapter;
pub mod classify;
pub mod client;
pub mod content;
pub mod events;

pub use adapter::{Outcome, SlackAdapter};
pub use client::SlackApiClient;

use anyhow::Result;
use serde::Serialize;
use slack_morphism::prelude::*;
use std::sync::Arc;

// =============================================================================
// Shared state passed to Socket Mode callbacks via SlackClientEventsUserState
// =============================================================================

/// State shared with Socket Mode callback functions via user state storage.
/// Callbacks are fn pointers (not closures), so they cannot capture variables.
#[derive(Clone)]
struct SlackBridgeState {
    adapter: Arc<SlackAdapter>,
}

// =============================================================================
// Socket Mode callback functions (must be fn pointers, not closures)
// =============================================================================

async fn bridge_state(
    states: &SlackClientEventsUserState,
) -> Result<SlackBridgeState, Box<dyn std::error::Error + Send + Sync>> {
    let guard = states.read().await;
    guard
        .get_user_state::<SlackBridgeState>()
        .cloned()
        .ok_or_else(|| "SlackBridgeState not found in user state".into())
}

/// Serialize the delivery and hand it to its own task.
fn spawn_delivery<E: Serialize>(
    bridge: SlackBridgeState,
    event: &E,
    kind: &'static str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let raw = serde_json::to_value(event)?;
    tracing::trace!(platform = "slack", kind, "Slack delivery received");
    tokio::spawn(async move {
        bridge.adapter.handle_event(raw).await;
    });
    Ok(())
}

/// Handle push events (messages, app mentions) from Socket Mode
async fn handle_push_event(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let bridge = bridge_state(&states).await?;
    spawn_delivery(bridge, &event, "push")
}

/// Handle interactive components (block actions, view submissions) from Socket Mode
async fn handle_interaction_event(
    event: SlackInteractionEvent,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let bridge = bridge_state(&states).await?;
    spawn_delivery(bridge, &event, "interaction")
}

/// Socket Mode error handler
fn socket_mode_error_handler(
    err: Box<dyn std::error::Error + Send + Sync>,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> HttpStatusCode {
    tracing::error!(platform = "slack", error = %err, "Socket Mode error");
    HttpStatusCode::OK
}

// =============================================================================
// SlackPlatform
// =============================================================================

/// Socket Mode connection driving one [`SlackAdapter`].
pub struct SlackPlatform {
    client: Arc<SlackHyperClient>,
    /// App-level token (xapp-...) for Socket Mode connections
    app_token: SlackApiToken,
    adapter: Arc<SlackAdapter>,
}

impl SlackPlatform {
    pub fn new(client: Arc<SlackHyperClient>, app_token: &str, adapter: Arc<SlackAdapter>) -> Self {
        Self {
            client,
            app_token: SlackApiToken::new(SlackApiTokenValue(app_token.to_string())),
            adapter,
        }
    }

    pub fn adapter(&self) -> Arc<SlackAdapter> {
        Arc::clone(&self.adapter)
    }

    /// Connect over Socket Mode and serve deliveries until the listener shuts down.
    pub async fn run(&self) -> Result<()> {
        let bridge_state = SlackBridgeState {
            adapter: Arc::clone(&self.adapter),
        };

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_push_events(handle_push_event)
            .with_interaction_events(handle_interaction_event);

        let listener_environment = Arc::new(
            SlackClientEventsListenerEnvironment::new(Arc::clone(&self.client))
                .with_error_handler(socket_mode_error_handler)
                .with_user_state(bridge_state),
        );

        let socket_mode_listener = SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment,
            socket_mode_callbacks,
        );

        socket_mode_listener
            .listen_for(&self.app_token)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start Socket Mode listener: {}", e))?;

        tracing::info!(platform = "slack", bot = %self.adapter.bot().name, "Socket Mode connected");

        // serve() blocks until the listener is shut down
        socket_mode_listener.serve().await;

        tracing::info!(platform = "slack", "Socket Mode listener stopped");
        Ok(())
    }
}
