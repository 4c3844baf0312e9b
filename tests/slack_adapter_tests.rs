// ABOUTME: End-to-end tests of the Slack adapter pipeline against a recording client
// ABOUTME: Covers acknowledgement order, text normalization, filtering and routing

use std::sync::{Arc, Mutex};

use commonbot::config::{Config, PlatformConfig, SlackConfig};
use commonbot::platform::slack::Outcome;
use commonbot::platform::SlackAdapter;
use commonbot::testing::{MockPlatformClient, RecordedCall};
use commonbot::{BotRef, BridgeError, ChatContextData, ChattingType, Listener, Matcher, Route};
use commonbot_core::{ActionType, ChannelKindFlags, DispatchError, PlatformClient};
use serde_json::{json, Value};

// =============================================================================
// Fixtures
// =============================================================================

fn slack_config() -> SlackConfig {
    SlackConfig {
        app_token: "xapp-test".to_string(),
        bot_token: "xoxb-test".to_string(),
        ..Default::default()
    }
}

fn config_with(slack: SlackConfig) -> Config {
    Config {
        platform: PlatformConfig::default(),
        slack: Some(slack),
        ..Default::default()
    }
}

fn bot() -> BotRef {
    BotRef::new("UBOT", "Bot")
}

fn mock() -> Arc<MockPlatformClient> {
    Arc::new(
        MockPlatformClient::new()
            .with_user("U1", "Ada", "ada@example.com")
            .with_channel(
                "C1",
                "general",
                ChannelKindFlags {
                    is_channel: true,
                    ..Default::default()
                },
            )
            .with_channel(
                "C7",
                "polls",
                ChannelKindFlags {
                    is_group: true,
                    ..Default::default()
                },
            )
            .with_channel(
                "D1",
                "",
                ChannelKindFlags {
                    is_im: true,
                    ..Default::default()
                },
            ),
    )
}

fn adapter(mock: &Arc<MockPlatformClient>, config: &Config) -> SlackAdapter {
    let client: Arc<dyn PlatformClient> = mock.clone();
    SlackAdapter::new(config, client, bot()).unwrap()
}

type Seen = Arc<Mutex<Vec<ChatContextData>>>;

/// A listener that records every message context it sees.
fn recording_listener() -> (Listener, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let listener = Listener::new("recorder").matcher(Matcher::new(|_| true).handler(
        move |ctx: Arc<ChatContextData>| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push((*ctx).clone());
                Ok(())
            }
        },
    ));
    (listener, seen)
}

fn recording_route() -> (Route, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let route = Route::new("recorder", move |ctx: Arc<ChatContextData>| {
        let sink = Arc::clone(&sink);
        async move {
            sink.lock().unwrap().push((*ctx).clone());
            Ok(())
        }
    });
    (route, seen)
}

fn message(user: &str, channel: &str, text: &str) -> Value {
    json!({
        "type": "event_callback",
        "team_id": "T1",
        "event": {
            "type": "message",
            "user": user,
            "channel": channel,
            "text": text,
            "ts": "1700000000.000100"
        }
    })
}

fn block_action(action_id: &str, kind: &str) -> Value {
    json!({
        "type": "block_actions",
        "trigger_id": "TRIG1",
        "user": {"id": "U1"},
        "channel": {"id": "C1"},
        "response_url": "https://hooks.slack.test/r",
        "actions": [{"action_id": action_id, "type": kind, "block_id": "B1", "value": "yes"}]
    })
}

// =============================================================================
// Messages
// =============================================================================

#[tokio::test]
async fn test_public_channel_message_is_dispatched_with_context() {
    let mock = mock();
    let (listener, seen) = recording_listener();
    let adapter = adapter(&mock, &config_with(slack_config())).with_listener(listener);

    let outcome = adapter
        .process(&message("U1", "C1", "<@UBOT> hello &amp; welcome"))
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::Dispatched(r) if r.invoked == 1));
    let seen = seen.lock().unwrap();
    let ctx = &seen[0];
    assert_eq!(ctx.message_text(), Some("@Bot hello & welcome"));
    assert_eq!(ctx.chatting_type(), ChattingType::PublicChannel);
    assert_eq!(ctx.user_id(), "U1");
    assert_eq!(ctx.context.chatting.user.display_name, "Ada");
    assert_eq!(ctx.context.chatting.channel.name, "general");
    assert_eq!(ctx.bot(), &bot());
    assert_eq!(ctx.context.chatting.team, "");
    assert_eq!(ctx.platform_str("ts"), Some("1700000000.000100"));
}

#[tokio::test]
async fn test_direct_message_is_addressed_to_bot_once() {
    let mock = mock();
    let (listener, seen) = recording_listener();
    let adapter = adapter(&mock, &config_with(slack_config())).with_listener(listener);

    adapter.process(&message("U1", "D1", "hello")).await.unwrap();
    adapter
        .process(&message("U1", "D1", "<@UBOT> hello again"))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].chatting_type(), ChattingType::Personal);
    assert_eq!(seen[0].message_text(), Some("@Bot hello"));
    assert_eq!(seen[1].message_text(), Some("@Bot hello again"));
}

#[tokio::test]
async fn test_structured_blocks_win_over_plain_text() {
    let mock = mock();
    let (listener, seen) = recording_listener();
    let adapter = adapter(&mock, &config_with(slack_config())).with_listener(listener);

    let raw = json!({
        "event": {
            "type": "app_mention",
            "user": "U1",
            "channel": "C1",
            "text": "<@UBOT> hi <http://x|x>",
            "blocks": [{
                "type": "rich_text",
                "elements": [{
                    "type": "rich_text_section",
                    "elements": [
                        {"type": "user", "user_id": "UBOT"},
                        {"type": "text", "text": " hi "},
                        {"type": "link", "url": "http://x"}
                    ]
                }]
            }]
        }
    });

    adapter.process(&raw).await.unwrap();

    assert_eq!(
        seen.lock().unwrap()[0].message_text(),
        Some("@Bot hi http://x")
    );
}

#[tokio::test]
async fn test_identities_are_fetched_once() {
    let mock = mock();
    let adapter = adapter(&mock, &config_with(slack_config()));

    adapter.process(&message("U1", "C1", "one")).await.unwrap();
    adapter.process(&message("U1", "C1", "two")).await.unwrap();

    assert_eq!(mock.user_fetches("U1"), 1);
    assert_eq!(mock.channel_fetches("C1"), 1);
    assert_eq!(adapter.cache().user_count(), 1);
}

#[tokio::test]
async fn test_bot_and_subtype_messages_are_ignored() {
    let mock = mock();
    let (listener, seen) = recording_listener();
    let adapter = adapter(&mock, &config_with(slack_config())).with_listener(listener);

    let edited = json!({"event": {"type": "message", "subtype": "message_changed", "channel": "C1"}});
    let from_bot = json!({"event": {"type": "message", "bot_id": "B1", "user": "U1", "channel": "C1", "text": "x"}});

    assert!(matches!(
        adapter.process(&edited).await.unwrap(),
        Outcome::Ignored(_)
    ));
    assert!(matches!(
        adapter.process(&from_bot).await.unwrap(),
        Outcome::Ignored(_)
    ));
    assert!(matches!(
        adapter.process(&message("UBOT", "C1", "echo")).await.unwrap(),
        Outcome::Ignored(_)
    ));

    assert!(seen.lock().unwrap().is_empty());
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_file_share_and_thread_broadcast_are_dispatched() {
    let mock = mock();
    let (listener, seen) = recording_listener();
    let adapter = adapter(&mock, &config_with(slack_config())).with_listener(listener);

    for subtype in ["file_share", "thread_broadcast"] {
        let raw = json!({
            "event": {
                "type": "message",
                "subtype": subtype,
                "user": "U1",
                "channel": "C1",
                "text": "<@UBOT> ping"
            }
        });
        let outcome = adapter.process(&raw).await.unwrap();
        assert!(
            matches!(outcome, Outcome::Dispatched(r) if r.invoked == 1),
            "{subtype} should be dispatched"
        );
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|ctx| ctx.message_text() == Some("@Bot ping")));
}

#[tokio::test]
async fn test_unhandled_event_types_are_ignored() {
    let mock = mock();
    let adapter = adapter(&mock, &config_with(slack_config()));

    let raw = json!({"event": {"type": "reaction_added", "user": "U1"}});
    assert_eq!(
        adapter.process(&raw).await.unwrap(),
        Outcome::Ignored("unhandled event type")
    );
}

#[tokio::test]
async fn test_allowed_users_filter() {
    let mock = mock();
    let config = config_with(SlackConfig {
        allowed_users: vec!["U2".to_string()],
        ..slack_config()
    });
    let adapter = adapter(&mock, &config);

    assert_eq!(
        adapter.process(&message("U1", "C1", "hi")).await.unwrap(),
        Outcome::Ignored("user not allowed")
    );
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_allowed_channels_filter() {
    let mock = mock();
    let config = config_with(SlackConfig {
        allowed_channels: vec!["C7".to_string()],
        ..slack_config()
    });
    let adapter = adapter(&mock, &config);

    assert_eq!(
        adapter.process(&message("U1", "C1", "hi")).await.unwrap(),
        Outcome::Ignored("channel not allowed")
    );
}

#[tokio::test]
async fn test_unknown_user_is_a_transport_error() {
    let mock = mock();
    let adapter = adapter(&mock, &config_with(slack_config()));

    let err = adapter
        .process(&message("U404", "C1", "hi"))
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::Transport(_)));
    assert_eq!(adapter.cache().get_user("U404"), None);
}

// =============================================================================
// Interactive events
// =============================================================================

#[tokio::test]
async fn test_block_action_is_acknowledged_before_any_lookup() {
    let mock = mock();
    let adapter = adapter(&mock, &config_with(slack_config()));
    let (route, _seen) = recording_route();
    adapter.router().set_active(route);

    adapter
        .process(&block_action("poll:vote:tok", "button"))
        .await
        .unwrap();

    let calls = mock.calls();
    assert_eq!(calls[0], RecordedCall::Acknowledge("TRIG1".to_string()));
    assert!(calls[1..]
        .iter()
        .all(|c| !matches!(c, RecordedCall::Acknowledge(_))));
    assert!(calls.contains(&RecordedCall::FetchUser("U1".to_string())));
}

#[tokio::test]
async fn test_block_action_is_routed_to_active_route() {
    let mock = mock();
    let adapter = adapter(&mock, &config_with(slack_config()));
    let (route, seen) = recording_route();
    adapter.router().set_active(route);

    let outcome = adapter
        .process(&block_action("poll:DIALOG_OPEN_settings:tok", "button"))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Routed("recorder".to_string()));
    let seen = seen.lock().unwrap();
    let event = seen[0].event().unwrap();
    assert_eq!(event.plugin_id, "poll");
    assert_eq!(event.action.id, "DIALOG_OPEN_settings");
    assert_eq!(event.action.token, "tok");
    assert_eq!(event.action.action_type, ActionType::DialogOpen);
    assert_eq!(seen[0].platform_str("triggerId"), Some("TRIG1"));
    assert_eq!(seen[0].platform_str("value"), Some("yes"));
    assert_eq!(seen[0].chatting_type(), ChattingType::PublicChannel);
}

#[tokio::test]
async fn test_malformed_action_id_still_routes_with_empty_fields() {
    let mock = mock();
    let adapter = adapter(&mock, &config_with(slack_config()));
    let (route, seen) = recording_route();
    adapter.router().set_active(route);

    adapter
        .process(&block_action("onlyonepart", "datepicker"))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    let event = seen[0].event().unwrap();
    assert_eq!(event.plugin_id, "");
    assert_eq!(event.action.id, "");
    assert_eq!(event.action.action_type, ActionType::Unsupported);
}

#[tokio::test]
async fn test_modal_action_uses_metadata_channel() {
    let mock = mock();
    let adapter = adapter(&mock, &config_with(slack_config()));
    let (route, seen) = recording_route();
    adapter.router().set_active(route);

    let raw = json!({
        "type": "block_actions",
        "trigger_id": "TRIG2",
        "user": {"id": "U1"},
        "actions": [{"action_id": "poll:pick:tok", "type": "static_select", "selected_option": {"value": "a"}}],
        "view": {"id": "V1", "private_metadata": "{\"pluginId\":\"poll\",\"channelId\":\"C7\"}"}
    });

    adapter.process(&raw).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].channel_id(), "C7");
    assert_eq!(seen[0].chatting_type(), ChattingType::PrivateChannel);
    assert_eq!(
        seen[0].event().unwrap().action.action_type,
        ActionType::DropdownSelect
    );
    assert_eq!(seen[0].platform_str("viewId"), Some("V1"));
}

#[tokio::test]
async fn test_view_submission_routes_with_metadata() {
    let mock = mock();
    let adapter = adapter(&mock, &config_with(slack_config()));
    let (route, seen) = recording_route();
    adapter.router().set_active(route);

    let raw = json!({
        "type": "view_submission",
        "trigger_id": "TRIG3",
        "user": {"id": "U1"},
        "view": {
            "id": "V9",
            "callback_id": "poll_modal",
            "private_metadata": "{\"pluginId\":\"poll\",\"channelId\":\"C7\",\"action\":{\"id\":\"vote\",\"token\":\"abc\"}}",
            "state": {"values": {}}
        }
    });

    let outcome = adapter.process(&raw).await.unwrap();

    assert_eq!(outcome, Outcome::Routed("recorder".to_string()));
    assert_eq!(
        mock.calls()[0],
        RecordedCall::Acknowledge("TRIG3".to_string())
    );
    let seen = seen.lock().unwrap();
    let event = seen[0].event().unwrap();
    assert_eq!(event.plugin_id, "poll");
    assert_eq!(event.action.id, "vote");
    assert_eq!(event.action.token, "abc");
    assert_eq!(event.action.action_type, ActionType::DialogSubmit);
    assert_eq!(seen[0].channel_id(), "C7");
    assert_eq!(seen[0].platform_str("callbackId"), Some("poll_modal"));
}

#[tokio::test]
async fn test_view_submission_with_bad_metadata_is_a_parse_error() {
    let mock = mock();
    let adapter = adapter(&mock, &config_with(slack_config()));

    let raw = json!({
        "type": "view_submission",
        "trigger_id": "TRIG4",
        "user": {"id": "U1"},
        "view": {"id": "V9", "private_metadata": "not json"}
    });

    let err = adapter.process(&raw).await.unwrap_err();
    assert!(matches!(err, BridgeError::Parse(_)));
    // acknowledged even though it could not be classified
    assert_eq!(mock.calls(), vec![RecordedCall::Acknowledge("TRIG4".to_string())]);
}

#[tokio::test]
async fn test_action_without_active_route_is_reported() {
    let mock = mock();
    let adapter = adapter(&mock, &config_with(slack_config()));

    let raw = block_action("poll:vote:tok", "button");
    let err = adapter.process(&raw).await.unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Dispatch(DispatchError::NoActiveRoute)
    ));

    // The task boundary logs and drops the error
    adapter.handle_event(raw).await;
}

#[tokio::test]
async fn test_block_actions_without_actions_is_rejected() {
    let mock = mock();
    let adapter = adapter(&mock, &config_with(slack_config()));

    let raw = json!({"type": "block_actions", "trigger_id": "T", "user": {"id": "U1"}, "actions": []});
    assert!(matches!(
        adapter.process(&raw).await,
        Err(BridgeError::Parse(_))
    ));
}

// =============================================================================
// Construction
// =============================================================================

#[tokio::test]
async fn test_non_slack_platform_is_rejected() {
    let mock = mock();
    let client: Arc<dyn PlatformClient> = mock.clone();
    let config = Config {
        platform: PlatformConfig {
            platform_type: "teams".to_string(),
        },
        slack: Some(slack_config()),
        ..Default::default()
    };

    let result = SlackAdapter::new(&config, client, bot());
    assert!(matches!(result, Err(BridgeError::Configuration(_))));
}

#[tokio::test]
async fn test_configured_bot_name_overrides_identity() {
    let mock = mock();
    let config = config_with(SlackConfig {
        bot_name: Some("Helper".to_string()),
        ..slack_config()
    });
    let (listener, seen) = recording_listener();
    let adapter = adapter(&mock, &config).with_listener(listener);

    assert_eq!(adapter.bot(), &BotRef::new("UBOT", "Helper"));

    adapter.process(&message("U1", "D1", "hi")).await.unwrap();
    assert_eq!(seen.lock().unwrap()[0].message_text(), Some("@Helper hi"));
}
