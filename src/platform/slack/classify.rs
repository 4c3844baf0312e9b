// ABOUTME: Classifies Slack interactive payloads into the plugin/action/token event taxonomy
// ABOUTME: Composite action ids are "plugin:action:token"; malformed ids degrade to empty fields

use commonbot_core::{Action, ActionType, Event, ParseError};
use serde::Deserialize;

/// Action ids with this prefix open a dialog when attached to a button.
pub const DIALOG_OPEN_PREFIX: &str = "DIALOG_OPEN_";

/// The three parts of a composite action id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionId {
    pub plugin_id: String,
    pub action_id: String,
    pub token: String,
}

/// Split `raw` on `:`. Requires at least three segments; extras are ignored.
pub fn decode_action_id(raw: &str) -> Result<ActionId, ParseError> {
    let segments: Vec<&str> = raw.split(':').collect();
    if segments.len() < 3 {
        return Err(ParseError::MalformedActionId {
            raw: raw.to_string(),
            segments: segments.len(),
        });
    }
    Ok(ActionId {
        plugin_id: segments[0].to_string(),
        action_id: segments[1].to_string(),
        token: segments[2].to_string(),
    })
}

/// Pick the action type from the payload kind and the component kind.
pub fn action_type_for(
    event_kind: &str,
    component_kind: &str,
    action_id: &str,
) -> Result<ActionType, ParseError> {
    if event_kind == "view_submission" {
        return Ok(ActionType::DialogSubmit);
    }
    match component_kind {
        "static_select" => Ok(ActionType::DropdownSelect),
        "button" if action_id.starts_with(DIALOG_OPEN_PREFIX) => Ok(ActionType::DialogOpen),
        "button" => Ok(ActionType::ButtonClick),
        other => Err(ParseError::UnsupportedComponent(other.to_string())),
    }
}

/// Classify one interactive action. Never fails: a malformed id leaves
/// plugin/action/token empty and an unknown component yields `Unsupported`,
/// both logged at error level.
pub fn classify_action(raw_action_id: &str, event_kind: &str, component_kind: &str) -> Event {
    let ids = match decode_action_id(raw_action_id) {
        Ok(ids) => Some(ids),
        Err(e) => {
            tracing::error!(platform = "slack", error = %e, "Failed to parse action id");
            None
        }
    };

    let (plugin_id, action_id, token) = match ids {
        Some(ids) => (ids.plugin_id, ids.action_id, ids.token),
        None => Default::default(),
    };

    let action_type = match action_type_for(event_kind, component_kind, &action_id) {
        Ok(action_type) => action_type,
        Err(e) => {
            tracing::error!(
                platform = "slack",
                error = %e,
                action_id = %raw_action_id,
                "Unsupported interactive component"
            );
            ActionType::Unsupported
        }
    };

    Event {
        plugin_id,
        action: Action {
            id: action_id,
            action_type,
            token,
        },
    }
}

/// Routing data a plugin stores in a modal's `private_metadata` when opening it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewMetadata {
    #[serde(default)]
    pub plugin_id: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub action: MetadataAction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MetadataAction {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub token: String,
}

pub fn decode_view_metadata(private_metadata: &str) -> Result<ViewMetadata, ParseError> {
    serde_json::from_str(private_metadata).map_err(ParseError::PrivateMetadata)
}

/// Classify a view submission from its `private_metadata`. The action type
/// is always `DialogSubmit`; the channel id is returned alongside because
/// view submissions carry no channel of their own.
pub fn classify_view_submission(private_metadata: &str) -> Result<(Event, String), ParseError> {
    let metadata = decode_view_metadata(private_metadata)?;
    let event = Event {
        plugin_id: metadata.plugin_id,
        action: Action {
            id: metadata.action.id,
            action_type: ActionType::DialogSubmit,
            token: metadata.action.token,
        },
    };
    Ok((event, metadata.channel_id))
}
