// ABOUTME: Error taxonomy for event normalization, dispatch and outbound delivery
// ABOUTME: Every variant is recoverable except Configuration, which aborts startup

use thiserror::Error;

/// Boxed error type used to carry platform and handler failures as a source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias for operations in this crate and its platform adapters.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Top-level error returned by adapter operations.
///
/// Nothing above the per-event task boundary ever sees one of these: the
/// adapter logs it and drops it.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Fatal; raised while constructing an adapter.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Malformed or unrecognized inbound data. Callers log and degrade.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("action id '{raw}' has {segments} segment(s), expected at least 3")]
    MalformedActionId { raw: String, segments: usize },

    #[error("unsupported interactive component kind '{0}'")]
    UnsupportedComponent(String),

    #[error("invalid view private_metadata: {0}")]
    PrivateMetadata(#[source] serde_json::Error),

    #[error("undecodable {kind} payload: {source}")]
    Payload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} event has no actions")]
    EmptyActions(&'static str),
}

/// A platform call failed. Never retried by this layer.
#[derive(Debug, Error)]
#[error("{operation} failed for '{target}': {source}")]
pub struct TransportError {
    pub operation: &'static str,
    pub target: String,
    #[source]
    pub source: BoxError,
}

impl TransportError {
    pub fn new(operation: &'static str, target: impl Into<String>, source: anyhow::Error) -> Self {
        Self {
            operation,
            target: target.into(),
            source: source.into(),
        }
    }
}

/// Failures while routing an action or view submission.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no active route is set")]
    NoActiveRoute,

    #[error("route '{route}' handler failed: {source}")]
    Handler {
        route: String,
        #[source]
        source: BoxError,
    },

    #[error("route '{route}' handler panicked")]
    Panicked { route: String },
}
