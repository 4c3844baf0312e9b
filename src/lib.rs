// ABOUTME: Root library module exposing the Slack platform layer
// ABOUTME: Platform-agnostic context, cache, dispatch and config live in commonbot-core

pub mod platform;

// Re-export platform-agnostic modules from commonbot-core
pub use commonbot_core::config;
pub use commonbot_core::testing;
pub use commonbot_core::traits;

pub use commonbot_core::{
    BotRef, BridgeError, BridgeResult, ChatContextData, ChattingType, Listener, Matcher,
    OutboundMessage, OutboundSender, Payload, Route, Router,
};
