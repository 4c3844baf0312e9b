// ABOUTME: Platform-agnostic chat context, identity cache, dispatch and outbound delivery
// ABOUTME: Platform adapters normalize inbound events into ChatContextData using these pieces

pub mod cache;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod outbound;
pub mod testing;
pub mod traits;

pub use cache::IdentityCache;
pub use context::{
    Action, ActionType, BotRef, Channel, ChannelKindFlags, ChatContextData, ChattingType,
    ContextBuilder, Event, Payload, User,
};
pub use dispatch::{
    dispatch_action, dispatch_message, DispatchReport, Listener, Matcher, Route, Router,
};
pub use error::{BridgeError, BridgeResult, DispatchError, ParseError, TransportError};
pub use outbound::{MessageKind, OutboundMessage, OutboundSender, SendReport, DEFAULT_MESSAGE_TEXT};
pub use traits::{ChannelInfo, PlatformClient, UserProfile};
