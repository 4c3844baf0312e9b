// ABOUTME: Platform module for commonbot
// ABOUTME: Slack is the only platform this build drives

pub mod slack;

pub use slack::{SlackAdapter, SlackApiClient, SlackPlatform};
