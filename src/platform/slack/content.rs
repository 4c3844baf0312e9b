// ABOUTME: Recovers literal message text from Slack rich_text blocks or the plain text field
// ABOUTME: Bot mentions become @<bot name>; direct messages are always addressed to the bot

use commonbot_core::{BotRef, ChattingType};

use super::events::{Block, RichTextElement};

/// Replace every `<@BOT_ID>` token in `text` with `@<bot_display_name>`.
pub fn substitute_bot_mention(text: &str, bot_id: &str, bot_display_name: &str) -> String {
    if bot_id.is_empty() {
        return text.to_string();
    }
    text.replace(&format!("<@{}>", bot_id), &format!("@{}", bot_display_name))
}

/// Decode the three HTML entities Slack escapes in message text.
pub fn unescape_slack_text(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Rebuild message text from the first `rich_text` block's first section.
///
/// First match only: blocks are scanned for the first `rich_text` block with
/// at least one section, and only that block's first section is read. Bot
/// mentions become `@<bot_name>`, text elements contribute their text, links
/// contribute their URL; everything else (other users, emoji, channels) is
/// skipped. Returns `None` when nothing was recovered.
pub fn extract_structured_text(blocks: &[Block], bot_id: &str, bot_name: &str) -> Option<String> {
    let section = blocks.iter().find_map(|block| match block {
        Block::RichText { elements } => elements.first(),
        Block::Other => None,
    })?;

    let mut text = String::new();
    for element in &section.elements {
        match element {
            RichTextElement::User { user_id } if !bot_id.is_empty() && user_id == bot_id => {
                text.push('@');
                text.push_str(bot_name);
            }
            RichTextElement::Text { text: literal } => text.push_str(literal),
            RichTextElement::Link { url } => text.push_str(url),
            RichTextElement::User { .. } | RichTextElement::Other => {}
        }
    }

    (!text.is_empty()).then_some(text)
}

/// Choose the message text: structured text when available, otherwise the
/// plain text field with bot mentions substituted.
pub fn select_text(blocks: &[Block], plain_text: Option<&str>, bot: &BotRef) -> String {
    extract_structured_text(blocks, &bot.id, &bot.name).unwrap_or_else(|| {
        let plain = unescape_slack_text(plain_text.unwrap_or_default());
        substitute_bot_mention(&plain, &bot.id, &bot.name)
    })
}

/// In personal chats, prepend `@<bot name> ` unless the text already addresses the bot.
pub fn personalize(text: String, chatting_type: ChattingType, bot: &BotRef) -> String {
    if chatting_type == ChattingType::Personal && !bot.is_mentioned_in(&text) {
        format!("{} {}", bot.mention(), text)
    } else {
        text
    }
}
