//! Bot API wire types (only the fields we read)

use crate::session::{ChatId, InboundMessage, UserId};
use serde::{Deserialize, Serialize};

/// Envelope around every Bot API response
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub username: Option<String>,
}

impl Update {
    /// Text messages from people become inbound messages; everything else
    /// (stickers, edits, channel posts, other bots) is dropped. So are
    /// commands like `/publish@otherbot` when `bot_username` is known and
    /// differs.
    pub fn into_inbound(self, bot_username: Option<&str>) -> Option<InboundMessage> {
        let message = self.message?;
        let from = message.from.filter(|u| !u.is_bot)?;
        let text = message.text?;
        if addressed_elsewhere(&text, bot_username) {
            return None;
        }
        Some(InboundMessage::new(
            UserId(from.id),
            ChatId(message.chat.id),
            text,
        ))
    }
}

fn addressed_elsewhere(text: &str, bot_username: Option<&str>) -> bool {
    let (Some(command), Some(ours)) = (text.strip_prefix('/'), bot_username) else {
        return false;
    };
    let word = command.split_whitespace().next().unwrap_or_default();
    word.split_once('@')
        .is_some_and(|(_, target)| !target.eq_ignore_ascii_case(ours))
}

#[derive(Debug, Serialize)]
pub(crate) struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub timeout: u64,
    pub allowed_updates: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub(crate) struct SendMessageRequest<'a> {
    pub chat_id: i64,
    pub text: &'a str,
}
