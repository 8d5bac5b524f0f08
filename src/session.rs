//! Per-user identity and session types

use crate::state_machine::ComposeState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat-platform identity of the person talking to the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat that replies are delivered to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A text message received from the chat transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub user: UserId,
    pub chat: ChatId,
    pub text: String,
}

impl InboundMessage {
    pub fn new(user: UserId, chat: ChatId, text: impl Into<String>) -> Self {
        Self {
            user,
            chat,
            text: text.into(),
        }
    }
}

/// In-memory session for one user. Lost on restart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSession {
    pub state: ComposeState,
}

#[cfg(test)]
impl UserSession {
    pub fn draft(&self) -> Option<&crate::state_machine::PostDraft> {
        self.state.draft()
    }

    pub fn draft_title(&self) -> Option<&str> {
        self.state.draft_title()
    }

    pub fn draft_content(&self) -> Option<&str> {
        self.state.draft_content()
    }
}
