//! Effects produced by state transitions

use super::PostDraft;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send a message to the originating chat
    Reply { text: String },

    /// Issue an authorization URL for this user
    BeginLogin,

    /// Load the user's credential and create the post
    Publish { draft: PostDraft },
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply { text: text.into() }
    }
}
