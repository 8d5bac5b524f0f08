//! Composition state types

use serde::{Deserialize, Serialize};

/// Title and body of a post that has not been published yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
}

impl PostDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Where a user is in the compose -> title -> content -> publish cycle
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComposeState {
    /// No draft in progress
    #[default]
    Idle,

    /// `/compose` received, next text is the title
    WaitingTitle,

    /// Title received, next text is the body
    WaitingContent { title: String },

    /// Draft complete, `/publish` will send it
    PostReady { draft: PostDraft },
}

impl ComposeState {
    /// Snake-case name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ComposeState::Idle => "idle",
            ComposeState::WaitingTitle => "waiting_title",
            ComposeState::WaitingContent { .. } => "waiting_content",
            ComposeState::PostReady { .. } => "post_ready",
        }
    }

    #[cfg(test)]
    pub fn draft(&self) -> Option<&PostDraft> {
        match self {
            ComposeState::PostReady { draft } => Some(draft),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn draft_title(&self) -> Option<&str> {
        match self {
            ComposeState::WaitingContent { title } => Some(title),
            ComposeState::PostReady { draft } => Some(&draft.title),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn draft_content(&self) -> Option<&str> {
        self.draft().map(|d| d.content.as_str())
    }

    #[cfg(test)]
    pub fn is_post_ready(&self) -> bool {
        matches!(self, ComposeState::PostReady { .. })
    }
}
