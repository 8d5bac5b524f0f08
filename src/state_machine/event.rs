//! Events that can occur in a user's session

use crate::blogger::PublishedPost;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // User events
    Start,
    Login,
    Compose,
    Publish,
    Text { text: String },
    UnknownCommand { command: String },

    // Login events
    LoginLinkIssued { url: String },

    // Publish events
    CredentialMissing,
    PublishSucceeded { post: PublishedPost },
    PublishFailed { message: String },
}

impl Event {
    /// Parse inbound chat text into a user event.
    ///
    /// Commands may carry a `@botname` suffix and trailing arguments,
    /// both of which are ignored.
    pub fn from_message_text(text: &str) -> Self {
        let Some(command) = text.strip_prefix('/') else {
            return Event::Text {
                text: text.to_string(),
            };
        };

        let word = command.split_whitespace().next().unwrap_or_default();
        let name = word.split_once('@').map_or(word, |(name, _)| name);

        match name {
            "start" => Event::Start,
            "login" => Event::Login,
            "compose" => Event::Compose,
            "publish" => Event::Publish,
            other => Event::UnknownCommand {
                command: other.to_string(),
            },
        }
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Event::Start => "start",
            Event::Login => "login",
            Event::Compose => "compose",
            Event::Publish => "publish",
            Event::Text { .. } => "text",
            Event::UnknownCommand { .. } => "unknown_command",
            Event::LoginLinkIssued { .. } => "login_link_issued",
            Event::CredentialMissing => "credential_missing",
            Event::PublishSucceeded { .. } => "publish_succeeded",
            Event::PublishFailed { .. } => "publish_failed",
        }
    }
}
