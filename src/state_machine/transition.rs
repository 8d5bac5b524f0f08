//! Pure state transition function

use super::{ComposeState, Effect, Event, PostDraft};
use thiserror::Error;

pub const WELCOME_TEXT: &str =
    "Welcome! I can help you manage your blog posts.\nUse /login to authenticate with Google.";
pub const ASK_TITLE_TEXT: &str = "Okay, what would be the title of your post?";
pub const ASK_CONTENT_TEXT: &str = "Got it. What's your post content?";
pub const POST_READY_TEXT: &str = "Your post is ready. Use /publish to publish it.";
pub const LOGIN_FIRST_TEXT: &str = "Please log in using /login first";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ComposeState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ComposeState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Commands that arrive out of order. The message is shown to the user
/// as-is; the session state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("No post ready for publish, use /compose to create a new one")]
    NothingToPublish,
    #[error("Use /compose to create a new post")]
    NoDraftInProgress,
    #[error("Sorry, I didn't understand your request")]
    Unrecognized,
    #[error("Unknown command /{0}. Try /compose, /publish or /login")]
    UnknownCommand(String),
    #[error("Unexpected {event} while {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
}

impl SequenceError {
    /// Errors raised by executor-generated events rather than by the user
    pub fn is_internal(&self) -> bool {
        matches!(self, SequenceError::InvalidTransition { .. })
    }
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs, with no I/O.
pub fn transition(state: &ComposeState, event: Event) -> Result<TransitionResult, SequenceError> {
    match (state, event) {
        // ============================================================
        // Session-independent commands
        // ============================================================
        (_, Event::Start) => {
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::reply(WELCOME_TEXT)))
        }

        (_, Event::Login) => {
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::BeginLogin))
        }

        (_, Event::LoginLinkIssued { url }) => Ok(TransitionResult::new(state.clone())
            .with_effect(Effect::reply(format!("Click this link to login: {url}")))),

        (_, Event::UnknownCommand { command }) => Err(SequenceError::UnknownCommand(command)),

        // ============================================================
        // Composing
        // ============================================================

        // Compose always starts over, discarding any draft
        (_, Event::Compose) => Ok(TransitionResult::new(ComposeState::WaitingTitle)
            .with_effect(Effect::reply(ASK_TITLE_TEXT))),

        (ComposeState::WaitingTitle, Event::Text { text }) => {
            Ok(TransitionResult::new(ComposeState::WaitingContent { title: text })
                .with_effect(Effect::reply(ASK_CONTENT_TEXT)))
        }

        (ComposeState::WaitingContent { title }, Event::Text { text }) => {
            Ok(TransitionResult::new(ComposeState::PostReady {
                draft: PostDraft::new(title.clone(), text),
            })
            .with_effect(Effect::reply(POST_READY_TEXT)))
        }

        (ComposeState::PostReady { .. }, Event::Text { .. }) => Err(SequenceError::Unrecognized),

        (ComposeState::Idle, Event::Text { .. }) => Err(SequenceError::NoDraftInProgress),

        // ============================================================
        // Publishing
        // ============================================================
        (ComposeState::PostReady { draft }, Event::Publish) => {
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::Publish {
                draft: draft.clone(),
            }))
        }

        (_, Event::Publish) => Err(SequenceError::NothingToPublish),

        (ComposeState::PostReady { .. }, Event::CredentialMissing) => {
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::reply(LOGIN_FIRST_TEXT)))
        }

        (ComposeState::PostReady { .. }, Event::PublishSucceeded { post }) => {
            let text = match &post.url {
                Some(url) => format!("Post Published! ID: {}\n{url}", post.id),
                None => format!("Post Published! ID: {}", post.id),
            };
            Ok(TransitionResult::new(ComposeState::Idle).with_effect(Effect::reply(text)))
        }

        // Draft is kept so /publish can be retried
        (ComposeState::PostReady { .. }, Event::PublishFailed { message }) => {
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::reply(format!(
                "An error occurred: {message}\nYour draft was kept, use /publish to try again."
            ))))
        }

        (state, event) => Err(SequenceError::InvalidTransition {
            state: state.name(),
            event: event.name(),
        }),
    }
}
