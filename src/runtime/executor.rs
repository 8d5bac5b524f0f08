//! Runs state transitions for one inbound message and performs their effects

use super::traits::{BlogPublisher, ChatClient};
use crate::oauth::OAuthFlow;
use crate::session::{ChatId, InboundMessage, UserId, UserSession};
use crate::state_machine::{transition, Effect, Event, PostDraft};
use std::collections::VecDeque;
use std::sync::Arc;

const INTERNAL_ERROR_TEXT: &str = "Something went wrong, please try again.";

/// Shared by every session task; holds no per-user state
pub struct SessionExecutor {
    chat: Arc<dyn ChatClient>,
    oauth: Arc<OAuthFlow>,
    publisher: Arc<dyn BlogPublisher>,
}

impl SessionExecutor {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        oauth: Arc<OAuthFlow>,
        publisher: Arc<dyn BlogPublisher>,
    ) -> Self {
        Self {
            chat,
            oauth,
            publisher,
        }
    }

    /// Handle one inbound message to completion.
    ///
    /// Effect outcomes are fed back through `transition` until nothing is
    /// left to do, so the session is consistent when this returns.
    pub async fn handle(&self, session: &mut UserSession, message: &InboundMessage) {
        let mut queue = VecDeque::from([Event::from_message_text(&message.text)]);

        while let Some(event) = queue.pop_front() {
            let event_name = event.name();
            match transition(&session.state, event) {
                Ok(result) => {
                    if session.state != result.new_state {
                        tracing::debug!(
                            user_id = %message.user,
                            from = session.state.name(),
                            to = result.new_state.name(),
                            event = event_name,
                            "Session transition"
                        );
                    }
                    session.state = result.new_state;
                    for effect in result.effects {
                        if let Some(next) = self.execute_effect(message.user, message.chat, effect).await {
                            queue.push_back(next);
                        }
                    }
                }
                Err(e) if e.is_internal() => {
                    tracing::error!(user_id = %message.user, error = %e, "Invalid session transition");
                    self.reply(message.chat, INTERNAL_ERROR_TEXT).await;
                }
                Err(e) => {
                    tracing::debug!(user_id = %message.user, error = %e, "Out of sequence command");
                    self.reply(message.chat, &e.to_string()).await;
                }
            }
        }
    }

    async fn execute_effect(&self, user: UserId, chat: ChatId, effect: Effect) -> Option<Event> {
        match effect {
            Effect::Reply { text } => {
                self.reply(chat, &text).await;
                None
            }
            Effect::BeginLogin => {
                let link = self.oauth.begin_login(user, chat).await;
                Some(Event::LoginLinkIssued {
                    url: link.url.to_string(),
                })
            }
            Effect::Publish { draft } => Some(self.publish(user, &draft).await),
        }
    }

    async fn publish(&self, user: UserId, draft: &PostDraft) -> Event {
        let Some(credential) = self.oauth.valid_credential(user).await else {
            return Event::CredentialMissing;
        };

        match self.publisher.create_post(&credential.token, draft).await {
            Ok(post) => {
                tracing::info!(user_id = %user, post_id = %post.id, "Published post");
                Event::PublishSucceeded { post }
            }
            Err(e) => {
                tracing::warn!(user_id = %user, kind = e.kind.as_str(), error = %e, "Publish failed");
                Event::PublishFailed { message: e.message }
            }
        }
    }

    async fn reply(&self, chat: ChatId, text: &str) {
        if let Err(e) = self.chat.send_message(chat, text).await {
            tracing::warn!(chat_id = %chat, error = %e, "Failed to send reply");
        }
    }
}
