//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor and the login flow with mock
//! implementations.

use crate::blogger::{PublishError, PublishedPost};
use crate::credentials::{Credential, CredentialError};
use crate::oauth::{TokenError, TokenGrant};
use crate::session::{ChatId, UserId};
use crate::state_machine::PostDraft;
use crate::telegram::TelegramError;
use async_trait::async_trait;

/// Outbound side of the chat transport
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a plain-text message to a chat
    async fn send_message(&self, chat: ChatId, text: &str) -> Result<(), TelegramError>;
}

/// Durable credential records, one per user
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the stored credential. Missing or unreadable records are `None`.
    async fn load(&self, user: UserId) -> Option<Credential>;

    /// Replace the stored credential
    async fn save(&self, user: UserId, credential: &Credential) -> Result<(), CredentialError>;
}

/// `OAuth2` token endpoint
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange an authorization code (with its PKCE verifier) for tokens
    async fn exchange_code(&self, code: &str, code_verifier: &str)
        -> Result<TokenGrant, TokenError>;

    /// Obtain a fresh access token using the credential's refresh token
    async fn refresh(&self, credential: &Credential) -> Result<TokenGrant, TokenError>;
}

/// Blog publishing service
#[async_trait]
pub trait BlogPublisher: Send + Sync {
    /// Create a post from the draft on the configured blog
    async fn create_post(
        &self,
        access_token: &str,
        draft: &PostDraft,
    ) -> Result<PublishedPost, PublishError>;
}
