//! `OAuth2` authorization-code flow against Google
//!
//! `/login` produces an authorization URL carrying a random `state`. The
//! browser comes back to the callback endpoint with that `state` and a
//! code, which is exchanged for tokens and stored for the user who asked.

mod flow;
mod google;
mod pkce;

pub use flow::{CallbackQuery, OAuthFlow};
#[cfg(test)]
pub use flow::LOGIN_SUCCESS_TEXT;
pub use google::GoogleTokenEndpoint;

use crate::credentials::CredentialError;
use reqwest::Url;
use thiserror::Error;

pub const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/blogger";

/// Client registration and endpoints for the OAuth provider
#[derive(Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: Url,
    pub token_url: Url,
    pub redirect_uri: Url,
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_url", &self.auth_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Failures completing a login from the callback
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Invalid state parameter")]
    InvalidState,
    #[error("Authorization was denied: {0}")]
    AuthorizationDenied(String),
    #[error("Missing authorization code")]
    MissingCode,
    #[error("Token exchange failed: {0}")]
    TokenExchange(#[from] TokenError),
    #[error("Failed to store credentials: {0}")]
    Storage(#[from] CredentialError),
}

/// Tokens issued by the token endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds
    pub expires_in: Option<u64>,
    /// Granted scopes, when the provider reports them
    pub scopes: Option<Vec<String>>,
}

/// Token endpoint failure with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TokenError {
    pub kind: TokenErrorKind,
    pub message: String,
}

impl TokenError {
    pub fn new(kind: TokenErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(TokenErrorKind::Rejected, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TokenErrorKind::Network, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(TokenErrorKind::InvalidResponse, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenErrorKind {
    /// Provider refused the grant (expired code, revoked client, bad redirect)
    Rejected,
    /// Timeouts and connection failures
    Network,
    /// Response was not a token response
    InvalidResponse,
}
