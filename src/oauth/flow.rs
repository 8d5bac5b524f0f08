//! Login orchestration: authorization URLs, callbacks and refresh

use super::{pkce, LoginError, OAuthSettings, TokenGrant};
use crate::credentials::Credential;
use crate::runtime::{CredentialStore, TokenEndpoint};
use crate::session::{ChatId, UserId};
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// How long an issued authorization URL stays usable
const PENDING_LOGIN_TTL: Duration = Duration::from_secs(600);

pub const LOGIN_SUCCESS_TEXT: &str =
    "Authentication successful, please go back to the Telegram bot";

/// Query string of the OAuth redirect
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
    /// Set by the provider when the user declines consent
    pub error: Option<String>,
}

/// Authorization URL handed to the user
#[derive(Debug, Clone)]
pub struct LoginLink {
    pub url: Url,
    #[cfg(test)]
    pub state: String,
}

/// Outcome of a successful callback
#[derive(Debug, Clone)]
pub struct CompletedLogin {
    pub user: UserId,
    pub chat: ChatId,
    pub message: String,
}

#[derive(Debug)]
struct PendingLogin {
    user: UserId,
    chat: ChatId,
    code_verifier: String,
    issued_at: Instant,
}

impl PendingLogin {
    fn is_expired(&self) -> bool {
        self.issued_at.elapsed() > PENDING_LOGIN_TTL
    }
}

/// Issues login links, completes callbacks and hands out usable credentials
pub struct OAuthFlow {
    settings: OAuthSettings,
    tokens: Arc<dyn TokenEndpoint>,
    store: Arc<dyn CredentialStore>,
    /// Outstanding requests keyed by `state`; at most one per user
    pending: Mutex<HashMap<String, PendingLogin>>,
}

impl OAuthFlow {
    pub fn new(
        settings: OAuthSettings,
        tokens: Arc<dyn TokenEndpoint>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            settings,
            tokens,
            store,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Start a login for `user`. Any earlier link for the same user stops
    /// working.
    pub async fn begin_login(&self, user: UserId, chat: ChatId) -> LoginLink {
        let state = pkce::generate_state();
        let code_verifier = pkce::generate_code_verifier();
        let url = self.authorization_url(&state, &pkce::code_challenge(&code_verifier));

        let mut pending = self.pending.lock().await;
        pending.retain(|_, p| p.user != user && !p.is_expired());
        pending.insert(
            state.clone(),
            PendingLogin {
                user,
                chat,
                code_verifier,
                issued_at: Instant::now(),
            },
        );

        tracing::info!(user_id = %user, pending = pending.len(), "Issued login link");
        LoginLink {
            url,
            #[cfg(test)]
            state,
        }
    }

    fn authorization_url(&self, state: &str, code_challenge: &str) -> Url {
        let mut url = self.settings.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", self.settings.redirect_uri.as_str())
            .append_pair("scope", &self.settings.scopes.join(" "))
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("include_granted_scopes", "true")
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256");
        url
    }

    /// Finish a login from the callback query.
    ///
    /// The `state` is checked before anything else and is single-use: it is
    /// consumed even when the exchange that follows fails.
    pub async fn complete_login(&self, query: &CallbackQuery) -> Result<CompletedLogin, LoginError> {
        let state = query.state.as_deref().ok_or(LoginError::InvalidState)?;
        let Some(pending) = self.take_pending(state).await else {
            tracing::warn!("Rejected callback with unknown state");
            return Err(LoginError::InvalidState);
        };

        if let Some(error) = &query.error {
            tracing::info!(user_id = %pending.user, error = %error, "Authorization denied");
            return Err(LoginError::AuthorizationDenied(error.clone()));
        }

        let code = query
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(LoginError::MissingCode)?;

        let grant = self
            .tokens
            .exchange_code(code, &pending.code_verifier)
            .await
            .inspect_err(|e| {
                tracing::warn!(user_id = %pending.user, error = %e, "Token exchange failed");
            })?;

        let credential = self.credential_from_grant(grant);
        self.store.save(pending.user, &credential).await?;

        tracing::info!(user_id = %pending.user, "Login completed");
        Ok(CompletedLogin {
            user: pending.user,
            chat: pending.chat,
            message: LOGIN_SUCCESS_TEXT.to_string(),
        })
    }

    async fn take_pending(&self, state: &str) -> Option<PendingLogin> {
        let mut pending = self.pending.lock().await;
        let entry = pending.remove(state)?;
        (!entry.is_expired()).then_some(entry)
    }

    fn credential_from_grant(&self, grant: TokenGrant) -> Credential {
        Credential {
            expiry: expiry_from(grant.expires_in),
            token: grant.access_token,
            refresh_token: grant.refresh_token,
            token_uri: self.settings.token_url.to_string(),
            client_id: self.settings.client_id.clone(),
            client_secret: self.settings.client_secret.clone(),
            scopes: grant.scopes.unwrap_or_else(|| self.settings.scopes.clone()),
        }
    }

    /// The user's credential, refreshed first if it has expired.
    ///
    /// `None` means the user has to `/login` again.
    pub async fn valid_credential(&self, user: UserId) -> Option<Credential> {
        let credential = self.store.load(user).await?;
        if !credential.is_expired() {
            return Some(credential);
        }

        if !credential.can_refresh() {
            tracing::info!(user_id = %user, "Credential expired without refresh token");
            return None;
        }

        let grant = match self.tokens.refresh(&credential).await {
            Ok(grant) => grant,
            Err(e) => {
                tracing::warn!(user_id = %user, error = %e, "Credential refresh failed");
                return None;
            }
        };

        let refreshed = Credential {
            expiry: expiry_from(grant.expires_in),
            token: grant.access_token,
            // Providers usually omit the refresh token on refresh
            refresh_token: grant.refresh_token.or(credential.refresh_token),
            scopes: grant.scopes.unwrap_or(credential.scopes),
            ..credential
        };

        // Still usable for this request even if persisting fails
        if let Err(e) = self.store.save(user, &refreshed).await {
            tracing::warn!(user_id = %user, error = %e, "Failed to persist refreshed credential");
        }
        tracing::info!(user_id = %user, "Credential refreshed");
        Some(refreshed)
    }

    #[cfg(test)]
    pub(crate) async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

fn expiry_from(expires_in: Option<u64>) -> Option<chrono::DateTime<Utc>> {
    let secs = i64::try_from(expires_in?).ok()?;
    Some(Utc::now() + ChronoDuration::seconds(secs))
}
