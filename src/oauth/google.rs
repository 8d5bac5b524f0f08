//! Google token endpoint over reqwest

use super::{OAuthSettings, TokenError, TokenGrant};
use crate::credentials::Credential;
use crate::runtime::TokenEndpoint;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authorization-code and refresh grants against the configured token URL
pub struct GoogleTokenEndpoint {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleTokenEndpoint {
    pub fn new(settings: &OAuthSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            token_url: settings.token_url.to_string(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_uri: settings.redirect_uri.to_string(),
        })
    }

    async fn request_token(
        &self,
        url: &str,
        grant_type: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenGrant, TokenError> {
        let start = Instant::now();
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TokenError::network(format!("Request timeout: {e}"))
                } else {
                    TokenError::network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TokenError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let err = classify_error(status, &body);
            tracing::warn!(
                grant_type,
                status = %status,
                duration_ms = %start.elapsed().as_millis(),
                error = %err,
                "Token request rejected"
            );
            return Err(err);
        }

        let parsed: GoogleTokenResponse = serde_json::from_str(&body)
            .map_err(|e| TokenError::invalid_response(format!("Failed to parse token response: {e}")))?;

        tracing::info!(
            grant_type,
            duration_ms = %start.elapsed().as_millis(),
            "Token request completed"
        );
        Ok(parsed.into())
    }
}

#[async_trait]
impl TokenEndpoint for GoogleTokenEndpoint {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenGrant, TokenError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", code_verifier),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];
        self.request_token(&self.token_url, "authorization_code", &form)
            .await
    }

    async fn refresh(&self, credential: &Credential) -> Result<TokenGrant, TokenError> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .ok_or_else(|| TokenError::rejected("Credential has no refresh token"))?;
        // The stored record says where and as whom it was issued
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", credential.client_id.as_str()),
            ("client_secret", credential.client_secret.as_str()),
        ];
        self.request_token(&credential.token_uri, "refresh_token", &form)
            .await
    }
}

fn classify_error(status: reqwest::StatusCode, body: &str) -> TokenError {
    match serde_json::from_str::<GoogleTokenErrorResponse>(body) {
        Ok(parsed) => {
            let message = match parsed.error_description {
                Some(description) => format!("{}: {description}", parsed.error),
                None => parsed.error,
            };
            TokenError::rejected(message)
        }
        Err(_) if status.is_server_error() => {
            TokenError::network(format!("Server error {status}: {body}"))
        }
        Err(_) => TokenError::rejected(format!("HTTP {status}: {body}")),
    }
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    /// Space-separated
    #[serde(default)]
    scope: Option<String>,
}

impl From<GoogleTokenResponse> for TokenGrant {
    fn from(resp: GoogleTokenResponse) -> Self {
        TokenGrant {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            expires_in: resp.expires_in,
            scopes: resp
                .scope
                .map(|s| s.split_whitespace().map(String::from).collect()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleTokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}
