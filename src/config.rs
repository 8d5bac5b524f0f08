//! Runtime configuration from the environment

use crate::oauth::{OAuthSettings, DEFAULT_AUTH_URL, DEFAULT_SCOPE, DEFAULT_TOKEN_URL};
use reqwest::Url;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_CALLBACK_PORT: u16 = 5000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Everything the bot needs to start. Secrets come only from here.
#[derive(Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub telegram_api_base: String,
    pub oauth: OAuthSettings,
    pub blog_id: String,
    pub blogger_api_base: String,
    pub credentials_dir: PathBuf,
    pub callback_port: u16,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("telegram_bot_token", &"<redacted>")
            .field("telegram_api_base", &self.telegram_api_base)
            .field("oauth", &self.oauth)
            .field("blog_id", &self.blog_id)
            .field("blogger_api_base", &self.blogger_api_base)
            .field("credentials_dir", &self.credentials_dir)
            .field("callback_port", &self.callback_port)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let scopes = match get("SCOPES") {
            Some(raw) => parse_scopes(&raw),
            None => vec![DEFAULT_SCOPE.to_string()],
        };
        if scopes.is_empty() {
            return Err(ConfigError::Invalid {
                key: "SCOPES",
                reason: "no scopes listed".to_string(),
            });
        }

        let oauth = OAuthSettings {
            client_id: require("GOOGLE_CLIENT_ID")?,
            client_secret: require("GOOGLE_CLIENT_SECRET")?,
            auth_url: parse_url(
                "GOOGLE_AUTH_URL",
                &get("GOOGLE_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            )?,
            token_url: parse_url(
                "GOOGLE_TOKEN_URL",
                &get("GOOGLE_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            )?,
            redirect_uri: parse_url("GOOGLE_REDIRECT_URI", &require("GOOGLE_REDIRECT_URI")?)?,
            scopes,
        };

        let callback_port = match get("CALLBACK_PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "CALLBACK_PORT",
                reason: format!("{e}"),
            })?,
            None => DEFAULT_CALLBACK_PORT,
        };

        let credentials_dir = get("USER_CREDENTIALS_DIR").map_or_else(
            || {
                let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".blogpost-bot").join("credentials")
            },
            PathBuf::from,
        );

        Ok(Self {
            telegram_bot_token: require("TELEGRAM_BOT_TOKEN")?,
            telegram_api_base: get("TELEGRAM_API_BASE")
                .unwrap_or_else(|| crate::telegram::DEFAULT_API_BASE.to_string()),
            oauth,
            blog_id: require("BLOG_ID")?,
            blogger_api_base: get("BLOGGER_API_BASE")
                .unwrap_or_else(|| crate::blogger::DEFAULT_API_BASE.to_string()),
            credentials_dir,
            callback_port,
        })
    }
}

fn parse_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    raw.trim().parse::<Url>().map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

/// Space or comma separated
fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
