//! Bot API HTTP client

use super::types::{ApiResponse, GetUpdatesRequest, SendMessageRequest, Update, User};
use super::TelegramError;
use crate::runtime::ChatClient;
use crate::session::ChatId;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Extra time allowed on top of the long-poll timeout before giving up
const POLL_MARGIN: Duration = Duration::from_secs(10);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TelegramClient {
    client: Client,
    /// `{api_base}/bot{token}`. Never logged.
    bot_url: String,
}

impl TelegramClient {
    pub fn new(api_base: &str, bot_token: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            bot_url: format!("{}/bot{bot_token}", api_base.trim_end_matches('/')),
        })
    }

    /// The bot's own account. Fails fast on a bad token.
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &serde_json::json!({}), REQUEST_TIMEOUT).await
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: &["message"],
        };
        let timeout = Duration::from_secs(timeout_secs) + POLL_MARGIN;
        self.call("getUpdates", &request, timeout).await
    }

    async fn call<B, T>(&self, method: &str, body: &B, timeout: Duration) -> Result<T, TelegramError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/{method}", self.bot_url))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            // The URL carries the bot token
            .map_err(|e| TelegramError::Transport(e.without_url().to_string()))?;

        let text = response
            .text()
            .await
            .map_err(|e| TelegramError::Transport(e.without_url().to_string()))?;

        let envelope: ApiResponse<T> =
            serde_json::from_str(&text).map_err(|e| TelegramError::Parse(e.to_string()))?;

        match envelope {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(TelegramError::Api(
                description.unwrap_or_else(|| format!("{method} returned no result")),
            )),
        }
    }
}

#[async_trait]
impl ChatClient for TelegramClient {
    async fn send_message(&self, chat: ChatId, text: &str) -> Result<(), TelegramError> {
        let request = SendMessageRequest {
            chat_id: chat.0,
            text,
        };
        // Result is the sent Message; only success matters here
        let _: serde_json::Value = self.call("sendMessage", &request, REQUEST_TIMEOUT).await?;
        Ok(())
    }
}
