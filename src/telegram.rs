//! Telegram Bot API transport
//!
//! Long-polls `getUpdates` for inbound messages and sends replies with
//! `sendMessage`.

mod client;
mod polling;
mod types;

pub use client::{TelegramClient, DEFAULT_API_BASE};
pub use polling::run_polling;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Telegram request failed: {0}")]
    Transport(String),
    #[error("Telegram API error: {0}")]
    Api(String),
    #[error("Failed to parse Telegram response: {0}")]
    Parse(String),
}
