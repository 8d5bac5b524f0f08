//! Long-polling loop feeding the dispatcher

use super::TelegramClient;
use crate::runtime::Dispatcher;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a failed poll before trying again
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Poll until `shutdown` is cancelled.
///
/// Updates are acknowledged (via the next offset) as soon as they are
/// handed to the dispatcher. Commands addressed to a bot other than
/// `bot_username` are skipped.
pub async fn run_polling(
    client: Arc<TelegramClient>,
    dispatcher: Arc<Dispatcher>,
    bot_username: Option<String>,
    shutdown: CancellationToken,
) {
    tracing::info!(username = ?bot_username, "Polling Telegram for updates");
    let mut offset = None;

    loop {
        let result = tokio::select! {
            () = shutdown.cancelled() => break,
            result = client.get_updates(offset, POLL_TIMEOUT_SECS) => result,
        };

        match result {
            Ok(updates) => {
                for update in updates {
                    offset = Some(update.update_id + 1);
                    if let Some(message) = update.into_inbound(bot_username.as_deref()) {
                        tracing::debug!(user_id = %message.user, chat_id = %message.chat, "Inbound message");
                        dispatcher.dispatch(message).await;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "getUpdates failed");
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(ERROR_BACKOFF) => {}
                }
            }
        }
    }

    tracing::info!("Telegram polling stopped");
}
