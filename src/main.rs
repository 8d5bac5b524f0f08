//! Blogpost bot - compose and publish Blogger posts from Telegram
//!
//! A long-polling chat bot driving a per-user composition state machine,
//! with Google `OAuth2` login completed through a small HTTP callback server.

mod api;
mod blogger;
mod config;
mod credentials;
mod oauth;
mod runtime;
mod session;
mod state_machine;
mod telegram;

use api::{create_router, AppState};
use blogger::BloggerClient;
use config::Config;
use credentials::FileCredentialStore;
use oauth::{GoogleTokenEndpoint, OAuthFlow};
use runtime::{Dispatcher, SessionExecutor, SESSION_IDLE_TIMEOUT};
use std::net::SocketAddr;
use std::sync::Arc;
use telegram::TelegramClient;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blogpost_bot=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = Config::from_env()?;
    tracing::debug!(config = ?config, "Loaded configuration");

    let store = Arc::new(FileCredentialStore::open(&config.credentials_dir)?);
    tracing::info!(path = %store.dir().display(), "Opened credential store");

    let tokens = Arc::new(GoogleTokenEndpoint::new(&config.oauth)?);
    let oauth = Arc::new(OAuthFlow::new(config.oauth.clone(), tokens, store));

    let telegram = Arc::new(TelegramClient::new(
        &config.telegram_api_base,
        &config.telegram_bot_token,
    )?);
    let blogger = Arc::new(BloggerClient::new(
        &config.blogger_api_base,
        &config.blog_id,
    )?);

    let me = telegram.get_me().await?;
    tracing::info!(bot_id = me.id, username = ?me.username, "Connected to Telegram");
    let bot_username = me.username;

    let executor = SessionExecutor::new(telegram.clone(), oauth.clone(), blogger);
    let dispatcher = Arc::new(Dispatcher::new(executor, SESSION_IDLE_TIMEOUT));

    // Shutdown on Ctrl-C
    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                return;
            }
            tracing::info!("Shutdown requested");
            shutdown.cancel();
        });
    }

    // Callback server
    let app = create_router(AppState::new(oauth, telegram.clone())).layer(TraceLayer::new_for_http());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.callback_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("OAuth callback server listening on {}", addr);

    let server = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        })
    };

    telegram::run_polling(telegram, dispatcher, bot_username, shutdown.clone()).await;

    // Polling only stops on shutdown; make sure the server follows
    shutdown.cancel();
    server.await??;

    tracing::info!("Bot stopped");
    Ok(())
}
