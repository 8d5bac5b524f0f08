//! HTTP request handlers

use super::AppState;
use crate::oauth::{CallbackQuery, LoginError};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

pub const LOGGED_IN_CHAT_TEXT: &str = "You're logged in, use /compose to write a post.";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // OAuth redirect target
        .route("/callback", get(oauth_callback))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// OAuth Callback
// ============================================================

async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<String, AppError> {
    let login = state.oauth.complete_login(&query).await?;

    // Best effort: the browser already shows the outcome
    if let Err(e) = state.chat.send_message(login.chat, LOGGED_IN_CHAT_TEXT).await {
        tracing::warn!(user_id = %login.user, error = %e, "Failed to send login notice");
    }

    Ok(login.message)
}

async fn get_version() -> &'static str {
    concat!("blogpost-bot ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    Unauthorized(String),
    BadRequest(String),
    BadGateway(String),
    Internal(String),
}

impl From<LoginError> for AppError {
    fn from(e: LoginError) -> Self {
        let message = e.to_string();
        match e {
            LoginError::InvalidState => AppError::Unauthorized(message),
            LoginError::AuthorizationDenied(_) | LoginError::MissingCode => {
                AppError::BadRequest(message)
            }
            LoginError::TokenExchange(_) => AppError::BadGateway(message),
            LoginError::Storage(_) => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Callback failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, message).into_response()
    }
}
