//! HTTP endpoint receiving the OAuth redirect

mod handlers;

pub use handlers::create_router;

use crate::oauth::OAuthFlow;
use crate::runtime::ChatClient;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub oauth: Arc<OAuthFlow>,
    /// Used to tell the user in chat that their login went through
    pub chat: Arc<dyn ChatClient>,
}

impl AppState {
    pub fn new(oauth: Arc<OAuthFlow>, chat: Arc<dyn ChatClient>) -> Self {
        Self { oauth, chat }
    }
}
