//! Blogger v3 publishing client

mod client;
mod error;

pub use client::{BloggerClient, DEFAULT_API_BASE};
pub use error::PublishError;

use serde::{Deserialize, Serialize};

/// Post created on the blog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPost {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}
