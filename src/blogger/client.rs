//! Blogger REST implementation of [`BlogPublisher`]

use super::{PublishError, PublishedPost};
use crate::runtime::BlogPublisher;
use crate::state_machine::PostDraft;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/blogger/v3";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for `POST /blogs/{blogId}/posts/`
pub struct BloggerClient {
    client: Client,
    posts_url: String,
    blog_id: String,
}

impl BloggerClient {
    pub fn new(api_base: &str, blog_id: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            posts_url: format!("{}/blogs/{blog_id}/posts/", api_base.trim_end_matches('/')),
            blog_id: blog_id.to_string(),
        })
    }

    fn classify_error(status: reqwest::StatusCode, body: &str) -> PublishError {
        let message = google_error_message(body).unwrap_or_else(|| body.to_string());
        match status.as_u16() {
            401 | 403 => PublishError::auth(format!("Authentication failed: {message}")),
            429 => PublishError::rate_limit(format!("Quota exceeded: {message}")),
            400 | 404 => PublishError::invalid_request(format!("Invalid request: {message}")),
            500..=599 => PublishError::server_error(format!("Server error: {message}")),
            _ => PublishError::unknown(format!("HTTP {status}: {message}")),
        }
    }
}

#[async_trait]
impl BlogPublisher for BloggerClient {
    async fn create_post(
        &self,
        access_token: &str,
        draft: &PostDraft,
    ) -> Result<PublishedPost, PublishError> {
        let start = Instant::now();
        let request = BloggerPostRequest {
            kind: "blogger#post",
            title: &draft.title,
            content: &draft.content,
        };

        let response = self
            .client
            .post(&self.posts_url)
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PublishError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    PublishError::network(format!("Connection failed: {e}"))
                } else {
                    PublishError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PublishError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let err = Self::classify_error(status, &body);
            tracing::warn!(
                blog_id = %self.blog_id,
                status = %status,
                kind = err.kind.as_str(),
                duration_ms = %start.elapsed().as_millis(),
                "Blogger rejected post"
            );
            return Err(err);
        }

        let post: BloggerPostResponse = serde_json::from_str(&body).map_err(|e| {
            PublishError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        tracing::info!(
            blog_id = %self.blog_id,
            post_id = %post.id,
            duration_ms = %start.elapsed().as_millis(),
            "Post published"
        );

        Ok(PublishedPost {
            id: post.id,
            url: post.url,
        })
    }
}

/// Pull `error.message` out of a Google API error body
fn google_error_message(body: &str) -> Option<String> {
    let parsed: GoogleErrorBody = serde_json::from_str(body).ok()?;
    Some(parsed.error.message)
}

// Blogger API types

#[derive(Debug, Serialize)]
struct BloggerPostRequest<'a> {
    kind: &'static str,
    title: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct BloggerPostResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    message: String,
}
