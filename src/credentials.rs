//! OAuth credential records and their persistence

mod file_store;

pub use file_store::FileCredentialStore;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Credentials are treated as expired this many seconds before the provider says so
const EXPIRY_SKEW_SECS: i64 = 60;

/// Stored OAuth token bundle for one user.
///
/// Field names match the JSON layout Google's client libraries write, so
/// existing credential files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Access token expiry. `None` means unknown and is treated as valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| now + Duration::seconds(EXPIRY_SKEW_SECS) >= expiry)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to read credential file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Corrupt credential file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to write credential file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to encode credential: {0}")]
    Encode(#[source] serde_json::Error),
}
