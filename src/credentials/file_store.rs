//! One JSON file per user under a configured directory

use super::{Credential, CredentialError};
use crate::runtime::CredentialStore;
use crate::session::UserId;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Credential store writing `<dir>/<user_id>.json`
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    /// Use `dir`, creating it if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| CredentialError::Write {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user: UserId) -> PathBuf {
        self.dir.join(format!("{user}.json"))
    }

    /// Read the record, distinguishing "absent" from "unreadable"
    pub async fn read_record(&self, user: UserId) -> Result<Option<Credential>, CredentialError> {
        let path = self.path_for(user);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CredentialError::Read { path, source }),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| CredentialError::Corrupt { path, source })
    }

    /// Write to a temp file in the same directory, then rename over the
    /// target so readers see either the old record or the new one.
    async fn write_record(&self, user: UserId, credential: &Credential) -> Result<(), CredentialError> {
        let body = serde_json::to_vec_pretty(credential).map_err(CredentialError::Encode)?;
        let target = self.path_for(user);
        let tmp = self
            .dir
            .join(format!(".{user}.json.{}.tmp", uuid::Uuid::new_v4()));

        if let Err(source) = write_private(&tmp, &body).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CredentialError::Write { path: tmp, source });
        }

        if let Err(source) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CredentialError::Write {
                path: target,
                source,
            });
        }

        Ok(())
    }
}

/// Create `path` readable only by the owner and flush it to disk
async fn write_private(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(body).await?;
    file.sync_all().await
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self, user: UserId) -> Option<Credential> {
        match self.read_record(user).await {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(user_id = %user, error = %e, "Ignoring unreadable credential");
                None
            }
        }
    }

    async fn save(&self, user: UserId, credential: &Credential) -> Result<(), CredentialError> {
        self.write_record(user, credential).await?;
        tracing::info!(user_id = %user, "Credential saved");
        Ok(())
    }
}
