use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// The two persisted credentials. Field names double as the storage keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Holds the session tokens in memory and mirrors every change to a JSON file
/// when a path is configured.
///
/// Reads are synchronous so the HTTP client and the stores can check the
/// session without awaiting; writes update memory first and then persist.
#[derive(Debug)]
pub struct TokenManager {
    path: Option<PathBuf>,
    tokens: RwLock<StoredTokens>,
}

impl TokenManager {
    pub fn new(path: Option<PathBuf>, tokens: StoredTokens) -> Self {
        TokenManager {
            path,
            tokens: RwLock::new(tokens),
        }
    }

    /// A manager that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self::new(None, StoredTokens::default())
    }

    /// Loads tokens from `path`. A missing file is an empty session.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let tokens = match async_fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => StoredTokens::default(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => StoredTokens::default(),
            Err(e) => return Err(StorageError::Io(e)),
        };
        Ok(Self::new(Some(path), tokens))
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("chordhub/cache/token.json");
        path
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token
    }

    pub fn current(&self) -> StoredTokens {
        self.read()
    }

    pub async fn set_tokens(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Result<(), StorageError> {
        let snapshot = {
            let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
            tokens.access_token = Some(access_token.into());
            tokens.refresh_token = Some(refresh_token.into());
            tokens.clone()
        };
        self.persist(&snapshot).await
    }

    /// Replaces the access token after a refresh, keeping the refresh token.
    pub async fn set_access_token(&self, access_token: impl Into<String>) -> Result<(), StorageError> {
        let snapshot = {
            let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
            tokens.access_token = Some(access_token.into());
            tokens.clone()
        };
        self.persist(&snapshot).await
    }

    /// Removes both tokens from memory and storage.
    pub async fn clear(&self) -> Result<(), StorageError> {
        {
            let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
            *tokens = StoredTokens::default();
        }
        self.persist(&StoredTokens::default()).await
    }

    fn read(&self) -> StoredTokens {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn persist(&self, tokens: &StoredTokens) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if tokens.access_token.is_none() && tokens.refresh_token.is_none() {
            return match async_fs::remove_file(path).await {
                Err(e) if e.kind() != ErrorKind::NotFound => Err(StorageError::Io(e)),
                _ => Ok(()),
            };
        }

        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(tokens)?;
        async_fs::write(path, json).await?;
        Ok(())
    }
}
