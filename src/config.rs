//! Configuration management for chordhub.
//!
//! Values come from environment variables, optionally seeded from a `.env`
//! file in the local data directory, with defaults for everything:
//!
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults

use std::{env, path::PathBuf, time::Duration};

use crate::management::TokenManager;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Loads environment variables from `chordhub/.env` in the local data
/// directory.
///
/// The directory is created when missing. A missing `.env` file is not an
/// error: every setting has a default.
///
/// The file is looked up in:
/// - Linux: `~/.local/share/chordhub/.env`
/// - macOS: `~/Library/Application Support/chordhub/.env`
/// - Windows: `%LOCALAPPDATA%/chordhub/.env`
pub async fn load_env() -> Result<(), String> {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("chordhub/.env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Base URL of the MyChordHub server, without the `/api` suffix.
///
/// Reads `CHORDHUB_API_URL`, defaulting to `http://localhost:8000`.
pub fn api_url() -> String {
    env::var("CHORDHUB_API_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

/// Request timeout from `CHORDHUB_TIMEOUT_SECS`, 10 seconds by default.
pub fn request_timeout() -> Duration {
    let secs = env::var("CHORDHUB_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

/// Songs per page from `CHORDHUB_PAGE_SIZE`, 20 by default.
pub fn page_size() -> u32 {
    env::var("CHORDHUB_PAGE_SIZE")
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE)
}

/// Token file from `CHORDHUB_TOKEN_PATH`, or the cache file in the data directory.
pub fn token_path() -> PathBuf {
    env::var("CHORDHUB_TOKEN_PATH")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(TokenManager::default_path)
}

/// Everything needed to build a client, gathered once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub page_size: u32,
    pub token_path: Option<PathBuf>,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: api_url(),
            timeout: request_timeout(),
            page_size: page_size(),
            token_path: Some(token_path()),
        }
    }

    /// Configuration pointing at `api_url` with in-memory tokens.
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            page_size: DEFAULT_PAGE_SIZE,
            token_path: None,
        }
    }

    /// The prefix every endpoint path is appended to.
    pub fn api_base(&self) -> String {
        format!("{}/api", self.api_url.trim_end_matches('/'))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::with_api_url(DEFAULT_API_URL)
    }
}
