//! Error types shared by the HTTP client, the services and the stores.
//!
//! Every failure that leaves the HTTP layer is normalized into a single
//! [`ApiError`] shape: a machine readable `code`, a human readable `message`
//! and optional per-field `details` as sent by the server.

use std::{collections::HashMap, io};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// No response was received from the server.
pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
/// The server failed without declaring an error code.
pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";
/// A response body could not be decoded.
pub const PARSE_ERROR: &str = "PARSE_ERROR";
/// Local token persistence failed.
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";

const NETWORK_ERROR_MESSAGE: &str = "Network connection failed, please check your connection";
const SERVER_ERROR_MESSAGE: &str = "Server error";

/// Field level validation messages keyed by field name.
pub type ErrorDetails = HashMap<String, Vec<String>>;

/// Normalized API failure.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
    /// HTTP status of the failed response, absent for network and local failures.
    #[serde(skip)]
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            status: None,
        }
    }

    pub fn network() -> Self {
        Self::new(NETWORK_ERROR, NETWORK_ERROR_MESSAGE)
    }

    pub fn parse(err: impl std::fmt::Display) -> Self {
        Self::new(PARSE_ERROR, format!("Failed to decode server response: {err}"))
    }

    /// Builds the error for a failed HTTP response from the optional error
    /// object found in its envelope.
    pub fn from_envelope(status: u16, body: Option<ApiErrorBody>) -> Self {
        let body = body.unwrap_or_default();
        Self {
            code: body
                .code
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            message: body
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| SERVER_ERROR_MESSAGE.to_string()),
            details: body.details,
            status: Some(status),
        }
    }

    pub fn is_network(&self) -> bool {
        self.code == NETWORK_ERROR
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }
}

/// The `error` object of a response envelope. Every field is optional on the
/// wire; missing values fall back to [`UNKNOWN_ERROR`] and a generic message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<ErrorDetails>,
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::parse(err)
        } else {
            ApiError::network()
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::parse(err)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::new(STORAGE_ERROR, err.to_string())
    }
}

/// Result alias used by every remote call.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failure while reading or writing persisted tokens.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("token storage io failed: {0}")]
    Io(#[from] io::Error),

    #[error("token storage is corrupt: {0}")]
    Serde(#[from] serde_json::Error),
}
