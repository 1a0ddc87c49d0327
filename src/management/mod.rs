//! Local persistence for session credentials.

mod auth;

pub use auth::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, StoredTokens, TokenManager};
