//! # Remote API layer
//!
//! [`HttpClient`] owns the connection to the MyChordHub REST API and the
//! token-refresh protocol. The services on top of it map one method to one
//! endpoint and return the unwrapped `data` of the response envelope:
//!
//! ```text
//! Stores (AuthStore, SongsStore)
//!          ↓
//! Services (AuthService, SongsService)
//!          ↓
//! HttpClient (bearer token, 401 refresh, error normalization)
//!          ↓
//! MyChordHub REST API  ({base}/api)
//! ```
//!
//! Services never catch errors; every failure reaches the caller as an
//! [`crate::error::ApiError`].

pub mod auth;
pub mod client;
pub mod songs;

pub use auth::AuthService;
pub use client::{ApiRequest, HttpClient, RequestBody};
pub use songs::SongsService;
