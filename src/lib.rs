//! MyChordHub client library
//!
//! Client layer for the MyChordHub guitar chord sheet service: an
//! authenticated HTTP client with transparent token refresh, thin services
//! over the REST endpoints, observable stores for the session and the song
//! catalogue, and a router that guards pages by session state.
//!
//! # Modules
//!
//! - `cli` - Command implementations for the `chordhub` binary
//! - `config` - Environment-driven configuration
//! - `error` - The normalized [`error::ApiError`] and storage errors
//! - `logging` - `tracing` subscriber setup
//! - `management` - Persisted session tokens
//! - `router` - Route table, resolution and the auth guard
//! - `service` - HTTP client and REST services
//! - `store` - Session and song state with their actions
//! - `types` - Wire types and query parameters
//! - `utils` - Rating math, table rows and other helpers
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use chordhub::{
//!     config::ClientConfig,
//!     management::TokenManager,
//!     service::{HttpClient, SongsService},
//!     store::SongsStore,
//! };
//!
//! # async fn run() -> chordhub::error::ApiResult<()> {
//! let tokens = Arc::new(TokenManager::in_memory());
//! let client = Arc::new(HttpClient::new(&ClientConfig::default(), Arc::clone(&tokens))?);
//! let songs = SongsStore::new(SongsService::new(Arc::clone(&client)), 20);
//! songs.fetch_songs(Default::default()).await?;
//! println!("{} songs", songs.state().songs.len());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod management;
pub mod router;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;

/// Prints an informational message with a blue bullet point.
///
/// Accepts the same arguments as `println!`.
///
/// ```
/// info!("Fetching page {}", page);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// ```
/// success!("Logged in as {}", user.display_name);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits with code 1.
///
/// Only for failures that end the command. Code after the macro does not run.
///
/// ```
/// error!("Cannot load song {}: {}", id, err);
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning with a yellow exclamation mark.
///
/// ```
/// warning!("Session expired, please log in again");
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
