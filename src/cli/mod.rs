//! # CLI Module
//!
//! Command implementations for the `chordhub` binary. Every command runs
//! against an [`App`], which wires the token store, the HTTP client, both
//! stores and the router together for one invocation:
//!
//! ```text
//! CLI command
//!     ↓
//! Router (page title + auth guard)
//!     ↓
//! Stores (AuthStore, SongsStore)
//!     ↓
//! Services → HttpClient → MyChordHub API
//! ```
//!
//! A command first navigates to the page it corresponds to in the web client
//! (`songs create` opens `/edit`, `whoami` opens `/profile/overview`, ...).
//! When the guard redirects, the command stops with a hint instead of
//! calling the API.
//!
//! ## Usage
//!
//! ```bash
//! chordhub login you@example.com
//! chordhub songs search wonderwall --genre rock
//! chordhub songs show <id> --content
//! chordhub songs rate <id> 5 --comment "Great arrangement"
//! ```

use std::sync::Arc;

use colored::Colorize;

use crate::{
    config::ClientConfig,
    error::{ApiError, ApiResult},
    management::TokenManager,
    router::{HOME, LOGIN, Router},
    service::{AuthService, HttpClient, SongsService},
    store::{AuthStore, SongsStore},
    warning,
};

mod auth;
mod songs;

pub use auth::{
    change_password, delete_account, forgot_password, login, logout, register,
    resend_verification, reset_password, update_profile, upload_avatar, verify_email, whoami,
};
pub use songs::{
    create_song, delete_song, duplicate_song, export_song, list_songs, my_songs, rate_song,
    show_ratings, show_song, show_song_content, song_shelf, suggest, update_song,
    ListOptions, Shelf, SongFields,
};

/// Everything a command needs, built once per invocation.
#[derive(Debug)]
pub struct App {
    pub config: ClientConfig,
    pub client: Arc<HttpClient>,
    pub auth: AuthStore,
    pub songs: SongsStore,
    pub router: Router,
    had_session: bool,
}

impl App {
    /// Loads the stored session, builds the client and stores, and restores
    /// the signed-in user when a token is present.
    pub async fn init(config: ClientConfig) -> ApiResult<Self> {
        let tokens = match &config.token_path {
            Some(path) => TokenManager::load(path).await?,
            None => TokenManager::in_memory(),
        };
        let app = Self::with_tokens(config, Arc::new(tokens))?;
        app.auth.initialize_auth().await;
        Ok(app)
    }

    pub fn with_tokens(config: ClientConfig, tokens: Arc<TokenManager>) -> ApiResult<Self> {
        let had_session = tokens.access_token().is_some() || tokens.refresh_token().is_some();
        let client = Arc::new(HttpClient::new(&config, Arc::clone(&tokens))?);
        let auth = AuthStore::new(AuthService::new(Arc::clone(&client)), tokens);
        let songs = SongsStore::new(SongsService::new(Arc::clone(&client)), config.page_size);

        Ok(Self {
            config,
            client,
            auth,
            songs,
            router: Router::new(),
            had_session,
        })
    }

    /// Navigates to `location` with the current session. Returns `false`, after
    /// telling the user why, when the guard sent navigation elsewhere.
    pub fn open(&mut self, location: &str) -> bool {
        let is_authenticated = self.auth.is_authenticated();
        let navigation = self.router.navigate(location, is_authenticated);
        tracing::debug!(title = self.router.document_title(), path = %navigation.route.path, "page opened");

        let Some(from) = navigation.redirected_from else {
            return true;
        };

        match navigation.route.name {
            LOGIN => warning!(
                "{} requires an account. Run `{}` first.",
                from,
                "chordhub login".bold()
            ),
            HOME => match self.auth.user() {
                Some(user) => warning!("Already logged in as {}.", user.email),
                None => warning!("Already logged in."),
            },
            other => warning!("{} is not available ({}).", from, other),
        }
        false
    }

    /// Consumes the pending login redirect. True only when a session stored
    /// before this invocation was dropped; a rejected login has none to lose.
    pub fn session_expired(&self) -> bool {
        self.client.take_redirect().is_some() && self.had_session
    }

    /// Tells the user when the session was dropped during the command.
    pub fn report_session(&self) {
        if self.session_expired() {
            warning!(
                "Session expired. Run `{}` to sign in again.",
                "chordhub login".bold()
            );
        }
    }

    /// Reports a failed command and exits.
    pub fn fail(&self, context: &str, err: ApiError) -> ! {
        self.report_session();
        crate::error!("{}: {}", context, err.message)
    }
}
