//! # Client-side state
//!
//! Stores own observable state and the actions that change it. Each store
//! keeps its state in a [`tokio::sync::watch`] channel: actions mutate it with
//! `send_modify` after the awaited service call resolves, and observers
//! receive a fresh snapshot through [`watch::Receiver`].
//!
//! Every action that performs a request follows the same protocol:
//!
//! 1. `is_loading` is set and the previous `error` is cleared
//! 2. the service call is awaited
//! 3. the result is applied, or `error` receives a message
//! 4. `is_loading` is cleared, whatever the outcome
//!
//! Steps 1 and 4 are handled by [`LoadingGuard`].

use tokio::sync::watch;

use crate::error::ApiError;

pub mod auth;
pub mod songs;

pub use auth::{AuthState, AuthStatus, AuthStore};
pub use songs::{SongsState, SongsStore};

/// State that carries a loading flag and a last error message.
pub trait Loading {
    fn set_loading(&mut self, loading: bool);
    fn set_error(&mut self, error: Option<String>);
}

/// Marks a state as loading for as long as the guard lives.
///
/// Dropping the guard clears `is_loading`, including on early returns
/// through `?`.
pub struct LoadingGuard<'a, S: Loading> {
    state: &'a watch::Sender<S>,
}

impl<'a, S: Loading> LoadingGuard<'a, S> {
    pub fn begin(state: &'a watch::Sender<S>) -> Self {
        state.send_modify(|s| {
            s.set_loading(true);
            s.set_error(None);
        });
        Self { state }
    }

    /// Records the failure message and hands the error back for propagation.
    pub fn fail(&self, err: ApiError, fallback: &str) -> ApiError {
        record_error(self.state, &err, fallback);
        err
    }
}

impl<S: Loading> Drop for LoadingGuard<'_, S> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.set_loading(false));
    }
}

/// The server's message when it sent one, the action's default otherwise.
pub fn error_message(err: &ApiError, fallback: &str) -> String {
    if err.message.trim().is_empty() {
        fallback.to_string()
    } else {
        err.message.clone()
    }
}

pub(crate) fn record_error<S: Loading>(state: &watch::Sender<S>, err: &ApiError, fallback: &str) {
    tracing::debug!(code = %err.code, "store action failed");
    let message = error_message(err, fallback);
    state.send_modify(|s| s.set_error(Some(message)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Probe {
        loading: bool,
        error: Option<String>,
    }

    impl Loading for Probe {
        fn set_loading(&mut self, loading: bool) {
            self.loading = loading;
        }

        fn set_error(&mut self, error: Option<String>) {
            self.error = error;
        }
    }

    #[test]
    fn test_guard_clears_loading_on_drop() {
        let (state, _) = watch::channel(Probe {
            loading: false,
            error: Some("old".to_string()),
        });

        {
            let _guard = LoadingGuard::begin(&state);
            assert!(state.borrow().loading);
            assert!(state.borrow().error.is_none());
        }

        assert!(!state.borrow().loading);
    }

    #[test]
    fn test_fail_keeps_error_after_drop() {
        let (state, _) = watch::channel(Probe::default());

        let err = {
            let guard = LoadingGuard::begin(&state);
            guard.fail(ApiError::new("NOT_FOUND", ""), "Failed to load song")
        };

        assert_eq!(err.code, "NOT_FOUND");
        assert!(!state.borrow().loading);
        assert_eq!(state.borrow().error.as_deref(), Some("Failed to load song"));
    }

    #[test]
    fn test_error_message_prefers_server_text() {
        let err = ApiError::new("SONG_NOT_FOUND", "Song not found");
        assert_eq!(error_message(&err, "fallback"), "Song not found");
    }
}
