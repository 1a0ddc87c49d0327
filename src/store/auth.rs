use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::{
    error::ApiResult,
    management::TokenManager,
    service::AuthService,
    store::{Loading, LoadingGuard},
    types::{
        AuthResponse, AuthTokens, AvatarResponse, AvatarUpload, ChangePasswordData,
        LoginCredentials, RegisterData, UpdateProfileData, User,
    },
};

const LOGIN_FAILED: &str = "Login failed";
const REGISTER_FAILED: &str = "Registration failed";
const UPDATE_PROFILE_FAILED: &str = "Failed to update profile";
const CHANGE_PASSWORD_FAILED: &str = "Failed to change password";
const UPLOAD_AVATAR_FAILED: &str = "Failed to upload avatar";
const VERIFY_EMAIL_FAILED: &str = "Email verification failed";
const RESEND_VERIFICATION_FAILED: &str = "Failed to resend verification email";
const FORGOT_PASSWORD_FAILED: &str = "Failed to send password reset email";
const RESET_PASSWORD_FAILED: &str = "Failed to reset password";
const DELETE_ACCOUNT_FAILED: &str = "Failed to delete account";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Loading for AuthState {
    fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }
}

/// Session status derived from the store state and the stored tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Anonymous,
    Loading,
    Authenticated,
    Error,
}

/// Session state: the signed-in user and the account actions.
///
/// Tokens live in the shared [`TokenManager`], which the HTTP client also
/// clears when a refresh fails. A cached user without an access token is
/// therefore not authenticated.
#[derive(Debug)]
pub struct AuthStore {
    service: AuthService,
    tokens: Arc<TokenManager>,
    state: watch::Sender<AuthState>,
}

impl AuthStore {
    pub fn new(service: AuthService, tokens: Arc<TokenManager>) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            service,
            tokens,
            state,
        }
    }

    pub fn service(&self) -> &AuthService {
        &self.service
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().user.is_some() && self.tokens.access_token().is_some()
    }

    pub fn is_email_verified(&self) -> bool {
        self.state
            .borrow()
            .user
            .as_ref()
            .is_some_and(|user| user.email_verified)
    }

    pub fn status(&self) -> AuthStatus {
        let state = self.state.borrow();
        if state.is_loading {
            AuthStatus::Loading
        } else if state.error.is_some() {
            AuthStatus::Error
        } else if state.user.is_some() && self.tokens.access_token().is_some() {
            AuthStatus::Authenticated
        } else {
            AuthStatus::Anonymous
        }
    }

    /// Restores the session from a persisted access token.
    ///
    /// Without a token this does nothing. If the user cannot be fetched the
    /// session is cleared and the store stays anonymous; no error is recorded.
    #[instrument(skip(self))]
    pub async fn initialize_auth(&self) {
        if self.tokens.access_token().is_none() {
            return;
        }

        let _guard = LoadingGuard::begin(&self.state);
        match self.service.get_current_user().await {
            Ok(user) => {
                debug!(user = %user.id, "session restored");
                self.state.send_modify(|s| s.user = Some(user));
            }
            Err(e) => {
                debug!(code = %e.code, "stored session is no longer valid");
                self.clear_auth().await;
            }
        }
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginCredentials) -> ApiResult<AuthResponse> {
        let guard = LoadingGuard::begin(&self.state);

        let response = self
            .service
            .login(credentials)
            .await
            .map_err(|e| guard.fail(e, LOGIN_FAILED))?;
        self.start_session(&response).await;

        Ok(response)
    }

    /// Creates an account and signs in with it.
    #[instrument(skip(self, data), fields(email = %data.email))]
    pub async fn register(&self, data: &RegisterData) -> ApiResult<AuthResponse> {
        let guard = LoadingGuard::begin(&self.state);

        let response = self
            .service
            .register(data)
            .await
            .map_err(|e| guard.fail(e, REGISTER_FAILED))?;
        self.start_session(&response).await;

        Ok(response)
    }

    /// Notifies the server and drops the local session. A failed server call
    /// is only logged.
    pub async fn logout(&self) {
        let _guard = LoadingGuard::begin(&self.state);
        if let Err(e) = self.service.logout().await {
            warn!(code = %e.code, "logout request failed");
        }
        self.clear_auth().await;
    }

    pub async fn update_profile(&self, data: &UpdateProfileData) -> ApiResult<User> {
        let guard = LoadingGuard::begin(&self.state);

        let user = self
            .service
            .update_profile(data)
            .await
            .map_err(|e| guard.fail(e, UPDATE_PROFILE_FAILED))?;
        self.state.send_modify(|s| s.user = Some(user.clone()));

        Ok(user)
    }

    pub async fn change_password(&self, data: &ChangePasswordData) -> ApiResult<()> {
        let guard = LoadingGuard::begin(&self.state);

        self.service
            .change_password(data)
            .await
            .map_err(|e| guard.fail(e, CHANGE_PASSWORD_FAILED))
    }

    pub async fn upload_avatar(&self, upload: &AvatarUpload) -> ApiResult<AvatarResponse> {
        let guard = LoadingGuard::begin(&self.state);

        let response = self
            .service
            .upload_avatar(upload)
            .await
            .map_err(|e| guard.fail(e, UPLOAD_AVATAR_FAILED))?;
        self.state.send_modify(|s| {
            if let Some(user) = s.user.as_mut() {
                user.avatar_url = Some(response.avatar_url.clone());
            }
        });

        Ok(response)
    }

    /// Confirms an email address and refreshes the cached user, if any.
    pub async fn verify_email(&self, token: &str) -> ApiResult<()> {
        let guard = LoadingGuard::begin(&self.state);

        self.service
            .verify_email(token)
            .await
            .map_err(|e| guard.fail(e, VERIFY_EMAIL_FAILED))?;

        if self.state.borrow().user.is_some() {
            let user = self
                .service
                .get_current_user()
                .await
                .map_err(|e| guard.fail(e, VERIFY_EMAIL_FAILED))?;
            self.state.send_modify(|s| s.user = Some(user));
        }

        Ok(())
    }

    pub async fn resend_verification_email(&self) -> ApiResult<()> {
        let guard = LoadingGuard::begin(&self.state);

        self.service
            .resend_verification_email()
            .await
            .map_err(|e| guard.fail(e, RESEND_VERIFICATION_FAILED))
    }

    pub async fn forgot_password(&self, email: &str) -> ApiResult<()> {
        let guard = LoadingGuard::begin(&self.state);

        self.service
            .forgot_password(email)
            .await
            .map_err(|e| guard.fail(e, FORGOT_PASSWORD_FAILED))
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> ApiResult<()> {
        let guard = LoadingGuard::begin(&self.state);

        self.service
            .reset_password(token, new_password)
            .await
            .map_err(|e| guard.fail(e, RESET_PASSWORD_FAILED))
    }

    /// Deletes the account and ends the session.
    pub async fn delete_account(&self, password: &str) -> ApiResult<()> {
        let guard = LoadingGuard::begin(&self.state);

        self.service
            .delete_account(password)
            .await
            .map_err(|e| guard.fail(e, DELETE_ACCOUNT_FAILED))?;
        self.clear_auth().await;

        Ok(())
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }

    async fn start_session(&self, response: &AuthResponse) {
        let AuthTokens {
            access_token,
            refresh_token,
            ..
        } = &response.tokens;
        if let Err(e) = self
            .tokens
            .set_tokens(access_token.as_str(), refresh_token.as_str())
            .await
        {
            warn!(error = %e, "failed to persist session tokens");
        }
        // A fresh session supersedes any earlier expiry.
        if self.service.client().take_redirect().is_some() {
            debug!("pending login redirect cleared");
        }
        self.state.send_modify(|s| s.user = Some(response.user.clone()));
    }

    async fn clear_auth(&self) {
        if let Err(e) = self.tokens.clear().await {
            warn!(error = %e, "failed to clear stored tokens");
        }
        self.state.send_modify(|s| {
            s.user = None;
            s.error = None;
        });
    }
}
