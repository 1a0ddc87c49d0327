use std::sync::Arc;

use serde_json::json;

use crate::{
    error::ApiResult,
    service::client::{ApiRequest, HttpClient},
    types::{
        AuthResponse, AvatarResponse, AvatarUpload, ChangePasswordData, LoginCredentials,
        RefreshResponse, RegisterData, UpdateProfileData, User,
    },
};

/// Account and session endpoints under `/auth`.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: Arc<HttpClient>,
}

impl AuthService {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<HttpClient> {
        &self.client
    }

    pub async fn register(&self, data: &RegisterData) -> ApiResult<AuthResponse> {
        self.client.post("/auth/register", data).await
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> ApiResult<AuthResponse> {
        self.client.post("/auth/login", credentials).await
    }

    pub async fn logout(&self) -> ApiResult<()> {
        self.client.post_empty("/auth/logout").await
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> ApiResult<RefreshResponse> {
        self.client
            .post("/auth/refresh", &json!({ "refresh_token": refresh_token }))
            .await
    }

    pub async fn verify_email(&self, token: &str) -> ApiResult<()> {
        self.client
            .post("/auth/verify-email", &json!({ "token": token }))
            .await
    }

    pub async fn resend_verification_email(&self) -> ApiResult<()> {
        self.client.post_empty("/auth/resend-verification").await
    }

    pub async fn forgot_password(&self, email: &str) -> ApiResult<()> {
        self.client
            .post("/auth/forgot-password", &json!({ "email": email }))
            .await
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> ApiResult<()> {
        self.client
            .post(
                "/auth/reset-password",
                &json!({ "token": token, "new_password": new_password }),
            )
            .await
    }

    pub async fn get_current_user(&self) -> ApiResult<User> {
        self.client.get("/auth/me", Vec::new()).await
    }

    pub async fn update_profile(&self, data: &UpdateProfileData) -> ApiResult<User> {
        self.client.put("/auth/profile", data).await
    }

    pub async fn change_password(&self, data: &ChangePasswordData) -> ApiResult<()> {
        self.client.put("/auth/change-password", data).await
    }

    /// Uploads an avatar image as the `avatar` multipart field.
    pub async fn upload_avatar(&self, upload: &AvatarUpload) -> ApiResult<AvatarResponse> {
        let request = ApiRequest::post("/auth/upload-avatar").multipart(
            "avatar",
            upload.file_name.clone(),
            upload.mime_type.clone(),
            upload.bytes.clone(),
        );
        self.client.send(request).await
    }

    pub async fn delete_account(&self, password: &str) -> ApiResult<()> {
        let request = ApiRequest::delete("/auth/account").json(&json!({ "password": password }))?;
        self.client.send(request).await
    }
}
