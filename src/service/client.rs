//! Authenticated HTTP client.
//!
//! Wraps a [`reqwest::Client`] configured for the MyChordHub API. Outgoing
//! requests get the stored bearer token and a `_t` cache-busting parameter.
//! A `401 Unauthorized` triggers at most one refresh-and-retry per request;
//! concurrent requests share a single refresh. All failures are normalized
//! into [`ApiError`].

use std::{fmt, sync::Arc};

use reqwest::{
    Method, Response, StatusCode,
    multipart::{Form, Part},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tokio::sync::{Mutex, watch};
use tracing::{debug, instrument, warn};

use crate::{
    config::ClientConfig,
    error::{ApiError, ApiResult, UNKNOWN_ERROR},
    management::TokenManager,
    router::LOGIN_PATH,
    types::{ApiResponse, RefreshResponse},
    utils,
};

pub const REFRESH_PATH: &str = "/auth/refresh";
pub const SESSION_EXPIRED: &str = "SESSION_EXPIRED";

const USER_AGENT: &str = concat!("chordhub/", env!("CARGO_PKG_VERSION"));

/// Body of an outgoing request. Kept separate from `reqwest` types so a
/// request can be rebuilt for the retry after a token refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart {
        field: String,
        file_name: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, query: Vec<(String, String)>) -> Self {
        self.query.extend(query);
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> ApiResult<Self> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn multipart(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.body = RequestBody::Multipart {
            field: field.into(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        };
        self
    }
}

pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenManager>,
    refresh_lock: Mutex<()>,
    redirect: watch::Sender<Option<String>>,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("tokens", &"[REDACTED]")
            .finish()
    }
}

impl HttpClient {
    pub fn new(config: &ClientConfig, tokens: Arc<TokenManager>) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::new(UNKNOWN_ERROR, format!("Failed to build HTTP client: {e}")))?;

        let (redirect, _) = watch::channel(None);

        Ok(Self {
            http,
            base_url: config.api_base(),
            tokens,
            refresh_lock: Mutex::new(()),
            redirect,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Observes login redirects requested after the session was dropped.
    pub fn subscribe_redirect(&self) -> watch::Receiver<Option<String>> {
        self.redirect.subscribe()
    }

    pub fn pending_redirect(&self) -> Option<String> {
        self.redirect.borrow().clone()
    }

    /// Returns and clears the pending login redirect.
    pub fn take_redirect(&self) -> Option<String> {
        self.redirect.send_replace(None)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> ApiResult<T> {
        self.send(ApiRequest::get(path).query(query)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.send(ApiRequest::post(path).json(body)?).await
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(ApiRequest::post(path)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.send(ApiRequest::put(path).json(body)?).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.send(ApiRequest::patch(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(ApiRequest::delete(path)).await
    }

    /// Sends a request and unwraps the `data` member of the response envelope.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        let response = self.execute(&request).await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        unwrap_envelope(status, &text)
    }

    /// Sends a request and returns the raw body, for endpoints that answer
    /// with a file rather than an envelope.
    pub async fn send_raw(&self, request: ApiRequest) -> ApiResult<Vec<u8>> {
        let response = self.execute(&request).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Runs the request/response state machine and returns a successful
    /// response, or the normalized failure.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn execute(&self, request: &ApiRequest) -> ApiResult<Response> {
        let mut retried = false;

        loop {
            let token = self.tokens.access_token();
            let response = match self.build(request, token.as_deref())?.send().await {
                Ok(response) => response,
                Err(err) => {
                    warn!(error = %err, "request failed without a response");
                    return Err(ApiError::network());
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::UNAUTHORIZED {
                match self.tokens.refresh_token() {
                    Some(_) if !retried => {
                        retried = true;
                        self.refresh_session(token.as_deref()).await?;
                        debug!("retrying request with refreshed token");
                        continue;
                    }
                    _ => {
                        debug!(retried, "unauthorized without a usable refresh token");
                        self.expire_session().await;
                    }
                }
            }

            let err = normalize_failure(response).await;
            warn!(code = %err.code, status = status.as_u16(), "API error");
            return Err(err);
        }
    }

    /// Obtains a new access token, sharing one in-flight refresh between
    /// concurrent callers.
    ///
    /// `stale` is the token the failed request was sent with. If another
    /// caller replaced it while this one waited for the lock, the new token is
    /// reused without calling the refresh endpoint again.
    async fn refresh_session(&self, stale: Option<&str>) -> ApiResult<()> {
        let _refreshing = self.refresh_lock.lock().await;

        let current = self.tokens.access_token();
        if current.is_some() && current.as_deref() != stale {
            debug!("access token already refreshed by another request");
            return Ok(());
        }

        // A concurrent refresh may have failed and dropped the session.
        let Some(refresh_token) = self.tokens.refresh_token() else {
            return Err(session_expired());
        };

        match self.request_refresh(&refresh_token).await {
            Ok(refreshed) => {
                if let Err(e) = self.tokens.set_access_token(refreshed.access_token).await {
                    warn!(error = %e, "failed to persist refreshed access token");
                }
                debug!(expires_in = refreshed.expires_in, "access token refreshed");
                Ok(())
            }
            Err(err) => {
                warn!(code = %err.code, "token refresh failed");
                self.expire_session().await;
                Err(err)
            }
        }
    }

    /// Calls the refresh endpoint directly, outside of the 401 handling.
    async fn request_refresh(&self, refresh_token: &str) -> ApiResult<RefreshResponse> {
        let request =
            ApiRequest::post(REFRESH_PATH).json(&json!({ "refresh_token": refresh_token }))?;
        let response = match self.build(&request, None)?.send().await {
            Ok(response) => response,
            Err(_) => return Err(ApiError::network()),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(normalize_failure(response).await);
        }

        let text = response.text().await?;
        unwrap_envelope(status.as_u16(), &text)
    }

    /// Drops both tokens and asks consumers to go to the login page.
    async fn expire_session(&self) {
        if let Err(e) = self.tokens.clear().await {
            warn!(error = %e, "failed to clear stored tokens");
        }
        self.redirect.send_replace(Some(LOGIN_PATH.to_string()));
    }

    fn build(&self, request: &ApiRequest, token: Option<&str>) -> ApiResult<reqwest::RequestBuilder> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .query(&request.query)
            .query(&[("_t", utils::cache_buster())]);

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Multipart {
                field,
                file_name,
                mime_type,
                bytes,
            } => {
                let part = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime_type)
                    .map_err(|e| ApiError::new(UNKNOWN_ERROR, format!("Invalid upload: {e}")))?;
                builder.multipart(Form::new().part(field.clone(), part))
            }
        };

        Ok(builder)
    }
}

fn session_expired() -> ApiError {
    let mut err = ApiError::new(SESSION_EXPIRED, "Session expired, please log in again");
    err.status = Some(StatusCode::UNAUTHORIZED.as_u16());
    err
}

/// Decodes a successful body and extracts `data`. A missing body or missing
/// `data` decodes as JSON `null`, which suits unit responses.
pub(crate) fn unwrap_envelope<T: DeserializeOwned>(status: u16, text: &str) -> ApiResult<T> {
    let envelope: ApiResponse<Value> = if text.trim().is_empty() {
        ApiResponse::empty()
    } else {
        serde_json::from_str(text)?
    };

    if !envelope.success {
        return Err(ApiError::from_envelope(status, envelope.error));
    }

    Ok(serde_json::from_value(envelope.data.unwrap_or(Value::Null))?)
}

async fn normalize_failure(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let body = match response.text().await {
        Ok(text) => serde_json::from_str::<ApiResponse<Value>>(&text)
            .ok()
            .and_then(|envelope| envelope.error),
        Err(_) => None,
    };
    ApiError::from_envelope(status, body)
}
