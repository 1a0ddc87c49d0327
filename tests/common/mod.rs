#![allow(dead_code)]

use std::sync::Arc;

use chordhub::{
    config::ClientConfig,
    management::TokenManager,
    service::{AuthService, HttpClient, SongsService},
    store::{AuthStore, SongsStore},
};
use serde_json::{Value, json};
use wiremock::{MockServer, ResponseTemplate};

pub struct Harness {
    pub tokens: Arc<TokenManager>,
    pub client: Arc<HttpClient>,
}

impl Harness {
    pub async fn new(server: &MockServer) -> Self {
        Self::at(&server.uri())
    }

    pub fn at(uri: &str) -> Self {
        let tokens = Arc::new(TokenManager::in_memory());
        let config = ClientConfig::with_api_url(uri);
        let client = Arc::new(HttpClient::new(&config, Arc::clone(&tokens)).unwrap());
        Self { tokens, client }
    }

    pub async fn signed_in(server: &MockServer, access: &str, refresh: &str) -> Self {
        let harness = Self::new(server).await;
        harness.tokens.set_tokens(access, refresh).await.unwrap();
        harness
    }

    pub fn songs_store(&self) -> SongsStore {
        SongsStore::new(SongsService::new(Arc::clone(&self.client)), 20)
    }

    pub fn auth_store(&self) -> AuthStore {
        AuthStore::new(
            AuthService::new(Arc::clone(&self.client)),
            Arc::clone(&self.tokens),
        )
    }
}

pub fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

pub fn fail(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "success": false,
        "error": { "code": code, "message": message }
    }))
}

pub fn song(id: &str, average_rating: f64, rating_count: u32) -> Value {
    json!({
        "id": id,
        "author_id": "u1",
        "title": format!("Song {id}"),
        "artist": "Artist",
        "key_signature": "G",
        "capo_position": 0,
        "bpm": 120,
        "difficulty": "beginner",
        "genre": "folk",
        "average_rating": average_rating,
        "rating_count": rating_count,
        "view_count": 7,
        "is_public": true,
        "created_at": "2024-05-01T10:00:00",
        "updated_at": "2024-05-01T10:00:00"
    })
}

pub fn page(ids: &[&str], page: u32, pages: u32) -> Value {
    let items: Vec<Value> = ids.iter().map(|id| song(id, 0.0, 0)).collect();
    json!({
        "items": items,
        "pagination": { "page": page, "size": 20, "total": pages * 20, "pages": pages }
    })
}

pub fn user(email_verified: bool) -> Value {
    json!({
        "id": "u1",
        "email": "ana@example.com",
        "display_name": "Ana",
        "bio": null,
        "avatar_url": null,
        "email_verified": email_verified,
        "created_at": "2024-01-01T00:00:00",
        "updated_at": "2024-01-01T00:00:00"
    })
}

pub fn auth_response() -> Value {
    json!({
        "user": user(true),
        "tokens": {
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "token_type": "bearer",
            "expires_in": 900
        }
    })
}

pub fn ids(songs: &[chordhub::types::Song]) -> Vec<&str> {
    songs.iter().map(|s| s.id.as_str()).collect()
}
