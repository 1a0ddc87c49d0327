mod common;

use std::time::Duration;

use chordhub::{
    error::{NETWORK_ERROR, UNKNOWN_ERROR},
    router::LOGIN_PATH,
    service::SongsService,
};
use common::{Harness, fail, ok, song};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

#[tokio::test]
async fn test_requests_carry_bearer_token_and_cache_buster() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/songs/s1"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ok(song("s1", 0.0, 0)))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::signed_in(&server, "access-1", "refresh-1").await;
    let songs = SongsService::new(harness.client.clone());
    let fetched = songs.get_song("s1").await.unwrap();
    assert_eq!(fetched.id, "s1");

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].url.query_pairs().any(|(k, _)| k == "_t"));
}

#[tokio::test]
async fn test_anonymous_requests_have_no_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/songs/s1"))
        .respond_with(ok(song("s1", 0.0, 0)))
        .mount(&server)
        .await;

    let harness = Harness::new(&server).await;
    SongsService::new(harness.client.clone())
        .get_song("s1")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_unauthorized_refreshes_once_and_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/songs/s1"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(fail(401, "TOKEN_EXPIRED", "Token expired"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({ "refresh_token": "refresh-1" })))
        .respond_with(ok(json!({ "access_token": "fresh", "expires_in": 900 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/songs/s1"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ok(song("s1", 0.0, 0)))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::signed_in(&server, "stale", "refresh-1").await;
    let fetched = SongsService::new(harness.client.clone())
        .get_song("s1")
        .await
        .unwrap();

    assert_eq!(fetched.id, "s1");
    assert_eq!(harness.tokens.access_token().as_deref(), Some("fresh"));
    assert_eq!(harness.tokens.refresh_token().as_deref(), Some("refresh-1"));
    assert!(harness.client.pending_redirect().is_none());
}

#[tokio::test]
async fn test_unauthorized_without_refresh_token_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(fail(401, "UNAUTHORIZED", "Not authenticated"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ok(json!({ "access_token": "never" })))
        .expect(0)
        .mount(&server)
        .await;

    let harness = Harness::new(&server).await;
    harness.tokens.set_access_token("orphan").await.unwrap();

    let err = harness
        .client
        .get::<serde_json::Value>("/auth/me", Vec::new())
        .await
        .unwrap_err();

    assert_eq!(err.code, "UNAUTHORIZED");
    assert!(err.is_unauthorized());
    assert!(harness.tokens.access_token().is_none());
    assert_eq!(harness.client.take_redirect().as_deref(), Some(LOGIN_PATH));
    assert!(harness.client.pending_redirect().is_none());
}

#[tokio::test]
async fn test_second_unauthorized_after_retry_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/songs/s1"))
        .respond_with(fail(401, "UNAUTHORIZED", "Not authenticated"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ok(json!({ "access_token": "fresh" })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::signed_in(&server, "stale", "refresh-1").await;
    let err = SongsService::new(harness.client.clone())
        .get_song("s1")
        .await
        .unwrap_err();

    assert_eq!(err.status, Some(401));
    assert!(harness.tokens.access_token().is_none());
    assert!(harness.tokens.refresh_token().is_none());
    assert_eq!(harness.client.pending_redirect().as_deref(), Some(LOGIN_PATH));
}

#[tokio::test]
async fn test_failed_refresh_clears_session_and_returns_refresh_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/songs/s1"))
        .respond_with(fail(401, "TOKEN_EXPIRED", "Token expired"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(fail(401, "INVALID_REFRESH_TOKEN", "Refresh token revoked"))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::signed_in(&server, "stale", "revoked").await;
    let err = SongsService::new(harness.client.clone())
        .get_song("s1")
        .await
        .unwrap_err();

    assert_eq!(err.code, "INVALID_REFRESH_TOKEN");
    assert!(harness.tokens.current().access_token.is_none());
    assert_eq!(harness.client.pending_redirect().as_deref(), Some(LOGIN_PATH));
}

#[tokio::test]
async fn test_concurrent_unauthorized_requests_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(fail(401, "TOKEN_EXPIRED", "Token expired"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ok(json!({ "access_token": "fresh" })).set_delay(Duration::from_millis(150)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/songs/a"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ok(song("a", 0.0, 0)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/songs/b"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ok(song("b", 0.0, 0)))
        .mount(&server)
        .await;

    let harness = Harness::signed_in(&server, "stale", "refresh-1").await;
    let songs = SongsService::new(harness.client.clone());
    let (a, b) = tokio::join!(songs.get_song("a"), songs.get_song("b"));

    assert_eq!(a.unwrap().id, "a");
    assert_eq!(b.unwrap().id, "b");
    assert_eq!(harness.tokens.access_token().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_error_envelope_is_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/songs/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "error": {
                "code": "SONG_NOT_FOUND",
                "message": "Song not found",
                "details": { "id": ["unknown song"] }
            }
        })))
        .mount(&server)
        .await;

    let harness = Harness::new(&server).await;
    let err = SongsService::new(harness.client.clone())
        .get_song("missing")
        .await
        .unwrap_err();

    assert_eq!(err.code, "SONG_NOT_FOUND");
    assert_eq!(err.message, "Song not found");
    assert_eq!(err.status, Some(404));
    assert_eq!(err.details.unwrap()["id"], vec!["unknown song".to_string()]);
}

#[tokio::test]
async fn test_failure_without_error_code_is_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/songs/s1"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let harness = Harness::new(&server).await;
    let err = SongsService::new(harness.client.clone())
        .get_song("s1")
        .await
        .unwrap_err();

    assert_eq!(err.code, UNKNOWN_ERROR);
    assert_eq!(err.status, Some(502));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let harness = Harness::at("http://127.0.0.1:1");
    let err = SongsService::new(harness.client.clone())
        .get_song("s1")
        .await
        .unwrap_err();

    assert_eq!(err.code, NETWORK_ERROR);
    assert!(err.is_network());
    assert!(err.status.is_none());
}

#[tokio::test]
async fn test_export_returns_raw_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/songs/s1/export"))
        .and(wiremock::matchers::query_param("format", "txt"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"[G]Hello".to_vec()))
        .mount(&server)
        .await;

    let harness = Harness::new(&server).await;
    let bytes = SongsService::new(harness.client.clone())
        .export_song("s1", chordhub::types::ExportFormat::Txt)
        .await
        .unwrap();

    assert_eq!(bytes, b"[G]Hello");
}
