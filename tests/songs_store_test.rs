mod common;

use std::time::Duration;

use chordhub::types::{Genre, SearchParams, SongSearchFilters};
use common::{Harness, fail, ids, ok, page, song};
use serde_json::json;
use wiremock::{
    Mock, MockServer,
    matchers::{method, path, query_param, query_param_is_missing},
};

#[tokio::test]
async fn test_first_page_replaces_and_next_page_appends() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/songs"))
        .and(query_param("page", "1"))
        .respond_with(ok(page(&["a", "b"], 1, 2)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/songs"))
        .and(query_param("page", "2"))
        .respond_with(ok(page(&["c", "b"], 2, 2)))
        .mount(&server)
        .await;

    let harness = Harness::new(&server).await;
    let store = harness.songs_store();

    store.fetch_songs(SearchParams::page(1)).await.unwrap();
    assert_eq!(ids(&store.state().songs), vec!["a", "b"]);
    assert!(store.has_more());

    store.fetch_songs(SearchParams::page(2)).await.unwrap();
    let state = store.state();
    // Pages are appended as received, duplicates included.
    assert_eq!(ids(&state.songs), vec!["a", "b", "c", "b"]);
    assert_eq!(state.pagination.page, 2);
    assert!(!state.has_more());
    assert!(!state.is_loading);

    store.fetch_songs(SearchParams::page(1)).await.unwrap();
    assert_eq!(ids(&store.state().songs), vec!["a", "b"]);
}

#[tokio::test]
async fn test_unspecified_page_uses_current_pagination_and_replaces() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/songs"))
        .and(query_param("page", "1"))
        .and(query_param("size", "20"))
        .respond_with(ok(page(&["a"], 1, 1)))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server).await;
    let store = harness.songs_store();
    store.fetch_songs(SearchParams::default()).await.unwrap();

    assert_eq!(ids(&store.state().songs), vec!["a"]);
}

#[tokio::test]
async fn test_load_more_is_noop_on_last_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/songs"))
        .respond_with(ok(page(&["a"], 1, 1)))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server).await;
    let store = harness.songs_store();
    store.fetch_songs(SearchParams::page(1)).await.unwrap();

    assert!(store.load_more_songs().await.unwrap().is_none());
    assert_eq!(ids(&store.state().songs), vec!["a"]);
}

#[tokio::test]
async fn test_load_more_is_noop_while_loading() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/songs"))
        .and(query_param("page", "1"))
        .respond_with(ok(page(&["a"], 1, 3)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/songs"))
        .and(query_param("page", "2"))
        .respond_with(ok(page(&["b"], 2, 3)).set_delay(Duration::from_millis(150)))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server).await;
    let store = harness.songs_store();
    store.fetch_songs(SearchParams::page(1)).await.unwrap();

    let (first, second) = tokio::join!(store.load_more_songs(), store.load_more_songs());
    assert!(first.unwrap().is_some());
    assert!(second.unwrap().is_none());
    assert_eq!(ids(&store.state().songs), vec!["a", "b"]);
}

#[tokio::test]
async fn test_load_more_in_browse_mode_fetches_next_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/songs"))
        .and(query_param("page", "1"))
        .respond_with(ok(page(&["a"], 1, 2)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/songs"))
        .and(query_param("page", "2"))
        .and(query_param_is_missing("query"))
        .respond_with(ok(page(&["b"], 2, 2)))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server).await;
    let store = harness.songs_store();
    store.fetch_songs(SearchParams::page(1)).await.unwrap();

    let more = store.load_more_songs().await.unwrap().unwrap();
    assert_eq!(more.pagination.page, 2);
    assert_eq!(ids(&store.state().filtered_songs()), vec!["a", "b"]);
}

#[tokio::test]
async fn test_search_switches_mode_and_clear_returns_to_browse() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/songs"))
        .and(query_param_is_missing("query"))
        .respond_with(ok(page(&["a", "b"], 1, 1)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/songs"))
        .and(query_param("query", "wonder"))
        .and(query_param("genre", "rock"))
        .and(query_param("page", "1"))
        .respond_with(ok(page(&["w1"], 1, 2)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/songs"))
        .and(query_param("query", "wonder"))
        .and(query_param("page", "2"))
        .respond_with(ok(page(&["w2"], 2, 2)))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server).await;
    let store = harness.songs_store();
    store.fetch_songs(SearchParams::page(1)).await.unwrap();

    let filters = SongSearchFilters {
        genre: Some(Genre::Rock),
        ..SongSearchFilters::default()
    };
    store.search_songs("wonder", filters.clone()).await.unwrap();

    let state = store.state();
    assert!(state.is_search_mode());
    assert_eq!(state.search_query, "wonder");
    assert_eq!(state.search_filters, filters);
    assert_eq!(ids(state.filtered_songs()), vec!["w1"]);
    assert_eq!(ids(&state.songs), vec!["a", "b"]);

    store.load_more_songs().await.unwrap();
    assert_eq!(ids(&store.state().search_results), vec!["w1", "w2"]);

    store.clear_search();
    let state = store.state();
    assert!(!state.is_search_mode());
    assert!(state.search_results.is_empty());
    assert_eq!(ids(state.filtered_songs()), vec!["a", "b"]);
}

#[tokio::test]
async fn test_rate_song_updates_local_average() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/songs"))
        .respond_with(ok(json!({
            "items": [song("s1", 4.0, 3)],
            "pagination": { "page": 1, "size": 20, "total": 1, "pages": 1 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/songs/s1"))
        .respond_with(ok(song("s1", 4.0, 3)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/songs/s1/view"))
        .respond_with(ok(json!(null)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/songs/s1/rate"))
        .respond_with(ok(json!({
            "id": "r1",
            "user_id": "u1",
            "song_id": "s1",
            "score": 5,
            "comment": null,
            "created_at": "2024-05-02T10:00:00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::signed_in(&server, "access-1", "refresh-1").await;
    let store = harness.songs_store();
    store.fetch_songs(SearchParams::page(1)).await.unwrap();
    store.get_song("s1").await.unwrap();

    let rating = store.rate_song("s1", 5, None).await.unwrap();
    assert_eq!(rating.score, 5);

    let state = store.state();
    assert_eq!(state.songs[0].rating_count, 4);
    assert!((state.songs[0].average_rating - 4.25).abs() < f64::EPSILON);
    let current = state.current_song.unwrap();
    assert_eq!(current.rating_count, 4);
    assert!((current.average_rating - 4.25).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_get_song_bumps_views_and_tolerates_view_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/songs/s1"))
        .respond_with(ok(song("s1", 0.0, 0)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/songs/s1/view"))
        .respond_with(ok(json!(null)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/songs/s2"))
        .respond_with(ok(song("s2", 0.0, 0)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/songs/s2/view"))
        .respond_with(fail(500, "INTERNAL_ERROR", "boom"))
        .mount(&server)
        .await;

    let harness = Harness::new(&server).await;
    let store = harness.songs_store();

    let viewed = store.get_song("s1").await.unwrap();
    assert_eq!(viewed.view_count, 8);
    assert_eq!(store.state().current_song.unwrap().view_count, 8);

    let unviewed = store.get_song("s2").await.unwrap();
    assert_eq!(unviewed.view_count, 7);
    let state = store.state();
    assert!(state.error.is_none());
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_failed_action_records_error_and_clears_loading() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/songs/missing"))
        .respond_with(fail(404, "SONG_NOT_FOUND", "Song not found"))
        .mount(&server)
        .await;

    let harness = Harness::new(&server).await;
    let store = harness.songs_store();
    let err = store.get_song("missing").await.unwrap_err();

    assert_eq!(err.code, "SONG_NOT_FOUND");
    let state = store.state();
    assert_eq!(state.error.as_deref(), Some("Song not found"));
    assert!(!state.is_loading);
    assert!(state.current_song.is_none());

    store.clear_error();
    assert!(store.state().error.is_none());
}

#[tokio::test]
async fn test_create_delete_and_duplicate_update_lists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/songs"))
        .respond_with(ok(page(&["a"], 1, 1)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/songs"))
        .respond_with(ok(song("new", 0.0, 0)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/songs/a/duplicate"))
        .respond_with(ok(song("copy", 0.0, 0)))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/songs/new"))
        .respond_with(ok(json!(null)))
        .mount(&server)
        .await;

    let harness = Harness::signed_in(&server, "access-1", "refresh-1").await;
    let store = harness.songs_store();
    store.fetch_songs(SearchParams::page(1)).await.unwrap();

    let data = chordhub::types::CreateSongData {
        title: "New".to_string(),
        artist: "Artist".to_string(),
        key_signature: chordhub::types::Note::G,
        capo_position: None,
        bpm: None,
        difficulty: None,
        genre: None,
        description: None,
        is_public: Some(true),
    };
    store.create_song(&data).await.unwrap();
    assert_eq!(ids(&store.state().songs), vec!["new", "a"]);
    assert_eq!(store.state().current_song.unwrap().id, "new");

    store.duplicate_song("a", Some("Copy")).await.unwrap();
    assert_eq!(ids(&store.state().songs), vec!["copy", "new", "a"]);

    store.delete_song("new").await.unwrap();
    let state = store.state();
    assert_eq!(ids(&state.songs), vec!["copy", "a"]);
    assert!(state.current_song.is_none());
}
