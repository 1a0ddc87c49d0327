use std::sync::Arc;

use crate::{
    error::ApiResult,
    service::client::{ApiRequest, HttpClient},
    types::{
        CreateRatingData, CreateSongData, DuplicateSongData, ExportFormat, PaginatedResponse,
        Rating, SearchParams, Song, SongContent, UpdateRatingData, UpdateSongContentData,
        UpdateSongData,
    },
};

pub const DEFAULT_LIST_LIMIT: u32 = 10;
pub const DEFAULT_SUGGESTION_LIMIT: u32 = 5;

/// Song, content and rating endpoints under `/songs`.
#[derive(Debug, Clone)]
pub struct SongsService {
    client: Arc<HttpClient>,
}

impl SongsService {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    /// Paged listing; search text and filters narrow it down.
    pub async fn get_songs(&self, params: &SearchParams) -> ApiResult<PaginatedResponse<Song>> {
        self.client.get("/songs", params.to_query()).await
    }

    pub async fn get_song(&self, id: &str) -> ApiResult<Song> {
        self.client.get(&format!("/songs/{id}"), Vec::new()).await
    }

    pub async fn get_song_content(&self, id: &str) -> ApiResult<SongContent> {
        self.client
            .get(&format!("/songs/{id}/content"), Vec::new())
            .await
    }

    pub async fn create_song(&self, data: &CreateSongData) -> ApiResult<Song> {
        self.client.post("/songs", data).await
    }

    pub async fn update_song(&self, id: &str, data: &UpdateSongData) -> ApiResult<Song> {
        self.client.put(&format!("/songs/{id}"), data).await
    }

    pub async fn update_song_content(
        &self,
        id: &str,
        data: &UpdateSongContentData,
    ) -> ApiResult<SongContent> {
        self.client.put(&format!("/songs/{id}/content"), data).await
    }

    pub async fn delete_song(&self, id: &str) -> ApiResult<()> {
        self.client.delete(&format!("/songs/{id}")).await
    }

    pub async fn duplicate_song(&self, id: &str, title: Option<&str>) -> ApiResult<Song> {
        let data = DuplicateSongData {
            title: title.map(str::to_string),
        };
        self.client
            .post(&format!("/songs/{id}/duplicate"), &data)
            .await
    }

    pub async fn get_song_ratings(
        &self,
        id: &str,
        params: &SearchParams,
    ) -> ApiResult<PaginatedResponse<Rating>> {
        self.client
            .get(&format!("/songs/{id}/ratings"), params.paging_query())
            .await
    }

    pub async fn rate_song(&self, id: &str, data: &CreateRatingData) -> ApiResult<Rating> {
        self.client.post(&format!("/songs/{id}/rate"), data).await
    }

    pub async fn update_rating(
        &self,
        song_id: &str,
        rating_id: &str,
        data: &UpdateRatingData,
    ) -> ApiResult<Rating> {
        self.client
            .put(&format!("/songs/{song_id}/ratings/{rating_id}"), data)
            .await
    }

    pub async fn delete_rating(&self, song_id: &str, rating_id: &str) -> ApiResult<()> {
        self.client
            .delete(&format!("/songs/{song_id}/ratings/{rating_id}"))
            .await
    }

    pub async fn get_popular_songs(&self, limit: u32) -> ApiResult<Vec<Song>> {
        self.client.get("/songs/popular", limit_query(limit)).await
    }

    pub async fn get_latest_songs(&self, limit: u32) -> ApiResult<Vec<Song>> {
        self.client.get("/songs/latest", limit_query(limit)).await
    }

    pub async fn get_recommended_songs(&self, limit: u32) -> ApiResult<Vec<Song>> {
        self.client.get("/songs/recommended", limit_query(limit)).await
    }

    pub async fn get_search_suggestions(&self, query: &str, limit: u32) -> ApiResult<Vec<String>> {
        let mut params = vec![("query".to_string(), query.to_string())];
        params.extend(limit_query(limit));
        self.client.get("/songs/search-suggestions", params).await
    }

    pub async fn increment_view_count(&self, id: &str) -> ApiResult<()> {
        self.client.post_empty(&format!("/songs/{id}/view")).await
    }

    /// Downloads the rendered song. The body is the file itself, not an envelope.
    pub async fn export_song(&self, id: &str, format: ExportFormat) -> ApiResult<Vec<u8>> {
        let request = ApiRequest::get(format!("/songs/{id}/export"))
            .query(vec![("format".to_string(), format.to_string())]);
        self.client.send_raw(request).await
    }

    /// Songs authored by the signed-in user. Filters are not supported here.
    pub async fn get_my_songs(&self, params: &SearchParams) -> ApiResult<PaginatedResponse<Song>> {
        let params = SearchParams {
            filters: Default::default(),
            ..params.clone()
        };
        self.client.get("/songs/my", params.to_query()).await
    }
}

fn limit_query(limit: u32) -> Vec<(String, String)> {
    vec![("limit".to_string(), limit.to_string())]
}
