use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::{
    error::ApiResult,
    service::SongsService,
    store::{Loading, LoadingGuard, record_error},
    types::{
        CreateRatingData, CreateSongData, PaginatedResponse, Pagination, Rating, SearchParams,
        Song, SongContent, SongSearchFilters, UpdateSongContentData, UpdateSongData,
    },
    utils,
};

const FETCH_SONGS_FAILED: &str = "Failed to load songs";
const SEARCH_SONGS_FAILED: &str = "Failed to search songs";
const GET_SONG_FAILED: &str = "Failed to load song details";
const GET_CONTENT_FAILED: &str = "Failed to load song content";
const CREATE_SONG_FAILED: &str = "Failed to create song";
const UPDATE_SONG_FAILED: &str = "Failed to update song";
const UPDATE_CONTENT_FAILED: &str = "Failed to update song content";
const DELETE_SONG_FAILED: &str = "Failed to delete song";
const DUPLICATE_SONG_FAILED: &str = "Failed to duplicate song";
const RATE_SONG_FAILED: &str = "Failed to rate song";

#[derive(Debug, Clone, PartialEq)]
pub struct SongsState {
    /// Browse list, accumulated page by page.
    pub songs: Vec<Song>,
    pub current_song: Option<Song>,
    pub current_song_content: Option<SongContent>,
    pub search_results: Vec<Song>,
    pub search_query: String,
    pub search_filters: SongSearchFilters,
    /// Pagination of whichever listing was fetched last.
    pub pagination: Pagination,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl SongsState {
    pub fn new(page_size: u32) -> Self {
        Self {
            songs: Vec::new(),
            current_song: None,
            current_song_content: None,
            search_results: Vec::new(),
            search_query: String::new(),
            search_filters: SongSearchFilters::default(),
            pagination: Pagination::first_page(page_size),
            is_loading: false,
            error: None,
        }
    }

    /// Search mode is active while a query or any filter is set.
    pub fn is_search_mode(&self) -> bool {
        !self.search_query.is_empty() || !self.search_filters.is_empty()
    }

    /// The list to display: search results in search mode, the browse list otherwise.
    pub fn filtered_songs(&self) -> &[Song] {
        if self.is_search_mode() {
            &self.search_results
        } else {
            &self.songs
        }
    }

    pub fn has_more(&self) -> bool {
        self.pagination.has_more()
    }
}

impl Default for SongsState {
    fn default() -> Self {
        Self::new(Pagination::default().size)
    }
}

impl Loading for SongsState {
    fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }
}

/// Song listing, search and detail state.
///
/// Results are applied in the order calls resolve. Two overlapping searches
/// can therefore leave the older response in place.
#[derive(Debug)]
pub struct SongsStore {
    service: SongsService,
    state: watch::Sender<SongsState>,
}

impl SongsStore {
    pub fn new(service: SongsService, page_size: u32) -> Self {
        let (state, _) = watch::channel(SongsState::new(page_size));
        Self { service, state }
    }

    pub fn service(&self) -> &SongsService {
        &self.service
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> SongsState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SongsState> {
        self.state.subscribe()
    }

    pub fn has_more(&self) -> bool {
        self.state.borrow().has_more()
    }

    /// Fetches a page of the browse list.
    ///
    /// Page 1, or no page at all, replaces the list; any other page is appended
    /// as is. Missing page and size fall back to the current pagination.
    #[instrument(skip(self, params), fields(page = ?params.page))]
    pub async fn fetch_songs(&self, params: SearchParams) -> ApiResult<PaginatedResponse<Song>> {
        let guard = LoadingGuard::begin(&self.state);

        let replace = matches!(params.page.filter(|p| *p > 0), None | Some(1));
        let current = self.state.borrow().pagination;
        let request = SearchParams {
            page: params.page.filter(|p| *p > 0).or(Some(current.page)),
            size: params.size.filter(|s| *s > 0).or(Some(current.size)),
            ..params
        };

        let response = self
            .service
            .get_songs(&request)
            .await
            .map_err(|e| guard.fail(e, FETCH_SONGS_FAILED))?;

        self.state.send_modify(|s| {
            if replace {
                s.songs = response.items.clone();
            } else {
                s.songs.extend(response.items.iter().cloned());
            }
            s.pagination = response.pagination;
        });
        debug!(count = response.items.len(), replace, "songs fetched");

        Ok(response)
    }

    /// Starts a new search from page 1, replacing previous results.
    #[instrument(skip(self, filters))]
    pub async fn search_songs(
        &self,
        query: &str,
        filters: SongSearchFilters,
    ) -> ApiResult<PaginatedResponse<Song>> {
        self.state.send_modify(|s| {
            s.search_query = query.to_string();
            s.search_filters = filters.clone();
        });
        self.fetch_search_page(query.to_string(), filters, 1).await
    }

    /// Fetches the next page of whichever mode is active.
    ///
    /// Returns `Ok(None)` without a request when the last page was reached or
    /// a fetch is already running.
    pub async fn load_more_songs(&self) -> ApiResult<Option<PaginatedResponse<Song>>> {
        let (next_page, search) = {
            let state = self.state.borrow();
            if !state.has_more() || state.is_loading {
                return Ok(None);
            }
            let search = state
                .is_search_mode()
                .then(|| (state.search_query.clone(), state.search_filters.clone()));
            (state.pagination.page + 1, search)
        };

        let response = match search {
            Some((query, filters)) => self.fetch_search_page(query, filters, next_page).await?,
            None => self.fetch_songs(SearchParams::page(next_page)).await?,
        };
        Ok(Some(response))
    }

    async fn fetch_search_page(
        &self,
        query: String,
        filters: SongSearchFilters,
        page: u32,
    ) -> ApiResult<PaginatedResponse<Song>> {
        let guard = LoadingGuard::begin(&self.state);

        let size = self.state.borrow().pagination.size;
        let request = SearchParams {
            page: Some(page),
            size: Some(size),
            query: Some(query),
            filters,
            ..SearchParams::default()
        };

        let response = self
            .service
            .get_songs(&request)
            .await
            .map_err(|e| guard.fail(e, SEARCH_SONGS_FAILED))?;

        self.state.send_modify(|s| {
            if page <= 1 {
                s.search_results = response.items.clone();
            } else {
                s.search_results.extend(response.items.iter().cloned());
            }
            s.pagination = response.pagination;
        });

        Ok(response)
    }

    /// Loads a song as the current song and records a view.
    ///
    /// The view counter is best effort: a failure is logged and the song is
    /// still returned.
    #[instrument(skip(self))]
    pub async fn get_song(&self, id: &str) -> ApiResult<Song> {
        let guard = LoadingGuard::begin(&self.state);

        let mut song = self
            .service
            .get_song(id)
            .await
            .map_err(|e| guard.fail(e, GET_SONG_FAILED))?;
        self.state.send_modify(|s| s.current_song = Some(song.clone()));

        match self.service.increment_view_count(id).await {
            Ok(()) => {
                song.view_count += 1;
                self.state.send_modify(|s| {
                    if let Some(current) = s.current_song.as_mut().filter(|c| c.id == song.id) {
                        current.view_count = song.view_count;
                    }
                });
            }
            Err(e) => warn!(code = %e.code, "failed to record song view"),
        }

        Ok(song)
    }

    pub async fn get_song_content(&self, id: &str) -> ApiResult<SongContent> {
        let guard = LoadingGuard::begin(&self.state);

        let content = self
            .service
            .get_song_content(id)
            .await
            .map_err(|e| guard.fail(e, GET_CONTENT_FAILED))?;
        self.state
            .send_modify(|s| s.current_song_content = Some(content.clone()));

        Ok(content)
    }

    /// Creates a song and puts it at the top of the browse list.
    pub async fn create_song(&self, data: &CreateSongData) -> ApiResult<Song> {
        let guard = LoadingGuard::begin(&self.state);

        let song = self
            .service
            .create_song(data)
            .await
            .map_err(|e| guard.fail(e, CREATE_SONG_FAILED))?;
        self.state.send_modify(|s| {
            s.songs.insert(0, song.clone());
            s.current_song = Some(song.clone());
        });

        Ok(song)
    }

    pub async fn update_song(&self, id: &str, data: &UpdateSongData) -> ApiResult<Song> {
        let guard = LoadingGuard::begin(&self.state);

        let updated = self
            .service
            .update_song(id, data)
            .await
            .map_err(|e| guard.fail(e, UPDATE_SONG_FAILED))?;
        self.state.send_modify(|s| {
            if let Some(entry) = s.songs.iter_mut().find(|song| song.id == id) {
                *entry = updated.clone();
            }
            if s.current_song.as_ref().is_some_and(|song| song.id == id) {
                s.current_song = Some(updated.clone());
            }
        });

        Ok(updated)
    }

    pub async fn update_song_content(
        &self,
        id: &str,
        data: &UpdateSongContentData,
    ) -> ApiResult<SongContent> {
        let guard = LoadingGuard::begin(&self.state);

        let content = self
            .service
            .update_song_content(id, data)
            .await
            .map_err(|e| guard.fail(e, UPDATE_CONTENT_FAILED))?;
        self.state
            .send_modify(|s| s.current_song_content = Some(content.clone()));

        Ok(content)
    }

    /// Deletes a song and removes it from both lists.
    pub async fn delete_song(&self, id: &str) -> ApiResult<()> {
        let guard = LoadingGuard::begin(&self.state);

        self.service
            .delete_song(id)
            .await
            .map_err(|e| guard.fail(e, DELETE_SONG_FAILED))?;
        self.state.send_modify(|s| {
            s.songs.retain(|song| song.id != id);
            s.search_results.retain(|song| song.id != id);
            if s.current_song.as_ref().is_some_and(|song| song.id == id) {
                s.current_song = None;
                s.current_song_content = None;
            }
        });

        Ok(())
    }

    pub async fn duplicate_song(&self, id: &str, title: Option<&str>) -> ApiResult<Song> {
        let guard = LoadingGuard::begin(&self.state);

        let song = self
            .service
            .duplicate_song(id, title)
            .await
            .map_err(|e| guard.fail(e, DUPLICATE_SONG_FAILED))?;
        self.state.send_modify(|s| s.songs.insert(0, song.clone()));

        Ok(song)
    }

    /// Submits a rating and folds it into the locally displayed average.
    ///
    /// The local value is `(avg * count + score) / (count + 1)`; it is not
    /// re-fetched, so it can drift from the server's figure. Ratings do not
    /// toggle `is_loading`.
    #[instrument(skip(self, comment))]
    pub async fn rate_song(&self, id: &str, score: u8, comment: Option<String>) -> ApiResult<Rating> {
        self.state.send_modify(|s| s.error = None);

        let data = CreateRatingData { score, comment };
        let rating = match self.service.rate_song(id, &data).await {
            Ok(rating) => rating,
            Err(e) => {
                record_error(&self.state, &e, RATE_SONG_FAILED);
                return Err(e);
            }
        };

        self.state.send_modify(|s| {
            if let Some(song) = s.songs.iter_mut().find(|song| song.id == id) {
                utils::apply_rating(song, score);
            }
            if let Some(song) = s.current_song.as_mut().filter(|song| song.id == id) {
                utils::apply_rating(song, score);
            }
        });

        Ok(rating)
    }

    pub fn clear_current_song(&self) {
        self.state.send_modify(|s| {
            s.current_song = None;
            s.current_song_content = None;
        });
    }

    /// Leaves search mode.
    pub fn clear_search(&self) {
        self.state.send_modify(|s| {
            s.search_query.clear();
            s.search_filters = SongSearchFilters::default();
            s.search_results.clear();
        });
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }
}
