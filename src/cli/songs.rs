use std::path::{Path, PathBuf};

use clap::Args;
use colored::Colorize;
use tabled::Table;

use crate::{
    cli::App,
    info,
    router::with_query,
    success,
    types::{
        CreateSongData, Difficulty, ExportFormat, Genre, Note, PaginatedResponse, SearchParams,
        Song, SongSearchFilters, SortOrder, UpdateSongContentData, UpdateSongData,
    },
    utils, warning,
};

/// Paging, sorting and filter flags shared by the listing commands.
#[derive(Args, Debug, Clone, Default)]
pub struct ListOptions {
    /// Page to start from
    #[clap(long)]
    pub page: Option<u32>,

    /// Songs per page
    #[clap(long)]
    pub size: Option<u32>,

    /// Field to sort by (e.g. created_at, title, average_rating)
    #[clap(long)]
    pub sort: Option<String>,

    /// Sort direction
    #[clap(long)]
    pub order: Option<SortOrder>,

    /// Keep loading pages until the last one
    #[clap(long)]
    pub all: bool,

    /// Key signature, e.g. G or F#
    #[clap(long)]
    pub key: Option<Note>,

    #[clap(long)]
    pub difficulty: Option<Difficulty>,

    #[clap(long)]
    pub genre: Option<Genre>,

    #[clap(long)]
    pub capo: Option<u8>,

    #[clap(long)]
    pub bpm_min: Option<u32>,

    #[clap(long)]
    pub bpm_max: Option<u32>,

    /// Minimum average rating
    #[clap(long)]
    pub rating_min: Option<f64>,
}

impl ListOptions {
    pub fn filters(&self) -> SongSearchFilters {
        SongSearchFilters {
            key_signature: self.key,
            difficulty: self.difficulty,
            genre: self.genre,
            capo_position: self.capo,
            bpm_min: self.bpm_min,
            bpm_max: self.bpm_max,
            rating_min: self.rating_min,
        }
    }

    pub fn params(&self) -> SearchParams {
        SearchParams {
            page: self.page,
            size: self.size,
            sort: self.sort.clone(),
            order: self.order,
            query: None,
            filters: self.filters(),
        }
    }
}

/// Song metadata flags for `create` and `update`.
#[derive(Args, Debug, Clone, Default)]
pub struct SongFields {
    #[clap(long)]
    pub title: Option<String>,

    #[clap(long)]
    pub artist: Option<String>,

    /// Key signature, e.g. G or Bb
    #[clap(long)]
    pub key: Option<Note>,

    #[clap(long)]
    pub capo: Option<u8>,

    #[clap(long)]
    pub bpm: Option<u32>,

    #[clap(long)]
    pub difficulty: Option<Difficulty>,

    #[clap(long)]
    pub genre: Option<Genre>,

    #[clap(long)]
    pub description: Option<String>,

    /// Make the song visible to everyone
    #[clap(long)]
    pub public: Option<bool>,

    /// Lyrics with inline chords, e.g. `[G]Today is [D]gonna be the day`
    #[clap(long)]
    pub lyrics_file: Option<PathBuf>,
}

impl SongFields {
    fn update_data(&self) -> UpdateSongData {
        UpdateSongData {
            title: self.title.clone(),
            artist: self.artist.clone(),
            key_signature: self.key,
            capo_position: self.capo,
            bpm: self.bpm,
            difficulty: self.difficulty,
            genre: self.genre,
            description: self.description.clone(),
            is_public: self.public,
        }
    }

    fn has_metadata(&self) -> bool {
        self.title.is_some()
            || self.artist.is_some()
            || self.key.is_some()
            || self.capo.is_some()
            || self.bpm.is_some()
            || self.difficulty.is_some()
            || self.genre.is_some()
            || self.description.is_some()
            || self.public.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shelf {
    Popular,
    Latest,
    Recommended,
}

/// Lists songs, or searches when a query or any filter is given.
pub async fn list_songs(app: &mut App, query: Option<String>, opts: ListOptions) {
    let query = query.filter(|q| !q.trim().is_empty());
    let filters = opts.filters();
    let mut location_query = Vec::new();
    if let Some(q) = &query {
        location_query.push(("query".to_string(), q.clone()));
    }
    location_query.extend(filters.to_query());
    if !app.open(&with_query("/browse", &location_query)) {
        return;
    }

    let pb = utils::spinner("Loading songs...");
    let result = if query.is_some() || !filters.is_empty() {
        app.songs
            .search_songs(query.as_deref().unwrap_or_default(), filters)
            .await
    } else {
        app.songs.fetch_songs(opts.params()).await
    };
    if let Err(e) = result {
        pb.finish_and_clear();
        app.fail("Cannot load songs", e);
    }

    if opts.all {
        loop {
            match app.songs.load_more_songs().await {
                Ok(Some(page)) => pb.set_message(format!(
                    "Loading songs... page {} of {}",
                    page.pagination.page, page.pagination.pages
                )),
                Ok(None) => break,
                Err(e) => {
                    pb.finish_and_clear();
                    warning!("Stopped loading more songs: {}", e.message);
                    break;
                }
            }
        }
    }
    pb.finish_and_clear();

    let state = app.songs.state();
    print_songs(state.filtered_songs());
    let pagination = state.pagination;
    info!(
        "Page {} of {} ({} songs){}",
        pagination.page,
        pagination.pages.max(1),
        pagination.total,
        if state.has_more() && !opts.all {
            " - use --all to load the rest"
        } else {
            ""
        }
    );
}

pub async fn show_song(app: &mut App, id: &str, with_content: bool) {
    if !app.open(&format!("/song/{id}")) {
        return;
    }

    let song = match app.songs.get_song(id).await {
        Ok(song) => song,
        Err(e) => app.fail("Cannot load song", e),
    };
    print_song(&song);

    if with_content {
        println!();
        show_content_of(app, id).await;
    }
}

pub async fn show_song_content(app: &mut App, id: &str) {
    if !app.open(&format!("/song/{id}")) {
        return;
    }
    show_content_of(app, id).await;
}

async fn show_content_of(app: &App, id: &str) {
    match app.songs.get_song_content(id).await {
        Ok(content) => println!("{}", utils::render_chord_sheet(&content)),
        Err(e) => app.fail("Cannot load song content", e),
    }
}

pub async fn create_song(app: &mut App, fields: SongFields) {
    if !app.open("/edit") {
        return;
    }

    let (Some(title), Some(artist), Some(key)) = (fields.title.clone(), fields.artist.clone(), fields.key) else {
        crate::error!("--title, --artist and --key are required to create a song");
    };
    let data = CreateSongData {
        title,
        artist,
        key_signature: key,
        capo_position: fields.capo,
        bpm: fields.bpm,
        difficulty: fields.difficulty,
        genre: fields.genre,
        description: fields.description.clone(),
        is_public: fields.public,
    };

    let song = match app.songs.create_song(&data).await {
        Ok(song) => song,
        Err(e) => app.fail("Cannot create song", e),
    };
    success!("Created {} ({})", song.title.bold(), song.id);

    if let Some(path) = &fields.lyrics_file {
        save_lyrics(app, &song.id, path).await;
    }
}

pub async fn update_song(app: &mut App, id: &str, fields: SongFields) {
    if !app.open(&format!("/edit/{id}")) {
        return;
    }

    if !fields.has_metadata() && fields.lyrics_file.is_none() {
        warning!("Nothing to update.");
        return;
    }

    if fields.has_metadata() {
        match app.songs.update_song(id, &fields.update_data()).await {
            Ok(song) => success!("Updated {}", song.title.bold()),
            Err(e) => app.fail("Cannot update song", e),
        }
    }

    if let Some(path) = &fields.lyrics_file {
        save_lyrics(app, id, path).await;
    }
}

async fn save_lyrics(app: &App, id: &str, path: &Path) {
    let text = match async_fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) => crate::error!("Cannot read {}: {}", path.display(), e),
    };
    let (lyrics, chord_positions) = utils::parse_inline_chords(&text);
    let data = UpdateSongContentData {
        lyrics,
        chord_positions,
        structure_metadata: None,
    };

    match app.songs.update_song_content(id, &data).await {
        Ok(content) => success!(
            "Saved lyrics with {} chords",
            content.chord_positions.len()
        ),
        Err(e) => app.fail("Cannot save lyrics", e),
    }
}

pub async fn delete_song(app: &mut App, id: &str) {
    if !app.open(&format!("/edit/{id}")) {
        return;
    }

    match app.songs.delete_song(id).await {
        Ok(()) => success!("Deleted song {}", id),
        Err(e) => app.fail("Cannot delete song", e),
    }
}

pub async fn duplicate_song(app: &mut App, id: &str, title: Option<String>) {
    if !app.open(&format!("/edit/{id}")) {
        return;
    }

    match app.songs.duplicate_song(id, title.as_deref()).await {
        Ok(song) => success!("Duplicated as {} ({})", song.title.bold(), song.id),
        Err(e) => app.fail("Cannot duplicate song", e),
    }
}

pub async fn rate_song(app: &mut App, id: &str, score: u8, comment: Option<String>) {
    if !app.open(&format!("/song/{id}")) {
        return;
    }

    // Load the song first so the local average has something to fold into.
    if let Err(e) = app.songs.get_song(id).await {
        app.fail("Cannot load song", e);
    }

    match app.songs.rate_song(id, score, comment).await {
        Ok(rating) => {
            success!("Rated {}", "★".repeat(usize::from(rating.score.min(5))));
            if let Some(song) = app.songs.state().current_song {
                info!(
                    "Average rating is now {}",
                    utils::format_rating(song.average_rating, song.rating_count)
                );
            }
        }
        Err(e) => app.fail("Cannot rate song", e),
    }
}

pub async fn show_ratings(app: &mut App, id: &str, page: Option<u32>, size: Option<u32>) {
    if !app.open(&format!("/song/{id}")) {
        return;
    }

    let params = SearchParams {
        page,
        size,
        ..SearchParams::default()
    };
    match app.songs.service().get_song_ratings(id, &params).await {
        Ok(PaginatedResponse { items, pagination }) => {
            if items.is_empty() {
                info!("No ratings yet");
                return;
            }
            println!("{}", Table::new(utils::rating_table_rows(&items)));
            info!("Page {} of {}", pagination.page, pagination.pages.max(1));
        }
        Err(e) => app.fail("Cannot load ratings", e),
    }
}

pub async fn song_shelf(app: &mut App, shelf: Shelf, limit: u32) {
    if !app.open("/") {
        return;
    }

    let service = app.songs.service();
    let result = match shelf {
        Shelf::Popular => service.get_popular_songs(limit).await,
        Shelf::Latest => service.get_latest_songs(limit).await,
        Shelf::Recommended => service.get_recommended_songs(limit).await,
    };

    match result {
        Ok(songs) => print_songs(&songs),
        Err(e) => app.fail("Cannot load songs", e),
    }
}

pub async fn suggest(app: &mut App, query: &str, limit: u32) {
    if !app.open("/browse") {
        return;
    }

    match app.songs.service().get_search_suggestions(query, limit).await {
        Ok(suggestions) if suggestions.is_empty() => info!("No suggestions for '{}'", query),
        Ok(suggestions) => suggestions.iter().for_each(|s| println!("{s}")),
        Err(e) => app.fail("Cannot load suggestions", e),
    }
}

pub async fn export_song(app: &mut App, id: &str, format: ExportFormat, output: Option<PathBuf>) {
    if !app.open(&format!("/song/{id}")) {
        return;
    }

    let pb = utils::spinner(format!("Exporting as {format}..."));
    let result = app.songs.service().export_song(id, format).await;
    pb.finish_and_clear();

    let bytes = match result {
        Ok(bytes) => bytes,
        Err(e) => app.fail("Cannot export song", e),
    };
    let output = output.unwrap_or_else(|| PathBuf::from(format!("{id}.{format}")));
    if let Err(e) = async_fs::write(&output, &bytes).await {
        crate::error!("Cannot write {}: {}", output.display(), e);
    }
    success!("Saved {} ({} bytes)", output.display(), bytes.len());
}

pub async fn my_songs(app: &mut App, page: Option<u32>, size: Option<u32>) {
    if !app.open("/profile/songs") {
        app.report_session();
        return;
    }

    let params = SearchParams {
        page,
        size,
        ..SearchParams::default()
    };
    match app.songs.service().get_my_songs(&params).await {
        Ok(PaginatedResponse { items, pagination }) => {
            print_songs(&items);
            info!(
                "Page {} of {} ({} songs)",
                pagination.page,
                pagination.pages.max(1),
                pagination.total
            );
        }
        Err(e) => app.fail("Cannot load your songs", e),
    }
}

fn print_songs(songs: &[Song]) {
    if songs.is_empty() {
        info!("No songs found");
        return;
    }
    println!("{}", Table::new(utils::song_table_rows(songs)));
}

fn print_song(song: &Song) {
    println!("{} - {}", song.title.bold(), song.artist);
    println!("  key:        {}", song.key_signature);
    if song.capo_position > 0 {
        println!("  capo:       {}", song.capo_position);
    }
    if song.bpm > 0 {
        println!("  bpm:        {}", song.bpm);
    }
    println!("  difficulty: {}", song.difficulty);
    println!("  genre:      {}", song.genre);
    println!(
        "  rating:     {}",
        utils::format_rating(song.average_rating, song.rating_count)
    );
    println!("  views:      {}", song.view_count);
    if let Some(author) = &song.author {
        println!("  author:     {}", author.display_name);
    }
    if let Some(description) = &song.description {
        println!("\n{description}");
    }
}
