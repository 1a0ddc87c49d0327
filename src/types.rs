use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::error::ApiErrorBody;

/// Declares a closed set of string values used on the wire, together with
/// `Display` and `FromStr` so the same values work in query strings and on the
/// command line.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim();
                $name::ALL
                    .iter()
                    .find(|v| v.as_str().eq_ignore_ascii_case(needle))
                    .copied()
                    .ok_or_else(|| {
                        let valid: Vec<&str> = $name::ALL.iter().map(|v| v.as_str()).collect();
                        format!("invalid value '{}', expected one of: {}", s, valid.join(", "))
                    })
            }
        }
    };
}

wire_enum! {
    /// Pitch class as written in key signatures and chord roots.
    Note {
        C => "C",
        CSharp => "C#",
        DFlat => "Db",
        D => "D",
        DSharp => "D#",
        EFlat => "Eb",
        E => "E",
        F => "F",
        FSharp => "F#",
        GFlat => "Gb",
        G => "G",
        GSharp => "G#",
        AFlat => "Ab",
        A => "A",
        ASharp => "A#",
        BFlat => "Bb",
        B => "B",
    }
}

wire_enum! {
    Difficulty {
        Beginner => "beginner",
        Intermediate => "intermediate",
        Advanced => "advanced",
        Expert => "expert",
    }
}

wire_enum! {
    Genre {
        Pop => "pop",
        Rock => "rock",
        Folk => "folk",
        Country => "country",
        Jazz => "jazz",
        Blues => "blues",
        Classical => "classical",
        Other => "other",
    }
}

wire_enum! {
    SortOrder {
        Asc => "asc",
        Desc => "desc",
    }
}

wire_enum! {
    /// Output format accepted by the song export endpoint.
    ExportFormat {
        Pdf => "pdf",
        Txt => "txt",
        Json => "json",
    }
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat::Pdf
    }
}

// Wire envelope

/// Uniform wrapper around every API response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

fn default_success() -> bool {
    true
}

impl<T> ApiResponse<T> {
    /// Envelope used for responses that carry no body at all.
    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub size: u32,
    pub total: u64,
    pub pages: u32,
}

impl Pagination {
    pub fn first_page(size: u32) -> Self {
        Self {
            page: 1,
            size,
            total: 0,
            pages: 0,
        }
    }

    pub fn has_more(&self) -> bool {
        self.page < self.pages
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::first_page(20)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

// Users & authentication

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_me: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterData {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub tokens: AuthTokens,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordData {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarResponse {
    pub avatar_url: String,
}

/// Image file sent to the avatar upload endpoint as multipart form data.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: String,
    #[serde(default)]
    pub song_count: Option<u32>,
}

// Songs

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongAuthor {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub artist: String,
    pub key_signature: Note,
    #[serde(default)]
    pub capo_position: u8,
    #[serde(default)]
    pub bpm: u32,
    pub difficulty: Difficulty,
    pub genre: Genre,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub rating_count: u32,
    #[serde(default)]
    pub view_count: u32,
    #[serde(default)]
    pub is_public: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub author: Option<SongAuthor>,
}

/// A chord placed above a lyric line, addressed by line and column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordPosition {
    pub line: u32,
    pub position: u32,
    pub chord: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionRange {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    pub default_bpm: u32,
    pub scroll_speed: f64,
    pub auto_scroll_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SongStructure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<SectionRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verse1: Option<SectionRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chorus: Option<SectionRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verse2: Option<SectionRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge: Option<SectionRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outro: Option<SectionRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playback_settings: Option<PlaybackSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongContent {
    pub id: String,
    pub song_id: String,
    pub lyrics: String,
    #[serde(default)]
    pub chord_positions: Vec<ChordPosition>,
    #[serde(default)]
    pub structure_metadata: SongStructure,
    pub version_created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSongData {
    pub title: String,
    pub artist: String,
    pub key_signature: Note,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capo_position: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<Genre>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

/// Partial song update; only the fields that are set are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSongData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_signature: Option<Note>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capo_position: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<Genre>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSongContentData {
    pub lyrics: String,
    pub chord_positions: Vec<ChordPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure_metadata: Option<SongStructure>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateSongData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

// Ratings

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: String,
    pub user_id: String,
    pub song_id: String,
    pub score: u8,
    #[serde(default)]
    pub comment: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRatingData {
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRatingData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

// Searching

/// Sparse song filters. Only the fields that are set end up in the query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SongSearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_signature: Option<Note>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<Genre>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capo_position: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm_max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_min: Option<f64>,
}

impl SongSearchFilters {
    pub fn is_empty(&self) -> bool {
        self.to_query().is_empty()
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        push_param(&mut query, "key_signature", self.key_signature);
        push_param(&mut query, "difficulty", self.difficulty);
        push_param(&mut query, "genre", self.genre);
        push_param(&mut query, "capo_position", self.capo_position);
        push_param(&mut query, "bpm_min", self.bpm_min);
        push_param(&mut query, "bpm_max", self.bpm_max);
        push_param(&mut query, "rating_min", self.rating_min);
        query
    }
}

/// Listing parameters shared by the song endpoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
    pub order: Option<SortOrder>,
    pub query: Option<String>,
    pub filters: SongSearchFilters,
}

impl SearchParams {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    /// Query pairs in the order the server documents them. Zero page or size
    /// values and empty strings are treated as absent.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        push_param(&mut query, "page", self.page.filter(|p| *p > 0));
        push_param(&mut query, "size", self.size.filter(|s| *s > 0));
        push_param(&mut query, "sort", self.sort.as_deref());
        push_param(&mut query, "order", self.order);
        push_param(&mut query, "query", self.query.as_deref());
        query.extend(self.filters.to_query());
        query
    }

    /// Only the paging pair, as used by the ratings listing.
    pub fn paging_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        push_param(&mut query, "page", self.page.filter(|p| *p > 0));
        push_param(&mut query, "size", self.size.filter(|s| *s > 0));
        query
    }
}

fn push_param<V: ToString>(query: &mut Vec<(String, String)>, key: &str, value: Option<V>) {
    if let Some(value) = value {
        let value = value.to_string();
        if !value.is_empty() {
            query.push((key.to_string(), value));
        }
    }
}

// Terminal output

#[derive(Tabled)]
pub struct SongTableRow {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub key: String,
    pub difficulty: String,
    pub rating: String,
    pub views: u32,
}

#[derive(Tabled)]
pub struct RatingTableRow {
    pub score: String,
    pub comment: String,
    pub date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_wire_values() {
        assert_eq!(serde_json::to_string(&Note::CSharp).unwrap(), "\"C#\"");
        assert_eq!("bb".parse::<Note>().unwrap(), Note::BFlat);
        assert!("H".parse::<Note>().is_err());
    }

    #[test]
    fn test_empty_filters_produce_no_query() {
        let filters = SongSearchFilters::default();
        assert!(filters.is_empty());
        assert!(filters.to_query().is_empty());
    }

    #[test]
    fn test_search_params_skip_absent_and_empty_values() {
        let params = SearchParams {
            page: Some(2),
            size: None,
            sort: Some(String::new()),
            order: Some(SortOrder::Desc),
            query: Some("wonderwall".to_string()),
            filters: SongSearchFilters {
                genre: Some(Genre::Rock),
                capo_position: Some(2),
                ..SongSearchFilters::default()
            },
        };

        let query = params.to_query();
        let keys: Vec<&str> = query.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["page", "order", "query", "genre", "capo_position"]);
        assert!(query.contains(&("genre".to_string(), "rock".to_string())));
    }

    #[test]
    fn test_envelope_without_data_defaults() {
        let envelope: ApiResponse<serde_json::Value> =
            serde_json::from_str(r#"{"message":"ok"}"#).unwrap();
        assert!(envelope.success);
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_song_deserializes_with_optional_fields_missing() {
        let json = serde_json::json!({
            "id": "s1",
            "author_id": "u1",
            "title": "Hallelujah",
            "artist": "Leonard Cohen",
            "key_signature": "C",
            "difficulty": "beginner",
            "genre": "folk",
            "created_at": "2024-01-01T00:00:00",
            "updated_at": "2024-01-01T00:00:00"
        });
        let song: Song = serde_json::from_value(json).unwrap();
        assert_eq!(song.rating_count, 0);
        assert!(song.author.is_none());
        assert_eq!(song.key_signature, Note::C);
    }

    #[test]
    fn test_collection_defaults() {
        let collection: Collection = serde_json::from_value(serde_json::json!({
            "id": "c1",
            "user_id": "u1",
            "name": "Campfire",
            "created_at": "2024-01-01T00:00:00"
        }))
        .unwrap();
        assert!(!collection.is_default);
        assert!(collection.song_count.is_none());
    }
}
