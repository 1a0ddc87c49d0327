use std::time::Duration;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};

use crate::types::{ChordPosition, Rating, RatingTableRow, Song, SongContent, SongTableRow};

/// Milliseconds since the epoch, used as the cache-busting `_t` parameter.
pub fn cache_buster() -> String {
    Utc::now().timestamp_millis().to_string()
}

/// Running average after one more score is added.
///
/// Returns the new `(average, count)`. This is a local estimate: it does not
/// know whether the server replaced an earlier score by the same user.
pub fn recompute_average(average: f64, count: u32, score: u8) -> (f64, u32) {
    let total = average * f64::from(count) + f64::from(score);
    let count = count + 1;
    (total / f64::from(count), count)
}

pub fn apply_rating(song: &mut Song, score: u8) {
    let (average, count) = recompute_average(song.average_rating, song.rating_count, score);
    song.average_rating = average;
    song.rating_count = count;
}

pub fn format_rating(average: f64, count: u32) -> String {
    if count == 0 {
        return "-".to_string();
    }
    format!("{average:.2} ({count})")
}

pub fn song_table_rows(songs: &[Song]) -> Vec<SongTableRow> {
    songs
        .iter()
        .map(|s| SongTableRow {
            id: s.id.clone(),
            title: s.title.clone(),
            artist: s.artist.clone(),
            key: if s.capo_position > 0 {
                format!("{} (capo {})", s.key_signature, s.capo_position)
            } else {
                s.key_signature.to_string()
            },
            difficulty: s.difficulty.to_string(),
            rating: format_rating(s.average_rating, s.rating_count),
            views: s.view_count,
        })
        .collect()
}

pub fn rating_table_rows(ratings: &[Rating]) -> Vec<RatingTableRow> {
    ratings
        .iter()
        .map(|r| RatingTableRow {
            score: "★".repeat(usize::from(r.score.min(5))),
            comment: r.comment.clone().unwrap_or_default(),
            date: r.created_at.chars().take(10).collect(),
        })
        .collect()
}

/// Spinner shown while a remote call is in flight.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb
}

/// Guesses an image MIME type from a file extension.
pub fn image_mime_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Splits inline chord notation (`[G]Hello [C]world`) into plain lyrics and
/// chord positions. Lines and columns are zero-based and columns count
/// characters of the lyric line.
pub fn parse_inline_chords(text: &str) -> (String, Vec<ChordPosition>) {
    let mut lyrics = Vec::new();
    let mut positions = Vec::new();

    for (line_idx, line) in text.lines().enumerate() {
        let mut lyric = String::new();
        let mut column = 0u32;
        let mut chars = line.chars();

        while let Some(c) = chars.next() {
            if c != '[' {
                lyric.push(c);
                column += 1;
                continue;
            }

            // An unclosed bracket is lyric text.
            let rest = chars.as_str();
            let Some(end) = rest.find(']') else {
                lyric.push(c);
                column += 1;
                continue;
            };
            let chord = rest[..end].trim();
            chars = rest[end + 1..].chars();
            if !chord.is_empty() {
                positions.push(ChordPosition {
                    line: line_idx as u32,
                    position: column,
                    chord: chord.to_string(),
                    duration: None,
                });
            }
        }
        lyrics.push(lyric);
    }

    (lyrics.join("\n"), positions)
}

/// Renders lyrics with each line's chords on the line above it.
pub fn render_chord_sheet(content: &SongContent) -> String {
    let mut out = Vec::new();

    for (line_idx, lyric) in content.lyrics.lines().enumerate() {
        let mut chords: Vec<&ChordPosition> = content
            .chord_positions
            .iter()
            .filter(|c| c.line as usize == line_idx)
            .collect();
        chords.sort_by_key(|c| c.position);

        if !chords.is_empty() {
            let mut chord_line = String::new();
            for chord in chords {
                let width = chord_line.chars().count();
                let target = chord.position as usize;
                if width < target {
                    chord_line.push_str(&" ".repeat(target - width));
                } else if width > 0 {
                    chord_line.push(' ');
                }
                chord_line.push_str(&chord.chord);
            }
            out.push(chord_line);
        }
        out.push(lyric.to_string());
    }

    out.join("\n")
}
