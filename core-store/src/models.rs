//! Domain models for the resolution pipeline
//!
//! This module contains rich domain models with validation and database mapping.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

// =============================================================================
// ID Types
// =============================================================================

/// Unique identifier for a track, assigned by the upstream catalogue
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct TrackId(pub i64);

impl TrackId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for TrackId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Cover Art
// =============================================================================

/// Host prefix the upstream uses for raw cover art paths
const COVER_HOST_PREFIX: &str = "avatars.yandex.net/get-music-content/";

/// Size requested when a full-resolution cover is wanted
pub const COVER_SIZE_FULL: &str = "1000x1000";

/// Build a fetchable cover art URL from a raw `coverUri` payload value.
///
/// Raw values look like `avatars.yandex.net/get-music-content/<path>/%%`;
/// the trailing `%%` placeholder stands in for a concrete size such as
/// `1000x1000`. Returns `None` when the value does not carry a usable path.
pub fn cover_art_url(cover_uri: &str, size: &str) -> Option<String> {
    let rest = cover_uri.trim().strip_prefix(COVER_HOST_PREFIX)?;
    let path = rest
        .strip_suffix("%%")
        .unwrap_or(rest)
        .trim_end_matches('/');
    if path.is_empty() {
        return None;
    }
    Some(format!("https://{}{}/{}", COVER_HOST_PREFIX, path, size))
}

// =============================================================================
// Track
// =============================================================================

/// A track candidate extracted from a search payload.
///
/// Candidates are derived views over the stored payload and are never
/// mutated after extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackCandidate {
    /// Catalogue identifier
    pub id: TrackId,
    /// Track title as reported by the upstream
    pub title: String,
    /// Artist names, in upstream order
    pub artists: Vec<String>,
    /// Raw cover art path, with the size placeholder still in place
    pub cover_uri: Option<String>,
}

impl TrackCandidate {
    /// Validate candidate data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.0 <= 0 {
            return Err("Track id must be positive".to_string());
        }
        if self.title.trim().is_empty() {
            return Err("Track title cannot be empty".to_string());
        }
        Ok(())
    }

    /// Fetchable cover art URL at the given size, if the candidate has one
    pub fn cover_art_url(&self, size: &str) -> Option<String> {
        self.cover_uri
            .as_deref()
            .and_then(|uri| cover_art_url(uri, size))
    }

    /// Human-readable "Artists - Title" label
    pub fn display_name(&self) -> String {
        if self.artists.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.artists.join(", "), self.title)
        }
    }
}

/// A persisted track with its acquisition state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Catalogue identifier (primary key)
    pub id: TrackId,
    /// Track title
    pub title: String,
    /// Artist names, stored as a JSON array
    pub artists: Vec<String>,
    /// Raw cover art path
    pub cover_uri: Option<String>,
    /// Opaque handle to acquired audio; `None` until acquisition succeeds
    pub audio_ref: Option<String>,
    /// Creation timestamp (Unix epoch seconds)
    pub created_at: i64,
    /// Last update timestamp (Unix epoch seconds)
    pub updated_at: i64,
}

impl Track {
    /// Create a new track from candidate metadata, not yet acquired
    pub fn new(
        id: TrackId,
        title: impl Into<String>,
        artists: Vec<String>,
        cover_uri: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id,
            title: title.into(),
            artists,
            cover_uri,
            audio_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate track data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.0 <= 0 {
            return Err("Track id must be positive".to_string());
        }
        if self.title.trim().is_empty() {
            return Err("Track title cannot be empty".to_string());
        }
        Ok(())
    }

    /// Artist names joined for display and provider queries
    pub fn artists_joined(&self) -> String {
        self.artists.join(", ")
    }

    /// Human-readable "Artists - Title" label
    pub fn display_name(&self) -> String {
        if self.artists.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.artists_joined(), self.title)
        }
    }

    /// Free-text search string used when acquiring audio for this track
    pub fn search_text(&self) -> String {
        if self.artists.is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.title, self.artists_joined())
        }
    }

    /// Fetchable cover art URL at the given size, if the track has one
    pub fn cover_art_url(&self, size: &str) -> Option<String> {
        self.cover_uri
            .as_deref()
            .and_then(|uri| cover_art_url(uri, size))
    }
}

// The artists column holds a JSON array, so row mapping is spelled out
// instead of derived.
impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for Track {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        use sqlx::Row;

        let artists_json: String = row.try_get("artists")?;
        let artists: Vec<String> =
            serde_json::from_str(&artists_json).map_err(|e| sqlx::Error::ColumnDecode {
                index: "artists".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            artists,
            cover_uri: row.try_get("cover_uri")?,
            audio_ref: row.try_get("audio_ref")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

// =============================================================================
// Lyrics
// =============================================================================

/// One provider's stored lyrics text for a track.
///
/// The `(track_id, provider)` pair is unique; together the rows for a track
/// form its provider-to-lyrics map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LyricsEntry {
    /// Track the lyrics belong to
    pub track_id: TrackId,
    /// Provider name (e.g., "genius", "azlyrics", "google")
    pub provider: String,
    /// Lyrics text as returned by the provider
    pub content: String,
    /// Fetch timestamp (Unix epoch seconds)
    pub fetched_at: i64,
}

impl LyricsEntry {
    /// Create a new lyrics entry stamped with the current time
    pub fn new(track_id: TrackId, provider: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            track_id,
            provider: provider.into(),
            content: content.into(),
            fetched_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Validate lyrics data
    pub fn validate(&self) -> Result<(), String> {
        if self.provider.trim().is_empty() {
            return Err("Lyrics provider cannot be empty".to_string());
        }
        if self.content.trim().is_empty() {
            return Err("Lyrics content cannot be empty".to_string());
        }
        Ok(())
    }
}
