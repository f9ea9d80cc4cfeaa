//! Track repository trait and implementation

use crate::error::{Result, StoreError};
use crate::models::{Track, TrackCandidate, TrackId};
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};
use tracing::debug;

/// Track repository interface for data access operations
#[async_trait]
pub trait TrackRepository: Send + Sync {
    /// Find a track by its ID
    ///
    /// # Returns
    /// - `Ok(Some(track))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_id(&self, id: TrackId) -> Result<Option<Track>>;

    /// Insert or refresh a track from candidate metadata
    ///
    /// New tracks are created with `audio_ref` unset. For known tracks the
    /// title, artists and cover are refreshed in place; `audio_ref` and
    /// `created_at` are left untouched.
    ///
    /// # Errors
    /// Returns error if:
    /// - Candidate validation fails
    /// - Database error occurs
    async fn upsert_candidate(&self, candidate: &TrackCandidate) -> Result<()>;

    /// Record the acquired audio handle for a track
    ///
    /// # Errors
    /// Returns `NotFound` if the track does not exist
    async fn set_audio_reference(&self, id: TrackId, audio_ref: &str) -> Result<()>;
}

/// SQLite implementation of TrackRepository
pub struct SqliteTrackRepository {
    pool: SqlitePool,
}

impl SqliteTrackRepository {
    /// Create a new SQLite track repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrackRepository for SqliteTrackRepository {
    async fn find_by_id(&self, id: TrackId) -> Result<Option<Track>> {
        let track = query_as::<_, Track>("SELECT * FROM tracks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(track)
    }

    async fn upsert_candidate(&self, candidate: &TrackCandidate) -> Result<()> {
        // Validate candidate data
        candidate
            .validate()
            .map_err(|msg| StoreError::InvalidInput {
                field: "candidate".to_string(),
                message: msg,
            })?;

        let artists = serde_json::to_string(&candidate.artists).map_err(|e| {
            StoreError::InvalidInput {
                field: "artists".to_string(),
                message: e.to_string(),
            }
        })?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO tracks (id, title, artists, cover_uri, audio_ref, created_at, updated_at)
            VALUES (?, ?, ?, ?, NULL, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                artists = excluded.artists,
                cover_uri = excluded.cover_uri,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(candidate.id)
        .bind(&candidate.title)
        .bind(&artists)
        .bind(&candidate.cover_uri)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(track_id = %candidate.id, "Upserted track metadata");
        Ok(())
    }

    async fn set_audio_reference(&self, id: TrackId, audio_ref: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query("UPDATE tracks SET audio_ref = ?, updated_at = ? WHERE id = ?")
            .bind(audio_ref)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity_type: "Track".to_string(),
                id: id.to_string(),
            });
        }

        debug!(track_id = %id, audio_ref = %audio_ref, "Recorded audio reference");
        Ok(())
    }
}
