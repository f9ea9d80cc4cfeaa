//! Lyrics repository trait and implementation
//!
//! One row per `(track, provider)` pair; the rows for a track form its
//! provider-to-lyrics map. Rows are written only for provider successes,
//! so the stored map never regresses from a success to a failure.

use crate::error::{Result, StoreError};
use crate::models::{LyricsEntry, TrackId};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::debug;

/// Lyrics repository interface for data access operations
#[async_trait]
pub trait LyricsRepository: Send + Sync {
    /// All stored lyrics for a track, keyed by provider name
    ///
    /// Returns an empty map when nothing has been stored yet.
    async fn find_by_track(&self, track_id: TrackId) -> Result<BTreeMap<String, String>>;

    /// Insert or replace one provider's lyrics for a track
    ///
    /// # Errors
    /// Returns error if:
    /// - Entry validation fails
    /// - The referenced track does not exist
    /// - Database error occurs
    async fn upsert(&self, entry: &LyricsEntry) -> Result<()>;
}

/// SQLite implementation of LyricsRepository
pub struct SqliteLyricsRepository {
    pool: SqlitePool,
}

impl SqliteLyricsRepository {
    /// Create a new SQLite lyrics repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LyricsRepository for SqliteLyricsRepository {
    async fn find_by_track(&self, track_id: TrackId) -> Result<BTreeMap<String, String>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT provider, content FROM track_lyrics WHERE track_id = ?")
                .bind(track_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().collect())
    }

    async fn upsert(&self, entry: &LyricsEntry) -> Result<()> {
        // Validate before insertion
        entry.validate().map_err(|e| StoreError::InvalidInput {
            field: "Lyrics".to_string(),
            message: e,
        })?;

        sqlx::query(
            r#"
            INSERT INTO track_lyrics (track_id, provider, content, fetched_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(track_id, provider) DO UPDATE SET
                content = excluded.content,
                fetched_at = excluded.fetched_at
            "#,
        )
        .bind(entry.track_id)
        .bind(&entry.provider)
        .bind(&entry.content)
        .bind(entry.fetched_at)
        .execute(&self.pool)
        .await?;

        debug!(track_id = %entry.track_id, provider = %entry.provider, "Stored lyrics");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::TrackCandidate;
    use crate::repositories::track::{SqliteTrackRepository, TrackRepository};

    async fn setup_track(pool: &SqlitePool, id: i64) -> TrackId {
        let repo = SqliteTrackRepository::new(pool.clone());
        repo.upsert_candidate(&TrackCandidate {
            id: TrackId(id),
            title: format!("Track {}", id),
            artists: vec!["Artist".to_string()],
            cover_uri: None,
        })
        .await
        .unwrap();
        TrackId(id)
    }

    #[tokio::test]
    async fn test_empty_map_for_unfetched_track() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteLyricsRepository::new(pool.clone());
        let track_id = setup_track(&pool, 1).await;

        let map = repo.find_by_track(track_id).await.unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_and_find_lyrics() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteLyricsRepository::new(pool.clone());
        let track_id = setup_track(&pool, 1).await;

        repo.upsert(&LyricsEntry::new(track_id, "genius", "Line one\nLine two"))
            .await
            .unwrap();

        let map = repo.find_by_track(track_id).await.unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("genius").map(String::as_str), Some("Line one\nLine two"));
    }

    #[tokio::test]
    async fn test_map_holds_one_entry_per_provider() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteLyricsRepository::new(pool.clone());
        let track_id = setup_track(&pool, 1).await;

        for provider in ["genius", "azlyrics", "google"] {
            repo.upsert(&LyricsEntry::new(track_id, provider, format!("{} text", provider)))
                .await
                .unwrap();
        }

        let map = repo.find_by_track(track_id).await.unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("azlyrics").map(String::as_str), Some("azlyrics text"));
    }

    #[tokio::test]
    async fn test_newer_success_replaces_older() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteLyricsRepository::new(pool.clone());
        let track_id = setup_track(&pool, 1).await;

        repo.upsert(&LyricsEntry::new(track_id, "genius", "First fetch"))
            .await
            .unwrap();
        repo.upsert(&LyricsEntry::new(track_id, "genius", "Second fetch"))
            .await
            .unwrap();

        let map = repo.find_by_track(track_id).await.unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("genius").map(String::as_str), Some("Second fetch"));
    }

    #[tokio::test]
    async fn test_maps_are_isolated_per_track() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteLyricsRepository::new(pool.clone());
        let first = setup_track(&pool, 1).await;
        let second = setup_track(&pool, 2).await;

        repo.upsert(&LyricsEntry::new(first, "genius", "First track text"))
            .await
            .unwrap();

        let map = repo.find_by_track(second).await.unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_rejects_empty_content() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteLyricsRepository::new(pool.clone());
        let track_id = setup_track(&pool, 1).await;

        let mut entry = LyricsEntry::new(track_id, "genius", "text");
        entry.content = "".to_string();

        let result = repo.upsert(&entry).await;
        assert!(matches!(result, Err(StoreError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_upsert_requires_existing_track() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteLyricsRepository::new(pool);

        let result = repo
            .upsert(&LyricsEntry::new(TrackId(404), "genius", "orphan"))
            .await;
        assert!(result.is_err());
    }
}
