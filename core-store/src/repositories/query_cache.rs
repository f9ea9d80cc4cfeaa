//! Query cache repository trait and implementations
//!
//! Caches upstream search payloads keyed by the exact query text as typed.
//! No normalization is applied: two queries differing in case or whitespace
//! are distinct entries.

use crate::error::{Result, StoreError};
use async_trait::async_trait;
use lru::LruCache;
use serde_json::Value;
use sqlx::SqlitePool;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

/// Query cache interface for payload lookup and storage
#[async_trait]
pub trait QueryCacheRepository: Send + Sync {
    /// Look up the stored payload for the exact query text
    ///
    /// # Returns
    /// - `Ok(Some(payload))` on a hit
    /// - `Ok(None)` on a miss
    /// - `Err` if the backend fails; callers treat unavailability as a miss
    ///   plus a fallback to the live source
    async fn lookup(&self, query_text: &str) -> Result<Option<Value>>;

    /// Store a payload under the exact query text
    ///
    /// Replaces any previously stored payload for the same text
    /// (last-write-wins). Concurrent writers may trample each other; the
    /// final state is one writer's complete payload, never a blend.
    async fn store(&self, query_text: &str, payload: &Value) -> Result<()>;
}

/// SQLite implementation of QueryCacheRepository
pub struct SqliteQueryCacheRepository {
    pool: SqlitePool,
}

impl SqliteQueryCacheRepository {
    /// Create a new SQLite query cache repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryCacheRepository for SqliteQueryCacheRepository {
    async fn lookup(&self, query_text: &str) -> Result<Option<Value>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT payload FROM search_queries WHERE query_text = ?")
                .bind(query_text)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((payload,)) => {
                let value = serde_json::from_str(&payload).map_err(|e| {
                    StoreError::Corrupt(format!("search payload for {:?}: {}", query_text, e))
                })?;
                debug!(query = %query_text, "Query cache hit");
                Ok(Some(value))
            }
            None => {
                debug!(query = %query_text, "Query cache miss");
                Ok(None)
            }
        }
    }

    async fn store(&self, query_text: &str, payload: &Value) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO search_queries (query_text, payload, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(query_text) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(query_text)
        .bind(payload.to_string())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(query = %query_text, "Stored search payload");
        Ok(())
    }
}

/// Query cache with an in-memory LRU layer in front of a durable backend.
///
/// Hot entries are served without touching the database. The hot layer is
/// populated on store and on lookup hits, and holds clones of the payloads;
/// the durable backend stays authoritative.
pub struct LayeredQueryCache {
    inner: Arc<dyn QueryCacheRepository>,
    hot: parking_lot::Mutex<LruCache<String, Value>>,
}

impl LayeredQueryCache {
    /// Wrap a durable cache with an LRU hot layer of the given capacity
    pub fn new(inner: Arc<dyn QueryCacheRepository>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            hot: parking_lot::Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of entries currently in the hot layer
    pub fn hot_len(&self) -> usize {
        self.hot.lock().len()
    }
}

#[async_trait]
impl QueryCacheRepository for LayeredQueryCache {
    async fn lookup(&self, query_text: &str) -> Result<Option<Value>> {
        if let Some(payload) = self.hot.lock().get(query_text).cloned() {
            debug!(query = %query_text, "Hot layer hit");
            return Ok(Some(payload));
        }

        let found = self.inner.lookup(query_text).await?;
        if let Some(ref payload) = found {
            self.hot
                .lock()
                .put(query_text.to_string(), payload.clone());
        }
        Ok(found)
    }

    async fn store(&self, query_text: &str, payload: &Value) -> Result<()> {
        // Durable write first; the hot layer never holds a payload the
        // backend rejected.
        self.inner.store(query_text, payload).await?;
        self.hot
            .lock()
            .put(query_text.to_string(), payload.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use serde_json::json;

    fn sample_payload() -> Value {
        json!({
            "tracks": {
                "items": [
                    { "id": 42, "title": "Intro", "artists": [{ "name": "The xx" }] }
                ]
            }
        })
    }

    #[tokio::test]
    async fn test_lookup_miss_returns_none() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteQueryCacheRepository::new(pool);

        let found = repo.lookup("never stored").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_store_and_lookup_roundtrip() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteQueryCacheRepository::new(pool);
        let payload = sample_payload();

        repo.store("the xx intro", &payload).await.unwrap();

        let found = repo.lookup("the xx intro").await.unwrap();
        assert_eq!(found, Some(payload));
    }

    #[tokio::test]
    async fn test_lookup_is_exact_match() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteQueryCacheRepository::new(pool);

        repo.store("the xx intro", &sample_payload()).await.unwrap();

        // Case and whitespace variants are distinct keys
        assert!(repo.lookup("The xx intro").await.unwrap().is_none());
        assert!(repo.lookup("the xx intro ").await.unwrap().is_none());
        assert!(repo.lookup(" the xx intro").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_is_last_write_wins() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteQueryCacheRepository::new(pool);

        let first = json!({"tracks": {"items": [{"id": 1}]}});
        let second = json!({"tracks": {"items": [{"id": 2}]}});

        repo.store("query", &first).await.unwrap();
        repo.store("query", &second).await.unwrap();

        let found = repo.lookup("query").await.unwrap();
        assert_eq!(found, Some(second));
    }

    #[tokio::test]
    async fn test_store_keeps_one_row_per_key() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteQueryCacheRepository::new(pool.clone());

        repo.store("query", &json!({"v": 1})).await.unwrap();
        repo.store("query", &json!({"v": 2})).await.unwrap();
        repo.store("other", &json!({"v": 3})).await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM search_queries")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 2);
    }

    #[tokio::test]
    async fn test_layered_cache_serves_from_hot_layer() {
        let pool = create_test_pool().await.unwrap();
        let inner = Arc::new(SqliteQueryCacheRepository::new(pool.clone()));
        let cache = LayeredQueryCache::new(inner, 16);
        let payload = sample_payload();

        cache.store("the xx intro", &payload).await.unwrap();
        assert_eq!(cache.hot_len(), 1);

        // Remove the durable row; the hot layer still answers
        sqlx::query("DELETE FROM search_queries")
            .execute(&pool)
            .await
            .unwrap();

        let found = cache.lookup("the xx intro").await.unwrap();
        assert_eq!(found, Some(payload));
    }

    #[tokio::test]
    async fn test_layered_cache_promotes_on_lookup() {
        let pool = create_test_pool().await.unwrap();
        let inner = Arc::new(SqliteQueryCacheRepository::new(pool.clone()));

        // Seed through a plain repository so the hot layer starts cold
        inner.store("seeded", &sample_payload()).await.unwrap();

        let cache = LayeredQueryCache::new(inner, 16);
        assert_eq!(cache.hot_len(), 0);

        let found = cache.lookup("seeded").await.unwrap();
        assert!(found.is_some());
        assert_eq!(cache.hot_len(), 1);
    }

    #[tokio::test]
    async fn test_layered_cache_evicts_beyond_capacity() {
        let pool = create_test_pool().await.unwrap();
        let inner = Arc::new(SqliteQueryCacheRepository::new(pool));
        let cache = LayeredQueryCache::new(inner, 2);

        cache.store("a", &json!({"v": 1})).await.unwrap();
        cache.store("b", &json!({"v": 2})).await.unwrap();
        cache.store("c", &json!({"v": 3})).await.unwrap();

        assert_eq!(cache.hot_len(), 2);

        // Evicted entries still come back from the durable layer
        let found = cache.lookup("a").await.unwrap();
        assert_eq!(found, Some(json!({"v": 1})));
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_reported() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteQueryCacheRepository::new(pool.clone());

        sqlx::query(
            "INSERT INTO search_queries (query_text, payload, created_at, updated_at) \
             VALUES ('bad', 'not json', 0, 0)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let err = repo.lookup("bad").await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}
