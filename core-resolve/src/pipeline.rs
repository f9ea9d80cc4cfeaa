//! # Resolution Pipeline
//!
//! Orchestrates query resolution, lyrics aggregation, and audio acquisition.
//!
//! ## Overview
//!
//! The `ResolutionPipeline` is the facade the presentation layer talks to.
//! It coordinates:
//! - Payload caching via `QueryCacheRepository` (exact query text as key)
//! - Upstream search via a `SearchProvider` implementation
//! - Candidate extraction and metadata upserts via `TrackRepository`
//! - Lyrics fan-out via `LyricsAggregator`
//! - Audio downloads via `AudioAcquirer`
//!
//! ## Workflow
//!
//! ### Resolve
//! 1. Look the exact query text up in the query cache
//! 2. On a miss, call the search upstream and cache the payload best-effort
//! 3. If the cache is unavailable, fall back to the upstream directly;
//!    resolution never fails just because the cache is down
//! 4. Extract up to the configured number of candidates, preserving
//!    upstream order and skipping malformed items
//! 5. Upsert every candidate into the track store (metadata only; the
//!    upsert never touches audio state or lyrics)
//! 6. Return the candidates in extraction order
//!
//! ### Lyrics / Audio
//! `fetch_lyrics` and `acquire_audio` delegate to their services keyed by
//! track id; both require the track to have been resolved first.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_resolve::ResolutionPipeline;
//!
//! # async fn example(pipeline: ResolutionPipeline) -> core_resolve::Result<()> {
//! let candidates = pipeline.resolve("Shape of You Ed Sheeran").await?;
//! let track_id = candidates[0].id;
//! let lyrics = pipeline.fetch_lyrics(track_id).await?;
//! let audio = pipeline.acquire_audio(track_id).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use core_audio::{AudioAcquirer, AudioReference};
use core_lyrics::LyricsAggregator;
use core_store::{QueryCacheRepository, TrackCandidate, TrackId, TrackRepository};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::search::{extract_candidates, SearchProvider};

/// Candidate cap used when none is configured
pub const DEFAULT_MAX_CANDIDATES: usize = 5;

/// Facade coordinating search, caching, lyrics, and audio acquisition
pub struct ResolutionPipeline {
    /// Payload cache keyed by exact query text
    query_cache: Arc<dyn QueryCacheRepository>,

    /// Track metadata store
    track_repo: Arc<dyn TrackRepository>,

    /// Upstream search
    search: Arc<dyn SearchProvider>,

    /// Lyrics fan-out service
    lyrics: Arc<LyricsAggregator>,

    /// Audio download service
    audio: Arc<AudioAcquirer>,

    /// Candidates returned per resolution at most
    max_candidates: usize,
}

impl ResolutionPipeline {
    /// Create a new pipeline from its collaborators.
    ///
    /// # Arguments
    ///
    /// * `query_cache` - Payload cache consulted before the upstream
    /// * `track_repo` - Store receiving candidate upserts
    /// * `search` - Upstream search implementation
    /// * `lyrics` - Aggregator answering `fetch_lyrics`
    /// * `audio` - Acquirer answering `acquire_audio`
    pub fn new(
        query_cache: Arc<dyn QueryCacheRepository>,
        track_repo: Arc<dyn TrackRepository>,
        search: Arc<dyn SearchProvider>,
        lyrics: Arc<LyricsAggregator>,
        audio: Arc<AudioAcquirer>,
    ) -> Self {
        Self {
            query_cache,
            track_repo,
            search,
            lyrics,
            audio,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }

    /// Set how many candidates a resolution returns at most
    pub fn with_max_candidates(mut self, limit: usize) -> Self {
        self.max_candidates = limit;
        self
    }

    /// Resolve free text into stored track candidates.
    ///
    /// Returns at most `max_candidates` entries in upstream order. An empty
    /// list is a valid outcome, not an error.
    #[instrument(skip(self))]
    pub async fn resolve(&self, query_text: &str) -> Result<Vec<TrackCandidate>> {
        let payload = self.cached_or_fresh_payload(query_text).await?;
        let candidates = extract_candidates(&payload, self.max_candidates);

        for candidate in &candidates {
            self.track_repo.upsert_candidate(candidate).await?;
        }

        info!(
            "Resolved {} candidate(s) for query '{}'",
            candidates.len(),
            query_text
        );
        Ok(candidates)
    }

    /// Merged provider-to-lyrics map for a resolved track
    #[instrument(skip(self))]
    pub async fn fetch_lyrics(&self, track_id: TrackId) -> Result<BTreeMap<String, String>> {
        Ok(self.lyrics.fetch(track_id).await?)
    }

    /// Audio reference for a resolved track, downloading on first use
    #[instrument(skip(self))]
    pub async fn acquire_audio(&self, track_id: TrackId) -> Result<AudioReference> {
        Ok(self.audio.acquire(track_id).await?)
    }

    /// Abandon in-flight audio work; see [`AudioAcquirer::shutdown`]
    pub fn shutdown(&self) {
        self.audio.shutdown();
    }

    async fn cached_or_fresh_payload(&self, query_text: &str) -> Result<Value> {
        match self.query_cache.lookup(query_text).await {
            Ok(Some(payload)) => {
                debug!("Query '{}' served from cache", query_text);
                Ok(payload)
            }
            Ok(None) => self.search_and_cache(query_text).await,
            Err(e) if e.is_unavailable() => {
                warn!(
                    "Query cache unavailable ({}), searching upstream directly",
                    e
                );
                self.search_and_cache(query_text).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn search_and_cache(&self, query_text: &str) -> Result<Value> {
        let payload = self.search.search(query_text).await?;

        // A failed store never fails the resolution
        if let Err(e) = self.query_cache.store(query_text, &payload).await {
            warn!("Failed to cache payload for '{}': {}", query_text, e);
        }

        Ok(payload)
    }
}
