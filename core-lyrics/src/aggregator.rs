//! Lyrics Aggregation
//!
//! Queries every registered provider for a track and merges the results
//! into a per-provider map. Providers run concurrently and independently:
//! one slow or failing source never blocks the others, and a failure on a
//! re-fetch never disturbs lyrics already stored for that track.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use core_runtime::config::LyricsConfig;
use core_runtime::HttpClient;
use core_store::{LyricsEntry, LyricsRepository, Track, TrackId, TrackRepository};
use tracing::{debug, info, warn};

use crate::error::{LyricsError, Result};
use crate::providers::{AzLyricsProvider, GeniusProvider, GoogleProvider};

// =============================================================================
// Query Types
// =============================================================================

/// Search terms handed to each provider.
#[derive(Debug, Clone)]
pub struct LyricsQuery {
    /// Artist names joined into a single display string
    pub artist: String,
    /// Track title
    pub title: String,
}

impl LyricsQuery {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
        }
    }

    /// Build a query from stored track metadata.
    pub fn for_track(track: &Track) -> Self {
        Self {
            artist: track.artists_joined(),
            title: track.title.clone(),
        }
    }
}

// =============================================================================
// Provider Trait
// =============================================================================

/// A single upstream lyrics source.
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// Stable name used as the storage key for this source.
    fn name(&self) -> &'static str;

    /// Fetch lyrics for the query.
    ///
    /// # Returns
    /// * `Ok(Some(text))` if the provider has lyrics for the track
    /// * `Ok(None)` if the provider definitively has none
    /// * `Err` if the lookup failed
    async fn fetch(&self, query: &LyricsQuery) -> Result<Option<String>>;
}

// =============================================================================
// Aggregator
// =============================================================================

/// Coordinates the provider fan-out and the per-track lyrics store.
pub struct LyricsAggregator {
    providers: Vec<Box<dyn LyricsProvider>>,
    track_repo: Arc<dyn TrackRepository>,
    lyrics_repo: Arc<dyn LyricsRepository>,
    retry_config: RetryConfig,
    provider_timeout: Duration,
}

impl LyricsAggregator {
    /// Create an aggregator with the standard provider set.
    ///
    /// Google and AZLyrics are always registered. Genius needs an API
    /// token and is skipped without one.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        track_repo: Arc<dyn TrackRepository>,
        lyrics_repo: Arc<dyn LyricsRepository>,
        config: &LyricsConfig,
    ) -> Self {
        let mut providers: Vec<Box<dyn LyricsProvider>> = Vec::new();

        providers.push(Box::new(GoogleProvider::new(http_client.clone())));
        providers.push(Box::new(AzLyricsProvider::new(http_client.clone())));

        if let Some(token) = &config.genius_token {
            providers.push(Box::new(GeniusProvider::new(http_client, token.clone())));
        } else {
            debug!("Genius API token not configured, provider disabled");
        }

        Self {
            providers,
            track_repo,
            lyrics_repo,
            retry_config: RetryConfig {
                max_attempts: config.retry_attempts.max(1) as usize,
                base_delay_ms: config.retry_base_delay_ms,
            },
            provider_timeout: config.provider_timeout(),
        }
    }

    /// Create an aggregator with no providers registered.
    pub fn without_providers(
        track_repo: Arc<dyn TrackRepository>,
        lyrics_repo: Arc<dyn LyricsRepository>,
    ) -> Self {
        Self {
            providers: Vec::new(),
            track_repo,
            lyrics_repo,
            retry_config: RetryConfig::default(),
            provider_timeout: LyricsConfig::default().provider_timeout(),
        }
    }

    /// Register an additional provider.
    pub fn register_provider(&mut self, provider: Box<dyn LyricsProvider>) {
        self.providers.push(provider);
    }

    /// Number of registered providers.
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Fetch lyrics for a track from every provider and merge the results.
    ///
    /// This method:
    /// 1. Loads the track metadata to build the search query
    /// 2. Loads lyrics already stored for the track
    /// 3. Queries the remaining providers concurrently, with retry and a
    ///    per-provider timeout
    /// 4. Stores each fresh success, leaving stored entries untouched
    ///
    /// Provider failures and timeouts count as absence for this run. The
    /// merged map can be empty; that is a valid outcome, not an error.
    ///
    /// # Returns
    /// * `Ok(map)` of provider name to lyrics text, stored and fresh combined
    /// * `Err(TrackNotFound)` if the track id is unknown
    pub async fn fetch(&self, track_id: TrackId) -> Result<BTreeMap<String, String>> {
        let track = self
            .track_repo
            .find_by_id(track_id)
            .await?
            .ok_or(LyricsError::TrackNotFound(track_id))?;

        let stored = match self.lyrics_repo.find_by_track(track_id).await {
            Ok(map) => map,
            Err(e) => {
                warn!(track_id = %track_id, error = %e, "Failed to load stored lyrics");
                BTreeMap::new()
            }
        };

        // A stored success settles that provider for good
        let pending: Vec<&dyn LyricsProvider> = self
            .providers
            .iter()
            .filter(|p| !stored.contains_key(p.name()))
            .map(|p| p.as_ref())
            .collect();

        if pending.is_empty() {
            debug!(
                track_id = %track_id,
                stored = stored.len(),
                "All providers already have stored lyrics"
            );
            return Ok(stored);
        }

        let query = LyricsQuery::for_track(&track);
        info!(
            track_id = %track_id,
            artist = %query.artist,
            title = %query.title,
            providers = pending.len(),
            "Fetching lyrics"
        );

        let outcomes = futures::future::join_all(pending.into_iter().map(|provider| {
            let query = &query;
            async move {
                let name = provider.name();
                let result = tokio::time::timeout(
                    self.provider_timeout,
                    self.fetch_with_retry(provider, query),
                )
                .await;
                (name, result)
            }
        }))
        .await;

        let mut fresh: BTreeMap<String, String> = BTreeMap::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(Ok(Some(text))) => {
                    info!(provider = name, chars = text.len(), "Fetched lyrics");
                    fresh.insert(name.to_string(), text);
                }
                Ok(Ok(None)) => {
                    debug!(provider = name, "Lyrics not found at provider");
                }
                Ok(Err(e)) => {
                    warn!(provider = name, error = %e, "Provider fetch failed");
                }
                Err(_) => {
                    warn!(
                        provider = name,
                        timeout_ms = self.provider_timeout.as_millis(),
                        "Provider timed out"
                    );
                }
            }
        }

        for (provider, content) in &fresh {
            let entry = LyricsEntry::new(track_id, provider.as_str(), content.as_str());
            if let Err(e) = self.lyrics_repo.upsert(&entry).await {
                warn!(provider = %provider, error = %e, "Failed to store fetched lyrics");
            }
        }

        let mut merged = stored;
        merged.extend(fresh);

        info!(
            track_id = %track_id,
            providers_with_lyrics = merged.len(),
            "Lyrics aggregation complete"
        );
        Ok(merged)
    }

    /// Fetch with retry logic
    async fn fetch_with_retry(
        &self,
        provider: &dyn LyricsProvider,
        query: &LyricsQuery,
    ) -> Result<Option<String>> {
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.retry_config.max_attempts {
            match provider.fetch(query).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempts += 1;
                    last_error = Some(e);

                    if attempts < self.retry_config.max_attempts {
                        let delay = self.retry_config.backoff_duration(attempts);
                        debug!(
                            provider = provider.name(),
                            attempt = attempts,
                            delay_ms = delay.as_millis(),
                            "Retrying after failure"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            LyricsError::provider(provider.name(), "all retry attempts exhausted")
        }))
    }
}

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum attempts per provider per run
    pub max_attempts: usize,
    /// Base delay for exponential backoff
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 100,
        }
    }
}

impl RetryConfig {
    /// Calculate backoff duration for attempt number
    fn backoff_duration(&self, attempt: usize) -> Duration {
        let delay_ms = self.base_delay_ms * 2u64.pow(attempt as u32);
        Duration::from_millis(delay_ms.min(10000)) // Cap at 10 seconds
    }
}

// =============================================================================
// Tests
// =============================================================================
