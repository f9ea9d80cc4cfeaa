//! Integration tests for the resolution pipeline
//!
//! These tests verify the complete resolution workflow including:
//! - Query caching with replay of the stored payload
//! - Candidate extraction, ordering, and persistence
//! - Fallback to direct search when the cache is unavailable
//! - Lyrics aggregation across providers through the facade
//! - Audio acquisition with a single download per track

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use core_audio::{
    AcquisitionConfig, AudioAcquirer, AudioError, AudioReference, MediaProbe, MediaSource,
};
use core_lyrics::{LyricsAggregator, LyricsError, LyricsProvider, LyricsQuery};
use core_resolve::{ResolutionPipeline, ResolveError, SearchProvider};
use core_store::{
    create_test_pool, LyricsEntry, LyricsRepository, QueryCacheRepository, SqliteLyricsRepository,
    SqliteQueryCacheRepository, SqliteTrackRepository, StoreError, TrackId, TrackRepository,
};
use serde_json::{json, Value};
use tokio::sync::Mutex as AsyncMutex;

// ============================================================================
// Mock Implementations
// ============================================================================

/// Search provider that serves a scripted payload and counts upstream calls.
struct ScriptedSearch {
    payload: AsyncMutex<Option<Value>>,
    calls: AtomicUsize,
}

impl ScriptedSearch {
    fn new(payload: Value) -> Arc<Self> {
        Arc::new(Self {
            payload: AsyncMutex::new(Some(payload)),
            calls: AtomicUsize::new(0),
        })
    }

    async fn set_payload(&self, payload: Value) {
        *self.payload.lock().await = Some(payload);
    }

    /// Simulate the upstream becoming unreachable.
    async fn set_unreachable(&self) {
        *self.payload.lock().await = None;
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, _query_text: &str) -> core_resolve::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.payload.lock().await.clone() {
            Some(payload) => Ok(payload),
            None => Err(ResolveError::Search("connection refused".to_string())),
        }
    }
}

/// Query cache that is down for every operation.
struct UnavailableCache;

#[async_trait]
impl QueryCacheRepository for UnavailableCache {
    async fn lookup(&self, _query_text: &str) -> core_store::Result<Option<Value>> {
        Err(StoreError::Unavailable("cache offline".to_string()))
    }

    async fn store(&self, _query_text: &str, _payload: &Value) -> core_store::Result<()> {
        Err(StoreError::Unavailable("cache offline".to_string()))
    }
}

/// Query cache that reads fine but refuses every write.
struct ReadOnlyCache;

#[async_trait]
impl QueryCacheRepository for ReadOnlyCache {
    async fn lookup(&self, _query_text: &str) -> core_store::Result<Option<Value>> {
        Ok(None)
    }

    async fn store(&self, _query_text: &str, _payload: &Value) -> core_store::Result<()> {
        Err(StoreError::Unavailable("cache write refused".to_string()))
    }
}

/// Media source that hands out references without touching the filesystem.
struct CountingSource {
    fetch_calls: AtomicUsize,
}

impl CountingSource {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            fetch_calls: AtomicUsize::new(0),
        })
    }

    fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSource for CountingSource {
    async fn probe(&self, _search_text: &str) -> core_audio::Result<MediaProbe> {
        Ok(MediaProbe {
            title: "Shape of You".to_string(),
            duration_secs: Some(233.0),
            media_url: "https://media.example/watch?v=shape".to_string(),
        })
    }

    async fn fetch(
        &self,
        track_id: TrackId,
        _probe: &MediaProbe,
    ) -> core_audio::Result<AudioReference> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(AudioReference::new(format!("audio://{}", track_id)))
    }
}

enum LyricsOutcome {
    Found(&'static str),
    Absent,
    Fails,
}

struct FakeLyricsProvider {
    name: &'static str,
    outcome: LyricsOutcome,
}

#[async_trait]
impl LyricsProvider for FakeLyricsProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self, _query: &LyricsQuery) -> core_lyrics::Result<Option<String>> {
        match &self.outcome {
            LyricsOutcome::Found(text) => Ok(Some(text.to_string())),
            LyricsOutcome::Absent => Ok(None),
            LyricsOutcome::Fails => Err(LyricsError::provider(self.name, "upstream rejected")),
        }
    }
}

fn lyrics_provider(name: &'static str, outcome: LyricsOutcome) -> Box<dyn LyricsProvider> {
    Box::new(FakeLyricsProvider { name, outcome })
}

// ============================================================================
// Test Utilities
// ============================================================================

fn track_item(id: i64, title: &str, artist: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "artists": [{ "name": artist }],
        "coverUri": format!("avatars.example/{}/%%", id),
    })
}

fn payload_of(items: Vec<Value>) -> Value {
    json!({ "tracks": { "items": items } })
}

/// Seven upstream matches; only the first five survive extraction.
fn shape_of_you_payload() -> Value {
    payload_of(vec![
        track_item(42, "Shape of You", "Ed Sheeran"),
        track_item(43, "Shape of You (Acoustic)", "Ed Sheeran"),
        track_item(44, "Shape of You (Live)", "Ed Sheeran"),
        track_item(45, "Shape of You (Remix)", "Ed Sheeran"),
        track_item(46, "Shape of You (Karaoke)", "Karaoke Hits"),
        track_item(47, "Shape of You (Cover)", "The Covers Band"),
        track_item(48, "Shape of You (Lullaby)", "Sleepy Tunes"),
    ])
}

struct PipelineFixture {
    pipeline: ResolutionPipeline,
    search: Arc<ScriptedSearch>,
    source: Arc<CountingSource>,
    track_repo: Arc<SqliteTrackRepository>,
    lyrics_repo: Arc<SqliteLyricsRepository>,
}

async fn setup_pipeline(
    payload: Value,
    providers: Vec<Box<dyn LyricsProvider>>,
) -> PipelineFixture {
    let pool = create_test_pool().await.unwrap();
    let query_cache: Arc<dyn QueryCacheRepository> =
        Arc::new(SqliteQueryCacheRepository::new(pool.clone()));
    let track_repo = Arc::new(SqliteTrackRepository::new(pool.clone()));
    let lyrics_repo = Arc::new(SqliteLyricsRepository::new(pool));
    assemble(query_cache, track_repo, lyrics_repo, payload, providers)
}

async fn setup_with_cache(
    query_cache: Arc<dyn QueryCacheRepository>,
    payload: Value,
) -> PipelineFixture {
    let pool = create_test_pool().await.unwrap();
    let track_repo = Arc::new(SqliteTrackRepository::new(pool.clone()));
    let lyrics_repo = Arc::new(SqliteLyricsRepository::new(pool));
    assemble(query_cache, track_repo, lyrics_repo, payload, Vec::new())
}

fn assemble(
    query_cache: Arc<dyn QueryCacheRepository>,
    track_repo: Arc<SqliteTrackRepository>,
    lyrics_repo: Arc<SqliteLyricsRepository>,
    payload: Value,
    providers: Vec<Box<dyn LyricsProvider>>,
) -> PipelineFixture {
    let search = ScriptedSearch::new(payload);
    let source = CountingSource::new();

    let mut aggregator =
        LyricsAggregator::without_providers(track_repo.clone(), lyrics_repo.clone());
    for provider in providers {
        aggregator.register_provider(provider);
    }

    let acquirer = AudioAcquirer::new(
        AcquisitionConfig::new("test_media"),
        source.clone(),
        track_repo.clone(),
    );

    let pipeline = ResolutionPipeline::new(
        query_cache,
        track_repo.clone(),
        search.clone(),
        Arc::new(aggregator),
        Arc::new(acquirer),
    );

    PipelineFixture {
        pipeline,
        search,
        source,
        track_repo,
        lyrics_repo,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_resolve_returns_top_five_in_upstream_order() {
    let fixture = setup_pipeline(shape_of_you_payload(), Vec::new()).await;

    let candidates = fixture
        .pipeline
        .resolve("Shape of You Ed Sheeran")
        .await
        .unwrap();

    let ids: Vec<i64> = candidates.iter().map(|c| c.id.value()).collect();
    assert_eq!(ids, vec![42, 43, 44, 45, 46]);
    assert_eq!(candidates[0].title, "Shape of You");

    // Every surviving candidate has a row; the trimmed ones never got one.
    for id in [42, 43, 44, 45, 46] {
        let row = fixture.track_repo.find_by_id(TrackId::new(id)).await.unwrap();
        assert!(row.is_some(), "track {} should be stored", id);
    }
    for id in [47, 48] {
        let row = fixture.track_repo.find_by_id(TrackId::new(id)).await.unwrap();
        assert!(row.is_none(), "track {} should not be stored", id);
    }
}

#[tokio::test]
async fn test_repeat_resolve_is_served_from_the_cache() {
    let fixture = setup_pipeline(shape_of_you_payload(), Vec::new()).await;

    let first = fixture
        .pipeline
        .resolve("Shape of You Ed Sheeran")
        .await
        .unwrap();

    // The upstream going dark must not affect an already cached query.
    fixture.search.set_unreachable().await;
    let second = fixture
        .pipeline
        .resolve("Shape of You Ed Sheeran")
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(fixture.search.call_count(), 1);
}

#[tokio::test]
async fn test_unknown_query_with_unreachable_upstream_fails() {
    let fixture = setup_pipeline(shape_of_you_payload(), Vec::new()).await;
    fixture.search.set_unreachable().await;

    let err = fixture
        .pipeline
        .resolve("never seen before")
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::Search(_)));
}

#[tokio::test]
async fn test_cache_unavailable_falls_back_to_direct_search() {
    let fixture = setup_with_cache(Arc::new(UnavailableCache), shape_of_you_payload()).await;

    let candidates = fixture
        .pipeline
        .resolve("Shape of You Ed Sheeran")
        .await
        .unwrap();
    assert_eq!(candidates.len(), 5);

    // With no cache to replay from, each resolve goes upstream again.
    fixture
        .pipeline
        .resolve("Shape of You Ed Sheeran")
        .await
        .unwrap();
    assert_eq!(fixture.search.call_count(), 2);
}

#[tokio::test]
async fn test_cache_write_failure_does_not_fail_resolution() {
    let fixture = setup_with_cache(Arc::new(ReadOnlyCache), shape_of_you_payload()).await;

    let candidates = fixture
        .pipeline
        .resolve("Shape of You Ed Sheeran")
        .await
        .unwrap();

    assert_eq!(candidates.len(), 5);
    let row = fixture
        .track_repo
        .find_by_id(TrackId::new(42))
        .await
        .unwrap();
    assert!(row.is_some());
}

#[tokio::test]
async fn test_resolve_with_no_matches_returns_empty() {
    let fixture = setup_pipeline(payload_of(Vec::new()), Vec::new()).await;

    let candidates = fixture.pipeline.resolve("gibberish zxqv").await.unwrap();

    assert!(candidates.is_empty());
}

#[tokio::test]
async fn test_candidate_limit_is_configurable() {
    let fixture = setup_pipeline(shape_of_you_payload(), Vec::new()).await;
    let pipeline = fixture.pipeline.with_max_candidates(2);

    let candidates = pipeline.resolve("Shape of You Ed Sheeran").await.unwrap();

    let ids: Vec<i64> = candidates.iter().map(|c| c.id.value()).collect();
    assert_eq!(ids, vec![42, 43]);
}

#[tokio::test]
async fn test_reresolve_refreshes_metadata_but_keeps_audio() {
    let fixture = setup_pipeline(shape_of_you_payload(), Vec::new()).await;

    fixture
        .pipeline
        .resolve("Shape of You Ed Sheeran")
        .await
        .unwrap();
    fixture
        .track_repo
        .set_audio_reference(TrackId::new(42), "audio://42")
        .await
        .unwrap();

    // The same track comes back under a new query with corrected metadata.
    fixture
        .search
        .set_payload(payload_of(vec![track_item(
            42,
            "Shape of You (2017 Remaster)",
            "Ed Sheeran",
        )]))
        .await;
    fixture
        .pipeline
        .resolve("shape of you remaster")
        .await
        .unwrap();

    let track = fixture
        .track_repo
        .find_by_id(TrackId::new(42))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(track.title, "Shape of You (2017 Remaster)");
    assert_eq!(track.audio_ref.as_deref(), Some("audio://42"));
}

#[tokio::test]
async fn test_single_surviving_provider_is_enough() {
    let providers = vec![
        lyrics_provider("google", LyricsOutcome::Fails),
        lyrics_provider("genius", LyricsOutcome::Fails),
        lyrics_provider("azlyrics", LyricsOutcome::Found("in my bones")),
    ];
    let fixture = setup_pipeline(shape_of_you_payload(), providers).await;
    fixture
        .pipeline
        .resolve("Shape of You Ed Sheeran")
        .await
        .unwrap();

    let lyrics = fixture
        .pipeline
        .fetch_lyrics(TrackId::new(42))
        .await
        .unwrap();

    assert_eq!(lyrics.len(), 1);
    assert_eq!(lyrics.get("azlyrics").map(String::as_str), Some("in my bones"));
}

#[tokio::test]
async fn test_provider_failure_keeps_stored_lyrics() {
    let providers = vec![
        lyrics_provider("google", LyricsOutcome::Absent),
        lyrics_provider("genius", LyricsOutcome::Fails),
    ];
    let fixture = setup_pipeline(shape_of_you_payload(), providers).await;

    fixture
        .pipeline
        .resolve("Shape of You Ed Sheeran")
        .await
        .unwrap();
    fixture
        .lyrics_repo
        .upsert(&LyricsEntry::new(TrackId::new(42), "genius", "the good copy"))
        .await
        .unwrap();

    let lyrics = fixture
        .pipeline
        .fetch_lyrics(TrackId::new(42))
        .await
        .unwrap();

    assert_eq!(lyrics.get("genius").map(String::as_str), Some("the good copy"));
    let stored = fixture
        .lyrics_repo
        .find_by_track(TrackId::new(42))
        .await
        .unwrap();
    assert_eq!(stored.get("genius").map(String::as_str), Some("the good copy"));
}

#[tokio::test]
async fn test_lyrics_for_unknown_track_fails() {
    let fixture = setup_pipeline(shape_of_you_payload(), Vec::new()).await;

    let err = fixture
        .pipeline
        .fetch_lyrics(TrackId::new(999))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ResolveError::Lyrics(LyricsError::TrackNotFound(_))
    ));
}

#[tokio::test]
async fn test_audio_for_unknown_track_fails() {
    let fixture = setup_pipeline(shape_of_you_payload(), Vec::new()).await;

    let err = fixture
        .pipeline
        .acquire_audio(TrackId::new(999))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ResolveError::Audio(AudioError::TrackNotFound(_))
    ));
}

#[tokio::test]
async fn test_end_to_end_resolution_flow() {
    let providers = vec![
        lyrics_provider(
            "google",
            LyricsOutcome::Found("The club isn't the best place to find a lover"),
        ),
        lyrics_provider(
            "genius",
            LyricsOutcome::Found("The club isn't the best place to find a lover\nSo the bar is where I go"),
        ),
        lyrics_provider("azlyrics", LyricsOutcome::Absent),
    ];
    let fixture = setup_pipeline(shape_of_you_payload(), providers).await;

    let candidates = fixture
        .pipeline
        .resolve("Shape of You Ed Sheeran")
        .await
        .unwrap();
    assert_eq!(candidates.len(), 5);
    assert_eq!(candidates[0].id, TrackId::new(42));

    let lyrics = fixture
        .pipeline
        .fetch_lyrics(TrackId::new(42))
        .await
        .unwrap();
    let sources: Vec<&str> = lyrics.keys().map(String::as_str).collect();
    assert_eq!(sources, vec!["genius", "google"]);

    let first = fixture
        .pipeline
        .acquire_audio(TrackId::new(42))
        .await
        .unwrap();
    let second = fixture
        .pipeline
        .acquire_audio(TrackId::new(42))
        .await
        .unwrap();
    assert_eq!(first.as_str(), "audio://42");
    assert_eq!(second, first);
    assert_eq!(fixture.source.fetch_count(), 1);
}
