//! # Resolution Pipeline Usage Example
//!
//! This example wires the pipeline to in-memory collaborators and walks the
//! full flow: resolve a query into stored candidates, fetch lyrics for the
//! top match, then acquire audio twice to show the second call reusing the
//! stored reference.
//!
//! Run with: `cargo run --example resolve_demo --package core-resolve`

use core_audio::{AcquisitionConfig, AudioAcquirer, AudioReference, MediaProbe, MediaSource};
use core_lyrics::{LyricsAggregator, LyricsProvider, LyricsQuery};
use core_resolve::{ResolutionPipeline, Result, SearchProvider};
use core_store::{
    create_test_pool, QueryCacheRepository, SqliteLyricsRepository, SqliteQueryCacheRepository,
    SqliteTrackRepository, TrackId,
};
use serde_json::{json, Value};
use std::sync::Arc;

// ============================================================================
// Demo Collaborators
// ============================================================================

/// Serves a canned catalogue payload instead of calling the real upstream.
struct DemoSearch;

#[async_trait::async_trait]
impl SearchProvider for DemoSearch {
    async fn search(&self, query_text: &str) -> Result<Value> {
        println!("   (upstream search for '{}')", query_text);
        Ok(json!({
            "tracks": {
                "items": [
                    { "id": 42, "title": "Shape of You", "artists": [{ "name": "Ed Sheeran" }] },
                    { "id": 43, "title": "Shape of You (Acoustic)", "artists": [{ "name": "Ed Sheeran" }] },
                    { "id": 44, "title": "Shape of You (Live at Wembley)", "artists": [{ "name": "Ed Sheeran" }] },
                ]
            }
        }))
    }
}

/// Returns a fixed text, or nothing, without any HTTP traffic.
struct DemoLyricsProvider {
    name: &'static str,
    text: Option<&'static str>,
}

#[async_trait::async_trait]
impl LyricsProvider for DemoLyricsProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self, _query: &LyricsQuery) -> core_lyrics::Result<Option<String>> {
        Ok(self.text.map(str::to_string))
    }
}

/// Pretends to download by minting a reference for the track.
struct DemoSource;

#[async_trait::async_trait]
impl MediaSource for DemoSource {
    async fn probe(&self, search_text: &str) -> core_audio::Result<MediaProbe> {
        println!("   (probing media for '{}')", search_text);
        Ok(MediaProbe {
            title: "Ed Sheeran - Shape of You (Official Music Video)".to_string(),
            duration_secs: Some(233.0),
            media_url: "https://media.example/watch?v=JGwWNGJdvx8".to_string(),
        })
    }

    async fn fetch(
        &self,
        track_id: TrackId,
        probe: &MediaProbe,
    ) -> core_audio::Result<AudioReference> {
        println!("   (downloading '{}')", probe.title);
        Ok(AudioReference::new(format!("audio://{}", track_id)))
    }
}

// ============================================================================
// Demo Flow
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    println!("🎵 Resolution Pipeline Demo\n");

    let pool = create_test_pool().await?;
    let query_cache: Arc<dyn QueryCacheRepository> =
        Arc::new(SqliteQueryCacheRepository::new(pool.clone()));
    let track_repo = Arc::new(SqliteTrackRepository::new(pool.clone()));
    let lyrics_repo = Arc::new(SqliteLyricsRepository::new(pool));

    let mut aggregator =
        LyricsAggregator::without_providers(track_repo.clone(), lyrics_repo.clone());
    aggregator.register_provider(Box::new(DemoLyricsProvider {
        name: "google",
        text: Some("The club isn't the best place to find a lover"),
    }));
    aggregator.register_provider(Box::new(DemoLyricsProvider {
        name: "genius",
        text: Some("The club isn't the best place to find a lover\nSo the bar is where I go"),
    }));
    aggregator.register_provider(Box::new(DemoLyricsProvider {
        name: "azlyrics",
        text: None,
    }));

    let acquirer = AudioAcquirer::new(
        AcquisitionConfig::new("demo_media"),
        Arc::new(DemoSource),
        track_repo.clone(),
    );

    let pipeline = ResolutionPipeline::new(
        query_cache,
        track_repo,
        Arc::new(DemoSearch),
        Arc::new(aggregator),
        Arc::new(acquirer),
    );

    println!("🔍 Resolving \"Shape of You Ed Sheeran\"...");
    let candidates = pipeline.resolve("Shape of You Ed Sheeran").await?;
    for candidate in &candidates {
        println!(
            "   [{}] {} - {}",
            candidate.id,
            candidate.title,
            candidate.artists.join(", ")
        );
    }

    let track_id = candidates[0].id;

    println!("\n📝 Fetching lyrics for track {}...", track_id);
    let lyrics = pipeline.fetch_lyrics(track_id).await?;
    for (provider, text) in &lyrics {
        let first_line = text.lines().next().unwrap_or("");
        println!("   {}: {}", provider, first_line);
    }

    println!("\n🎧 Acquiring audio...");
    let reference = pipeline.acquire_audio(track_id).await?;
    println!("   Stored reference: {}", reference);

    let again = pipeline.acquire_audio(track_id).await?;
    println!("   Second call reused it: {}", again);

    println!("\n💾 Resolving the same query again...");
    let cached = pipeline.resolve("Shape of You Ed Sheeran").await?;
    println!(
        "   {} candidate(s) served from the query cache",
        cached.len()
    );

    pipeline.shutdown();
    println!("\n✅ Demo complete");
    Ok(())
}
