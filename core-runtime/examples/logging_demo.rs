//! Logging walkthrough shaped like one resolution pass.
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug)
//! cargo run --example logging_demo
//!
//! # JSON format
//! cargo run --example logging_demo -- json
//!
//! # Compact format with a custom filter
//! cargo run --example logging_demo -- compact "core_runtime=trace"
//! ```

use core_runtime::logging::{
    init_logging, redact_if_sensitive, strip_path, LogFormat, LogLevel, LoggingConfig,
};
use std::env;
use tracing::{debug, info, instrument, span, trace, warn, Level};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let format = args
        .get(1)
        .and_then(|s| s.parse::<LogFormat>().ok())
        .unwrap_or_default();

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace);

    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    init_logging(config).expect("Failed to initialize logging");
    info!(format = ?format, "Logging initialized");

    let candidates = resolve("Shape of You Ed Sheeran").await;
    fetch_lyrics(candidates[0]).await;
    acquire_audio(candidates[0]).await;

    info!("Walkthrough complete");
}

/// Search phase: spans for each stage, structured fields on the outcome.
async fn resolve(query: &str) -> Vec<i64> {
    let span = span!(Level::INFO, "resolve", query);
    let _enter = span.enter();

    {
        let cache_span = span!(Level::DEBUG, "query_cache");
        let _cache = cache_span.enter();
        debug!(hit = false, "Cache consulted");
    }

    {
        let search_span = span!(Level::DEBUG, "upstream_search");
        let _search = search_span.enter();
        trace!("Requesting catalogue page");
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        debug!(matches = 7, "Upstream answered");
    }

    let candidates = vec![42_i64, 43, 44, 45, 46];
    info!(
        candidates = candidates.len(),
        first_id = candidates[0],
        "Resolution completed"
    );
    candidates
}

/// Provider fan-out: one warn for the failed source, successes as fields.
#[instrument]
async fn fetch_lyrics(track_id: i64) {
    let api_key = "genius_client_token_12345";
    debug!(
        key = %redact_if_sensitive("api_key", api_key),
        "Provider credentials loaded"
    );

    warn!(provider = "azlyrics", "Provider failed: page layout changed");
    info!(
        providers_hit = 2,
        providers_failed = 1,
        "Lyrics aggregation finished"
    );
}

/// Acquisition: nested instrumented calls plus path stripping on the artifact.
#[instrument]
async fn acquire_audio(track_id: i64) {
    probe(track_id).await;

    let artifact = format!("/var/lib/media/{}.mp3", track_id);
    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    info!(file = %strip_path(&artifact), "Artifact ready");
}

#[instrument(fields(source = "yt-dlp"))]
async fn probe(track_id: i64) {
    trace!("Probing media metadata");
    debug!(duration_secs = 233.0, "Probe matched");
}
