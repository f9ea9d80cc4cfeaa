//! # Lyrics Module
//!
//! Fetches lyrics for resolved tracks from independent upstream sources
//! and merges the results into a per-provider map:
//! - Lyrics aggregation with concurrent provider fan-out
//! - Google, AZLyrics, and Genius providers
//! - Per-track persistence; a stored success is never overwritten by a
//!   later failure
//!
//! ## Overview
//!
//! Every provider is queried for its own copy of the lyrics. Outcomes
//! are independent: found text goes into the map and the store, absence
//! and failure just leave that provider out of the map for the run. An
//! empty map is a valid result.

pub mod aggregator;
pub mod error;
pub mod providers;

pub use aggregator::{LyricsAggregator, LyricsProvider, LyricsQuery, RetryConfig};
pub use error::{LyricsError, Result};
pub use providers::{AzLyricsProvider, GeniusProvider, GoogleProvider};
