//! # Store Module
//!
//! Owns the resolution pipeline database and provides repository patterns
//! for data access.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite database schema and migrations
//! - Domain models with validation
//! - Repositories for cached search payloads, tracks, and lyrics

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{Result, StoreError};
pub use models::{cover_art_url, LyricsEntry, Track, TrackCandidate, TrackId, COVER_SIZE_FULL};
pub use repositories::{
    LayeredQueryCache, LyricsRepository, QueryCacheRepository, SqliteLyricsRepository,
    SqliteQueryCacheRepository, SqliteTrackRepository, TrackRepository,
};
