//! # Repository Pattern Implementation
//!
//! This module provides repository traits and implementations for data access.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>` for error handling
//!
//! ## Available Repositories
//!
//! - `QueryCacheRepository` - Cached search payloads keyed by exact query text
//! - `TrackRepository` - Track metadata and acquisition state
//! - `LyricsRepository` - Per-provider lyrics maps

pub mod lyrics;
pub mod query_cache;
pub mod track;

pub use lyrics::{LyricsRepository, SqliteLyricsRepository};
pub use query_cache::{LayeredQueryCache, QueryCacheRepository, SqliteQueryCacheRepository};
pub use track::{SqliteTrackRepository, TrackRepository};
