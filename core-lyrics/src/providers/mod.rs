//! Lyrics Providers
//!
//! This module contains the upstream lyrics sources:
//! - Google - lyrics panel scraped from web search results
//! - AZLyrics - song page located through web search, lyrics block scraped
//! - Genius - API song search followed by a page scrape
//!
//! Providers are independent. Each one reports lyrics as found, absent,
//! or failed; the aggregator combines those outcomes per track.

mod html;

pub mod azlyrics;
pub mod genius;
pub mod google;

pub use azlyrics::AzLyricsProvider;
pub use genius::GeniusProvider;
pub use google::GoogleProvider;
