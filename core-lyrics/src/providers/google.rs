//! Google lyrics provider
//!
//! Scrapes the lyrics panel Google renders directly in its search results
//! for `<title> <artist> lyrics` queries. Panel lines sit in spans marked
//! `jsname="YS01Ge"`; pages without the panel simply have no such spans.

use std::sync::Arc;

use async_trait::async_trait;
use core_runtime::{HttpClient, HttpRequest};
use tracing::debug;

use crate::aggregator::{LyricsProvider, LyricsQuery};
use crate::error::{LyricsError, Result};

use super::html;

const SEARCH_BASE: &str = "https://www.google.com/search";

/// Attribute marking each lyrics line in the search results panel.
const LYRICS_SPAN_MARKER: &str = r#"jsname="YS01Ge""#;

const PROVIDER_NAME: &str = "google";

/// Search results lyrics panel scraper.
pub struct GoogleProvider {
    http_client: Arc<dyn HttpClient>,
}

impl GoogleProvider {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl LyricsProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn fetch(&self, query: &LyricsQuery) -> Result<Option<String>> {
        let search = format!("{} {} lyrics", query.title, query.artist);
        let search_url = format!("{}?q={}", SEARCH_BASE, urlencoding::encode(&search));

        let response = self
            .http_client
            .execute(HttpRequest::get(&search_url))
            .await?;
        if !response.is_success() {
            return Err(LyricsError::provider(
                PROVIDER_NAME,
                format!("search failed: HTTP {}", response.status),
            ));
        }

        let body = response.text()?;
        let lines = html::tag_bodies(&body, LYRICS_SPAN_MARKER, "</span>");
        if lines.is_empty() {
            debug!(
                artist = %query.artist,
                title = %query.title,
                "No lyrics panel in search results"
            );
            return Ok(None);
        }

        let text = html::tidy_lyrics(
            &lines
                .iter()
                .map(|line| html::html_to_text(line))
                .collect::<Vec<_>>()
                .join("\n"),
        );
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(text))
    }
}
