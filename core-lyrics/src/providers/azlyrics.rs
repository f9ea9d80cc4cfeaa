//! AZLyrics provider
//!
//! AZLyrics has no search API, so the song page is located through a web
//! search restricted to the site, then the lyrics block is carved out of
//! the page markup. The block sits directly under a licensing comment
//! AZLyrics embeds above every lyric.

use std::sync::Arc;

use async_trait::async_trait;
use core_runtime::{HttpClient, HttpRequest};
use tracing::debug;

use crate::aggregator::{LyricsProvider, LyricsQuery};
use crate::error::{LyricsError, Result};

use super::html;

const SEARCH_BASE: &str = "https://www.google.com/search";

/// Comment AZLyrics emits immediately above the lyrics block.
const LYRICS_MARKER: &str = "<!-- Usage of azlyrics.com content by any third-party \
lyrics provider is prohibited by our licensing agreement. Sorry about that. -->";

const PROVIDER_NAME: &str = "azlyrics";

/// AZLyrics page scraper.
pub struct AzLyricsProvider {
    http_client: Arc<dyn HttpClient>,
}

impl AzLyricsProvider {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl LyricsProvider for AzLyricsProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn fetch(&self, query: &LyricsQuery) -> Result<Option<String>> {
        let search = format!("{} {} site:azlyrics.com", query.artist, query.title);
        let search_url = format!("{}?q={}", SEARCH_BASE, urlencoding::encode(&search));

        let response = self
            .http_client
            .execute(HttpRequest::get(&search_url))
            .await?;
        if !response.is_success() {
            return Err(LyricsError::provider(
                PROVIDER_NAME,
                format!("web search failed: HTTP {}", response.status),
            ));
        }
        let results = response.text()?;

        let Some(song_url) = html::first_href_containing(&results, "azlyrics.com/lyrics/") else {
            debug!(
                artist = %query.artist,
                title = %query.title,
                "No AZLyrics result in web search"
            );
            return Ok(None);
        };

        debug!(url = %song_url, "Scraping AZLyrics song page");

        let page = self.http_client.execute(HttpRequest::get(song_url)).await?;
        if page.status == 404 {
            return Ok(None);
        }
        if !page.is_success() {
            return Err(LyricsError::provider(
                PROVIDER_NAME,
                format!("song page error: HTTP {}", page.status),
            ));
        }

        let body = page.text()?;
        let Some(block) = html::slice_between(&body, LYRICS_MARKER, "</div>") else {
            debug!(url = %song_url, "Lyrics block not found on AZLyrics page");
            return Ok(None);
        };

        let text = html::html_to_text(block);
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(text))
    }
}
