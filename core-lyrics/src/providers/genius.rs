//! Genius lyrics provider
//!
//! Resolves a track through the Genius search API, then scrapes the
//! lyrics from the song page. The API itself never returns lyrics text,
//! only the canonical page URL.
//!
//! # API Documentation
//!
//! - Search: `GET https://api.genius.com/search?q=<query>` (Bearer auth)
//! - Lyrics live in `data-lyrics-container` blocks on the song page

use std::sync::Arc;

use async_trait::async_trait;
use core_runtime::{HttpClient, HttpRequest};
use serde::Deserialize;
use tracing::debug;

use crate::aggregator::{LyricsProvider, LyricsQuery};
use crate::error::{LyricsError, Result};

use super::html;

const GENIUS_API_BASE: &str = "https://api.genius.com";

const PROVIDER_NAME: &str = "genius";

/// Genius API client and page scraper.
pub struct GeniusProvider {
    http_client: Arc<dyn HttpClient>,
    access_token: String,
    api_base: String,
}

impl GeniusProvider {
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: String) -> Self {
        Self {
            http_client,
            access_token,
            api_base: GENIUS_API_BASE.to_string(),
        }
    }
}

#[async_trait]
impl LyricsProvider for GeniusProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn fetch(&self, query: &LyricsQuery) -> Result<Option<String>> {
        let search_url = format!(
            "{}/search?q={}",
            self.api_base,
            urlencoding::encode(&format!("{} {}", query.artist, query.title))
        );

        let request = HttpRequest::get(&search_url)
            .header("Authorization", format!("Bearer {}", self.access_token));
        let response = self.http_client.execute(request).await?;

        if !response.is_success() {
            return Err(LyricsError::provider(
                PROVIDER_NAME,
                format!("search API error: HTTP {}", response.status),
            ));
        }

        let search: GeniusSearchResponse = response
            .json()
            .map_err(|e| LyricsError::provider(PROVIDER_NAME, format!("parse error: {}", e)))?;

        let Some(song) = pick_hit(&search.response.hits, &query.artist) else {
            debug!(
                artist = %query.artist,
                title = %query.title,
                "No matching Genius hit"
            );
            return Ok(None);
        };

        debug!(song = %song.title, url = %song.url, "Scraping Genius song page");

        let page = self
            .http_client
            .execute(HttpRequest::get(&song.url))
            .await?;
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
        let containers = html::tag_bodies(&body, "data-lyrics-container", "</div>");
        if containers.is_empty() {
            debug!(url = %song.url, "No lyrics containers on Genius page");
            return Ok(None);
        }

        let text = html::tidy_lyrics(
            &containers
                .iter()
                .map(|block| html::html_to_text(block))
                .collect::<Vec<_>>()
                .join("\n"),
        );
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(text))
    }
}

/// First hit whose primary artist overlaps the query artist.
///
/// The query artist can be a joined list ("A, B"), so the match runs
/// containment in both directions.
fn pick_hit<'a>(hits: &'a [GeniusHit], artist: &str) -> Option<&'a GeniusSong> {
    let wanted = artist.to_lowercase();
    hits.iter().map(|hit| &hit.result).find(|song| {
        let primary = song.primary_artist.name.to_lowercase();
        wanted.contains(&primary) || primary.contains(&wanted)
    })
}

#[derive(Debug, Deserialize)]
struct GeniusSearchResponse {
    response: GeniusHits,
}

#[derive(Debug, Deserialize)]
struct GeniusHits {
    hits: Vec<GeniusHit>,
}

#[derive(Debug, Deserialize)]
struct GeniusHit {
    result: GeniusSong,
}

#[derive(Debug, Deserialize)]
struct GeniusSong {
    title: String,
    url: String,
    primary_artist: GeniusArtist,
}

#[derive(Debug, Deserialize)]
struct GeniusArtist {
    name: String,
}

#[cfg(test)]
mod tests {
    use crate::providers::testing::CannedHttpClient;

    use super::*;

    fn song(title: &str, url: &str, artist: &str) -> GeniusHit {
        GeniusHit {
            result: GeniusSong {
                title: title.to_string(),
                url: url.to_string(),
                primary_artist: GeniusArtist {
                    name: artist.to_string(),
                },
            },
        }
    }

    #[test]
    fn test_pick_hit_prefers_matching_artist() {
        let hits = vec![
            song("Shape of You (Cover)", "https://genius.com/cover", "Covers Inc"),
            song("Shape of You", "https://genius.com/real", "Ed Sheeran"),
        ];

        let picked = pick_hit(&hits, "Ed Sheeran").unwrap();
        assert_eq!(picked.url, "https://genius.com/real");
    }

    #[test]
    fn test_pick_hit_handles_joined_artist_list() {
        let hits = vec![song("Perfect Duet", "https://genius.com/duet", "Ed Sheeran")];

        let picked = pick_hit(&hits, "Ed Sheeran, Beyoncé");
        assert!(picked.is_some());
    }

    #[test]
    fn test_pick_hit_none_when_no_artist_matches() {
        let hits = vec![song("Shape of You", "https://genius.com/real", "Ed Sheeran")];

        assert!(pick_hit(&hits, "Completely Unrelated").is_none());
    }

    #[tokio::test]
    async fn test_fetch_scrapes_song_page() {
        let search_body = r#"{
            "response": {
                "hits": [
                    {
                        "result": {
                            "title": "Shape of You",
                            "url": "https://genius.com/Ed-sheeran-shape-of-you-lyrics",
                            "primary_artist": { "name": "Ed Sheeran" }
                        }
                    }
                ]
            }
        }"#;
        let page_body = concat!(
            r#"<div data-lyrics-container="true">The club isn&#x27;t the best place"#,
            r#"<br>to find a lover</div>"#,
        );

        let client = CannedHttpClient::new()
            .route("api.genius.com/search", 200, search_body)
            .route("shape-of-you-lyrics", 200, page_body);
        let provider = GeniusProvider::new(Arc::new(client), "token".to_string());

        let query = LyricsQuery::new("Ed Sheeran", "Shape of You");
        let lyrics = provider.fetch(&query).await.unwrap().unwrap();
        assert_eq!(lyrics, "The club isn't the best place\nto find a lover");
    }

    #[tokio::test]
    async fn test_fetch_no_hits_is_absent() {
        let client = CannedHttpClient::new().route(
            "api.genius.com/search",
            200,
            r#"{"response": {"hits": []}}"#,
        );
        let provider = GeniusProvider::new(Arc::new(client), "token".to_string());

        let query = LyricsQuery::new("Nobody", "Nothing");
        assert!(provider.fetch(&query).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_api_error_is_failure() {
        let client = CannedHttpClient::new().route("api.genius.com/search", 500, "{}");
        let provider = GeniusProvider::new(Arc::new(client), "token".to_string());

        let query = LyricsQuery::new("Ed Sheeran", "Shape of You");
        let err = provider.fetch(&query).await.unwrap_err();
        assert!(matches!(err, LyricsError::Provider { .. }));
    }
}
