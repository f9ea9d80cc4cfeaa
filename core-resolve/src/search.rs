//! Track search against the upstream catalogue.
//!
//! The HTTP implementation posts free text to the music search handler and
//! hands back the JSON payload verbatim. Candidate extraction is a separate
//! pure step, so payloads replayed from the query cache take exactly the
//! same path as fresh ones.
//!
//! ## API Endpoint
//!
//! - Search: `POST {base_url}?text={query}&type=all&lang={lang}&external-domain={domain}&overembed=false`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use core_runtime::config::SearchConfig;
use core_runtime::{HttpClient, HttpRequest};
use core_store::{TrackCandidate, TrackId};
use serde_json::Value;
use tracing::debug;

use crate::error::{ResolveError, Result};

// ===== Search Provider Trait =====

/// An upstream that answers free-text track searches with a JSON payload
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run the search and return the raw payload
    async fn search(&self, query_text: &str) -> Result<Value>;
}

// ===== HTTP Implementation =====

/// `SearchProvider` backed by the catalogue's search handler
pub struct HttpSearchProvider {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    lang: String,
    external_domain: String,
    timeout: Duration,
}

impl HttpSearchProvider {
    pub fn new(http_client: Arc<dyn HttpClient>, config: &SearchConfig) -> Self {
        Self {
            http_client,
            base_url: config.base_url.clone(),
            lang: config.lang.clone(),
            external_domain: config.external_domain.clone(),
            timeout: config.timeout(),
        }
    }
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    async fn search(&self, query_text: &str) -> Result<Value> {
        let url = format!(
            "{}?text={}&type=all&lang={}&external-domain={}&overembed=false",
            self.base_url,
            urlencoding::encode(query_text),
            self.lang,
            self.external_domain,
        );
        debug!("Searching upstream for '{}'", query_text);

        let request = HttpRequest::post(url).timeout(self.timeout);
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| ResolveError::Search(format!("search request failed: {}", e)))?;

        if !response.is_success() {
            return Err(ResolveError::Search(format!(
                "search API error: HTTP {}",
                response.status
            )));
        }

        response
            .json::<Value>()
            .map_err(|e| ResolveError::Search(format!("search payload parse error: {}", e)))
    }
}

// ===== Candidate Extraction =====

/// Extract up to `limit` track candidates from a search payload.
///
/// Order follows the upstream ranking exactly. Items missing an id or a
/// title are skipped without counting against the limit. Ids arrive as
/// JSON numbers or as numeric strings depending on the upstream.
pub fn extract_candidates(payload: &Value, limit: usize) -> Vec<TrackCandidate> {
    let items = match payload["tracks"]["items"].as_array() {
        Some(items) => items,
        None => return Vec::new(),
    };

    let mut candidates = Vec::new();
    for item in items {
        if candidates.len() == limit {
            break;
        }

        let id = match item_id(item) {
            Some(id) if id > 0 => id,
            _ => continue,
        };
        let title = match item["title"].as_str() {
            Some(title) if !title.trim().is_empty() => title.to_string(),
            _ => continue,
        };

        let artists = item["artists"]
            .as_array()
            .map(|artists| {
                artists
                    .iter()
                    .filter_map(|artist| artist["name"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        candidates.push(TrackCandidate {
            id: TrackId::new(id),
            title,
            artists,
            cover_uri: item["coverUri"].as_str().map(str::to_string),
        });
    }

    candidates
}

fn item_id(item: &Value) -> Option<i64> {
    match &item["id"] {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
