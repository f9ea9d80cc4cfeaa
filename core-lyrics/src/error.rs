use core_store::TrackId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LyricsError {
    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    #[error("Lyrics provider {provider} failed: {message}")]
    Provider { provider: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] core_runtime::Error),

    #[error("Store error: {0}")]
    Store(#[from] core_store::StoreError),
}

impl LyricsError {
    /// Build a provider failure for the named source.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LyricsError>;
