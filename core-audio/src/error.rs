use core_store::TrackId;
use thiserror::Error;

/// Audio acquisition error types
#[derive(Debug, Error)]
pub enum AudioError {
    // ==== Lookup Errors ====
    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    // ==== Source Errors ====
    #[error("Media source failed: {0}")]
    SourceFailed(String),

    #[error("Matched media runs {duration_secs:.0}s, limit is {limit_secs}s")]
    DurationExceeded { duration_secs: f64, limit_secs: u64 },

    // ==== Concurrency Errors ====
    #[error("Acquisition timed out while {0}")]
    Timeout(&'static str),

    #[error("Download queue is full")]
    Busy,

    #[error("Acquisition cancelled")]
    Cancelled,

    // ==== Storage Errors ====
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] core_store::StoreError),
}

impl AudioError {
    /// Whether retrying the same acquisition later can succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AudioError::SourceFailed(_) | AudioError::Timeout(_) | AudioError::Busy
        )
    }

    /// Whether the failure came from the duration ceiling
    pub fn is_duration_limit(&self) -> bool {
        matches!(self, AudioError::DurationExceeded { .. })
    }
}

/// Result type for audio acquisition operations
pub type Result<T> = std::result::Result<T, AudioError>;
