use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Search upstream failed: {0}")]
    Search(String),

    #[error("Store error: {0}")]
    Store(#[from] core_store::StoreError),

    #[error("Lyrics error: {0}")]
    Lyrics(#[from] core_lyrics::LyricsError),

    #[error("Audio error: {0}")]
    Audio(#[from] core_audio::AudioError),
}

pub type Result<T> = std::result::Result<T, ResolveError>;
