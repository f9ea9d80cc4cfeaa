//! # Pipeline Configuration Module
//!
//! Provides configuration management for the resolution pipeline.
//!
//! ## Overview
//!
//! Configuration is a plain data structure with per-section validation and
//! fail-fast error messages. It can be built in code with the `with_*`
//! setters or loaded from a TOML file whose sections mirror the struct
//! fields.
//!
//! ## File format
//!
//! ```toml
//! [storage]
//! database_path = "data/pipeline.db"
//! max_connections = 5
//! query_cache_capacity = 128
//!
//! [search]
//! base_url = "https://music.yandex.ru/handlers/music-search.jsx"
//! lang = "ru"
//! timeout_secs = 10
//! max_candidates = 5
//!
//! [lyrics]
//! genius_token = "..."
//! provider_timeout_secs = 10
//! retry_attempts = 2
//!
//! [media]
//! media_dir = "data/media"
//! downloader_bin = "yt-dlp"
//! max_duration_secs = 600
//! max_concurrent_downloads = 2
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::PipelineConfig;
//!
//! let config = PipelineConfig::load("config.toml")?;
//! config.validate()?;
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::logging::{LogFormat, LogLevel, LoggingConfig};

/// Top-level configuration for the resolution pipeline.
///
/// Every section has working defaults except the two paths the deployment
/// must choose: `storage.database_path` and `media.media_dir`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// SQLite storage settings
    pub storage: StorageConfig,

    /// Upstream track search settings
    pub search: SearchConfig,

    /// Lyrics provider settings
    pub lyrics: LyricsConfig,

    /// Audio acquisition settings
    pub media: MediaConfig,

    /// Logging settings
    pub logging: LoggingSection,
}

impl PipelineConfig {
    /// Parse a configuration from a TOML string.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Load and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Validate every section, failing on the first problem with an
    /// actionable message.
    pub fn validate(&self) -> Result<()> {
        self.storage
            .validate()
            .map_err(|e| Error::Config(format!("[storage] {}", e)))?;
        self.search
            .validate()
            .map_err(|e| Error::Config(format!("[search] {}", e)))?;
        self.lyrics
            .validate()
            .map_err(|e| Error::Config(format!("[lyrics] {}", e)))?;
        self.media
            .validate()
            .map_err(|e| Error::Config(format!("[media] {}", e)))?;
        self.logging
            .to_logging_config()
            .map_err(|e| match e {
                Error::Config(msg) => Error::Config(format!("[logging] {}", msg)),
                other => other,
            })
            .map(|_| ())
    }

    /// Set the database path.
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage.database_path = path.into();
        self
    }

    /// Set the media directory.
    pub fn with_media_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.media.media_dir = dir.into();
        self
    }

    /// Set the Genius API token.
    pub fn with_genius_token(mut self, token: impl Into<String>) -> Self {
        self.lyrics.genius_token = Some(token.into());
        self
    }
}

/// SQLite storage settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Use an in-memory database (tests, throwaway runs); `database_path`
    /// is ignored when set
    pub in_memory: bool,

    /// Maximum pool connections
    pub max_connections: u32,

    /// Entry capacity of the in-process hot layer in front of the durable
    /// query cache
    pub query_cache_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::new(),
            in_memory: false,
            max_connections: 5,
            query_cache_capacity: 128,
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.in_memory && self.database_path.as_os_str().is_empty() {
            return Err(
                "database_path must be set (or enable in_memory for a throwaway database)"
                    .to_string(),
            );
        }

        if self.max_connections == 0 {
            return Err("max_connections must be at least 1".to_string());
        }

        if self.query_cache_capacity == 0 {
            return Err("query_cache_capacity must be at least 1".to_string());
        }

        if self.query_cache_capacity > 100_000 {
            return Err("query_cache_capacity exceeds maximum of 100,000 entries".to_string());
        }

        Ok(())
    }
}

/// Upstream track search settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search handler endpoint
    pub base_url: String,

    /// Language parameter sent with every search
    pub lang: String,

    /// `external-domain` parameter sent with every search
    pub external_domain: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// How many candidates a resolution returns at most
    pub max_candidates: usize,

    /// Size segment substituted into cover art URLs
    pub cover_size: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://music.yandex.ru/handlers/music-search.jsx".to_string(),
            lang: "ru".to_string(),
            external_domain: "music.yandex.ru".to_string(),
            timeout_secs: 10,
            max_candidates: 5,
            cover_size: "1000x1000".to_string(),
        }
    }
}

impl SearchConfig {
    /// Per-request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            ));
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }

        if self.max_candidates == 0 {
            return Err("max_candidates must be at least 1".to_string());
        }

        if self.max_candidates > 20 {
            return Err("max_candidates exceeds maximum of 20".to_string());
        }

        if self.cover_size.is_empty() {
            return Err("cover_size cannot be empty".to_string());
        }

        Ok(())
    }
}

/// Lyrics provider settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LyricsConfig {
    /// Genius API token; without it the Genius provider reports itself
    /// unavailable
    pub genius_token: Option<String>,

    /// Per-provider timeout in seconds, applied to each provider
    /// independently
    pub provider_timeout_secs: u64,

    /// Attempts per provider per aggregation run
    pub retry_attempts: u32,

    /// Base delay for the exponential backoff between attempts
    pub retry_base_delay_ms: u64,
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            genius_token: None,
            provider_timeout_secs: 10,
            retry_attempts: 2,
            retry_base_delay_ms: 100,
        }
    }
}

impl LyricsConfig {
    /// Per-provider timeout as a `Duration`.
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.provider_timeout_secs == 0 {
            return Err("provider_timeout_secs must be greater than 0".to_string());
        }

        if self.retry_attempts == 0 {
            return Err("retry_attempts must be at least 1".to_string());
        }

        if self.retry_attempts > 10 {
            return Err("retry_attempts exceeds maximum of 10".to_string());
        }

        Ok(())
    }
}

/// Audio acquisition settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Directory where acquired audio artifacts are kept
    pub media_dir: PathBuf,

    /// Downloader binary invoked for probe and fetch (name on PATH or an
    /// absolute path)
    pub downloader_bin: String,

    /// Reject media at or above this duration
    pub max_duration_secs: u64,

    /// Concurrent downloads across all tracks
    pub max_concurrent_downloads: usize,

    /// Timeout for one download + transcode in seconds
    pub download_timeout_secs: u64,

    /// Timeout for the metadata probe in seconds
    pub probe_timeout_secs: u64,

    /// How long a caller waits for a download slot before giving up
    pub queue_timeout_secs: u64,

    /// Target audio container/codec
    pub audio_format: String,

    /// Target audio quality passed to the downloader
    pub audio_quality: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::new(),
            downloader_bin: "yt-dlp".to_string(),
            max_duration_secs: 600,
            max_concurrent_downloads: 2,
            download_timeout_secs: 300,
            probe_timeout_secs: 30,
            queue_timeout_secs: 60,
            audio_format: "mp3".to_string(),
            audio_quality: "192K".to_string(),
        }
    }
}

impl MediaConfig {
    /// Duration ceiling as a `Duration`.
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }

    /// Download timeout as a `Duration`.
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Probe timeout as a `Duration`.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Download-slot wait limit as a `Duration`.
    pub fn queue_timeout(&self) -> Duration {
        Duration::from_secs(self.queue_timeout_secs)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.media_dir.as_os_str().is_empty() {
            return Err("media_dir must be set".to_string());
        }

        if self.downloader_bin.is_empty() {
            return Err("downloader_bin cannot be empty".to_string());
        }

        if self.max_duration_secs == 0 {
            return Err("max_duration_secs must be greater than 0".to_string());
        }

        if self.max_duration_secs > 86_400 {
            return Err("max_duration_secs exceeds maximum of 24 hours (86,400s)".to_string());
        }

        if self.max_concurrent_downloads == 0 {
            return Err("max_concurrent_downloads must be at least 1".to_string());
        }

        if self.max_concurrent_downloads > 16 {
            return Err("max_concurrent_downloads exceeds maximum of 16".to_string());
        }

        if self.download_timeout_secs == 0 {
            return Err("download_timeout_secs must be greater than 0".to_string());
        }

        if self.probe_timeout_secs == 0 {
            return Err("probe_timeout_secs must be greater than 0".to_string());
        }

        if self.queue_timeout_secs == 0 {
            return Err("queue_timeout_secs must be greater than 0".to_string());
        }

        if self.audio_format.is_empty() {
            return Err("audio_format cannot be empty".to_string());
        }

        Ok(())
    }
}

/// Logging settings as they appear in the config file.
///
/// Kept as plain strings here; [`to_logging_config`](Self::to_logging_config)
/// parses them into a [`LoggingConfig`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Minimum level: trace, debug, info, warn, error
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: Option<String>,

    /// Custom filter string overriding level-based defaults
    pub filter: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: None,
            filter: None,
        }
    }
}

impl LoggingSection {
    /// Parse the section into a [`LoggingConfig`].
    pub fn to_logging_config(&self) -> Result<LoggingConfig> {
        let level: LogLevel = self.level.parse()?;
        let format = match &self.format {
            Some(s) => s.parse::<LogFormat>()?,
            None => LogFormat::default(),
        };

        let mut config = LoggingConfig::default()
            .with_level(level)
            .with_format(format);
        if let Some(filter) = &self.filter {
            config = config.with_filter(filter.clone());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> PipelineConfig {
        PipelineConfig::default()
            .with_database_path("data/pipeline.db")
            .with_media_dir("data/media")
    }

    #[test]
    fn test_defaults_require_paths() {
        let config = PipelineConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("database_path"));
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_in_memory_needs_no_path() {
        let mut config = valid_config();
        config.storage.database_path = PathBuf::new();
        config.storage.in_memory = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_search_defaults() {
        let search = SearchConfig::default();
        assert!(search.base_url.contains("music-search"));
        assert_eq!(search.lang, "ru");
        assert_eq!(search.max_candidates, 5);
        assert_eq!(search.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_media_defaults() {
        let media = MediaConfig::default();
        assert_eq!(media.downloader_bin, "yt-dlp");
        assert_eq!(media.max_duration_secs, 600);
        assert_eq!(media.audio_format, "mp3");
        assert_eq!(media.max_concurrent_downloads, 2);
    }

    #[test]
    fn test_section_validation_failures() {
        let mut config = valid_config();
        config.search.max_candidates = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.search.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.media.max_duration_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.media.max_concurrent_downloads = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.lyrics.retry_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_messages_name_their_section() {
        let mut config = valid_config();
        config.media.downloader_bin = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("[media]"));
    }

    #[test]
    fn test_from_toml_str() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [storage]
            database_path = "data/pipeline.db"
            max_connections = 3

            [search]
            lang = "en"
            max_candidates = 3

            [lyrics]
            genius_token = "abc"

            [media]
            media_dir = "data/media"
            max_duration_secs = 300

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.max_connections, 3);
        assert_eq!(config.search.lang, "en");
        assert_eq!(config.search.max_candidates, 3);
        assert_eq!(config.lyrics.genius_token.as_deref(), Some("abc"));
        assert_eq!(config.media.max_duration_secs, 300);
        assert!(config.validate().is_ok());

        let logging = config.logging.to_logging_config().unwrap();
        assert_eq!(logging.level, LogLevel::Debug);
        assert_eq!(logging.format, LogFormat::Json);
    }

    #[test]
    fn test_from_toml_str_rejects_garbage() {
        assert!(PipelineConfig::from_toml_str("[storage\nbroken").is_err());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [storage]
            database_path = "x.db"

            [media]
            media_dir = "m"
            "#,
        )
        .unwrap();

        assert_eq!(config.search.max_candidates, 5);
        assert_eq!(config.lyrics.retry_attempts, 2);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }
}
