use std::path::PathBuf;
use std::time::Duration;

use core_runtime::config::MediaConfig;

/// Configuration for audio acquisition
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Directory where finished audio artifacts are kept
    pub media_dir: PathBuf,

    /// Downloader binary invoked for probe and fetch
    pub downloader_bin: String,

    /// Matches at or above this duration are rejected before any download
    pub max_duration_secs: u64,

    /// Maximum concurrent downloads across all tracks
    pub max_concurrent_downloads: usize,

    /// Timeout for one download and transcode
    pub download_timeout: Duration,

    /// Timeout for the metadata probe
    pub probe_timeout: Duration,

    /// How long a caller waits for a download slot
    pub queue_timeout: Duration,

    /// Target audio container passed to the downloader
    pub audio_format: String,

    /// Target audio quality passed to the downloader
    pub audio_quality: String,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from("media"),
            downloader_bin: "yt-dlp".to_string(),
            max_duration_secs: 600, // 10 minutes
            max_concurrent_downloads: 2,
            download_timeout: Duration::from_secs(300), // 5 minutes
            probe_timeout: Duration::from_secs(30),
            queue_timeout: Duration::from_secs(60),
            audio_format: "mp3".to_string(),
            audio_quality: "192K".to_string(),
        }
    }
}

impl AcquisitionConfig {
    /// Create a new configuration with the given media directory
    pub fn new(media_dir: impl Into<PathBuf>) -> Self {
        Self {
            media_dir: media_dir.into(),
            ..Default::default()
        }
    }

    /// Set the duration ceiling in seconds
    pub fn with_max_duration_secs(mut self, secs: u64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    /// Set the maximum number of concurrent downloads
    pub fn with_max_concurrent_downloads(mut self, count: usize) -> Self {
        self.max_concurrent_downloads = count;
        self
    }

    /// Set the downloader binary
    pub fn with_downloader_bin(mut self, bin: impl Into<String>) -> Self {
        self.downloader_bin = bin.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.media_dir.as_os_str().is_empty() {
            return Err("media_dir cannot be empty".to_string());
        }

        if self.downloader_bin.is_empty() {
            return Err("downloader_bin cannot be empty".to_string());
        }

        if self.max_duration_secs == 0 {
            return Err("max_duration_secs must be greater than 0".to_string());
        }

        if self.max_concurrent_downloads == 0 {
            return Err("max_concurrent_downloads must be greater than 0".to_string());
        }

        if self.audio_format.is_empty() {
            return Err("audio_format cannot be empty".to_string());
        }

        Ok(())
    }
}

impl From<&MediaConfig> for AcquisitionConfig {
    fn from(config: &MediaConfig) -> Self {
        Self {
            media_dir: config.media_dir.clone(),
            downloader_bin: config.downloader_bin.clone(),
            max_duration_secs: config.max_duration_secs,
            max_concurrent_downloads: config.max_concurrent_downloads,
            download_timeout: config.download_timeout(),
            probe_timeout: config.probe_timeout(),
            queue_timeout: config.queue_timeout(),
            audio_format: config.audio_format.clone(),
            audio_quality: config.audio_quality.clone(),
        }
    }
}
