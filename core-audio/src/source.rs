//! Media source backends for audio acquisition.
//!
//! The default backend shells out to yt-dlp. A JSON probe locates the best
//! search match and reports its duration, then a second invocation downloads
//! and transcodes the audio into a staging directory. The finished artifact
//! is moved into the media directory and the staging directory is removed
//! whether the attempt succeeded or not.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use core_store::TrackId;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AcquisitionConfig;
use crate::error::{AudioError, Result};

// ===== Audio Reference =====

/// Opaque handle to an acquired audio artifact.
///
/// The wrapped string is stored verbatim on the track row and handed back to
/// callers on the fast path. Consumers treat it as a key into the media
/// directory, not as a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AudioReference(String);

impl AudioReference {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AudioReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AudioReference {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ===== Probe Types =====

/// Metadata for the best search match, reported before any download starts
#[derive(Debug, Clone)]
pub struct MediaProbe {
    /// Title reported by the source
    pub title: String,
    /// Duration in seconds, when the source knows it
    pub duration_secs: Option<f64>,
    /// Canonical page URL used for the follow-up download
    pub media_url: String,
}

// ===== Source Trait =====

/// A backend that locates and delivers audio for free-text search queries
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Locate the best match for the search text without transferring media
    async fn probe(&self, search_text: &str) -> Result<MediaProbe>;

    /// Download and transcode the probed media, returning the reference
    /// that callers receive and the track row stores
    async fn fetch(&self, track_id: TrackId, probe: &MediaProbe) -> Result<AudioReference>;
}

// ===== yt-dlp Source =====

/// Search prefix asking yt-dlp for the single best match
const SEARCH_PREFIX: &str = "ytsearch1:";

/// `MediaSource` backed by the yt-dlp command line tool
pub struct YtDlpSource {
    config: AcquisitionConfig,
}

impl YtDlpSource {
    pub fn new(config: AcquisitionConfig) -> Self {
        Self { config }
    }

    /// Per-attempt staging directory under the media directory.
    ///
    /// Staging on the same filesystem keeps the final rename atomic.
    fn staging_dir(&self) -> PathBuf {
        self.config
            .media_dir
            .join(format!(".staging-{}", Uuid::new_v4()))
    }
}

/// Removes the staging directory when the attempt ends, including when the
/// owning future is dropped by a timeout or cancellation.
struct StagingGuard(PathBuf);

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.0) {
            warn!(
                "Failed to remove staging directory {}: {}",
                self.0.display(),
                e
            );
        }
    }
}

impl YtDlpSource {

    async fn download_into(
        &self,
        track_id: TrackId,
        probe: &MediaProbe,
        staging: &Path,
    ) -> Result<AudioReference> {
        let template = staging.join(format!("{}.%(ext)s", track_id));
        info!("Downloading '{}' for track {}", probe.title, track_id);

        let output = Command::new(&self.config.downloader_bin)
            .arg("--extract-audio")
            .arg("--audio-format")
            .arg(&self.config.audio_format)
            .arg("--audio-quality")
            .arg(&self.config.audio_quality)
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--output")
            .arg(&template)
            .arg(&probe.media_url)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudioError::SourceFailed(format!(
                "download exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let artifact = find_artifact(staging, &self.config.audio_format).await?;
        let digest = file_digest(&artifact).await?;
        debug!("Artifact for track {} has digest {}", track_id, digest);

        let final_path = self
            .config
            .media_dir
            .join(format!("{}.{}", track_id, self.config.audio_format));
        tokio::fs::rename(&artifact, &final_path).await?;

        info!(
            "Stored audio for track {} at {}",
            track_id,
            final_path.display()
        );
        Ok(AudioReference::new(format!("audio://{}", track_id)))
    }
}

#[async_trait]
impl MediaSource for YtDlpSource {
    async fn probe(&self, search_text: &str) -> Result<MediaProbe> {
        let target = format!("{}{}", SEARCH_PREFIX, search_text);
        debug!("Probing media source for '{}'", search_text);

        let output = Command::new(&self.config.downloader_bin)
            .arg("--dump-json")
            .arg("--skip-download")
            .arg("--no-playlist")
            .arg(&target)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudioError::SourceFailed(format!(
                "probe exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        parse_probe_output(&output.stdout)
    }

    async fn fetch(&self, track_id: TrackId, probe: &MediaProbe) -> Result<AudioReference> {
        let staging = self.staging_dir();
        tokio::fs::create_dir_all(&staging).await?;

        // The guard removes staging on success, on failure, and when the
        // future is dropped by a timeout or cancellation
        let guard = StagingGuard(staging);
        self.download_into(track_id, probe, &guard.0).await
    }
}

// ===== Probe Output Parsing =====

#[derive(Debug, Deserialize)]
struct ProbeRecord {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    webpage_url: Option<String>,
    #[serde(default)]
    original_url: Option<String>,
}

/// Parse the JSON record yt-dlp prints for a probed match.
///
/// `--dump-json` emits one JSON object per line and a search that matches
/// nothing emits no object at all.
fn parse_probe_output(stdout: &[u8]) -> Result<MediaProbe> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with('{'))
        .ok_or_else(|| AudioError::SourceFailed("probe matched nothing".to_string()))?;

    let record: ProbeRecord = serde_json::from_str(line)
        .map_err(|e| AudioError::SourceFailed(format!("probe output invalid: {}", e)))?;

    let media_url = record
        .webpage_url
        .or(record.original_url)
        .ok_or_else(|| AudioError::SourceFailed("probe record has no URL".to_string()))?;

    Ok(MediaProbe {
        title: record.title.unwrap_or_else(|| "unknown".to_string()),
        duration_secs: record.duration,
        media_url,
    })
}

/// Locate the downloaded artifact inside the staging directory.
///
/// yt-dlp picks the final extension itself, so the output template cannot
/// be trusted to name the file exactly.
async fn find_artifact(staging: &Path, audio_format: &str) -> Result<PathBuf> {
    let mut entries = tokio::fs::read_dir(staging).await?;
    let mut fallback = None;

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(audio_format) {
            return Ok(path);
        }
        if fallback.is_none() {
            fallback = Some(path);
        }
    }

    fallback.ok_or_else(|| AudioError::SourceFailed("download produced no artifact".to_string()))
}

/// SHA-256 digest of a finished artifact, hex encoded
async fn file_digest(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}
