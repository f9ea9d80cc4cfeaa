//! Audio acquisition with per-track single flight.
//!
//! Concurrent callers for one track funnel through a per-track lock: the
//! first caller probes and downloads while the rest wait, then observe the
//! stored reference on re-check. A global semaphore bounds concurrent
//! downloads across tracks, and nothing is persisted until the artifact is
//! fully in place, so every failure leaves the track retryable.

use std::collections::HashMap;
use std::sync::Arc;

use core_store::{TrackId, TrackRepository};
use tokio::sync::{Mutex, Semaphore};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::AcquisitionConfig;
use crate::error::{AudioError, Result};
use crate::source::{AudioReference, MediaSource};

/// Coordinates audio downloads so each track is fetched at most once
pub struct AudioAcquirer {
    config: AcquisitionConfig,
    source: Arc<dyn MediaSource>,
    track_repo: Arc<dyn TrackRepository>,
    download_semaphore: Arc<Semaphore>,
    track_locks: Arc<Mutex<HashMap<TrackId, Arc<Mutex<()>>>>>,
    cancel_token: CancellationToken,
}

impl AudioAcquirer {
    pub fn new(
        config: AcquisitionConfig,
        source: Arc<dyn MediaSource>,
        track_repo: Arc<dyn TrackRepository>,
    ) -> Self {
        let permits = config.max_concurrent_downloads;
        Self {
            config,
            source,
            track_repo,
            download_semaphore: Arc::new(Semaphore::new(permits)),
            track_locks: Arc::new(Mutex::new(HashMap::new())),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Abandon in-flight acquisitions and refuse queued ones.
    ///
    /// Acquisitions interrupted here have written nothing, so they can be
    /// retried after a restart.
    pub fn shutdown(&self) {
        info!("Audio acquirer shutting down");
        self.cancel_token.cancel();
        self.download_semaphore.close();
    }

    /// Return the audio reference for a track, downloading it on first use.
    ///
    /// The fast path returns the stored reference without touching the
    /// media source. Otherwise the caller takes the per-track lock, so a
    /// burst of requests for one track performs a single download.
    #[instrument(skip(self))]
    pub async fn acquire(&self, track_id: TrackId) -> Result<AudioReference> {
        let track = self
            .track_repo
            .find_by_id(track_id)
            .await?
            .ok_or(AudioError::TrackNotFound(track_id))?;

        // Fast path: a previous acquisition already stored the reference
        if let Some(reference) = track.audio_ref {
            debug!("Track {} already has audio", track_id);
            return Ok(AudioReference::from(reference));
        }

        let track_lock = self.track_lock(track_id).await;
        let outcome = {
            let _flight = track_lock.lock().await;

            // Re-check under the lock: the previous holder may have stored
            // the reference while this caller waited
            match self.track_repo.find_by_id(track_id).await {
                Ok(Some(current)) => match current.audio_ref {
                    Some(reference) => {
                        debug!("Track {} was acquired while this caller waited", track_id);
                        Ok(AudioReference::from(reference))
                    }
                    None => self.download(track_id, &current.search_text()).await,
                },
                Ok(None) => Err(AudioError::TrackNotFound(track_id)),
                Err(e) => Err(e.into()),
            }
        };
        drop(track_lock);
        self.cleanup_track_lock(track_id).await;

        outcome
    }

    async fn track_lock(&self, track_id: TrackId) -> Arc<Mutex<()>> {
        let mut locks = self.track_locks.lock().await;
        locks
            .entry(track_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn cleanup_track_lock(&self, track_id: TrackId) {
        let mut locks = self.track_locks.lock().await;
        if let Some(lock) = locks.get(&track_id) {
            // Only the map itself holds the lock once all waiters are gone
            if Arc::strong_count(lock) == 1 {
                locks.remove(&track_id);
            }
        }
    }

    async fn download(&self, track_id: TrackId, search_text: &str) -> Result<AudioReference> {
        // Bound download concurrency across all tracks
        let _permit =
            match timeout(self.config.queue_timeout, self.download_semaphore.acquire()).await {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => return Err(AudioError::Cancelled),
                Err(_) => {
                    warn!(
                        "No download slot for track {} within {:?}",
                        track_id, self.config.queue_timeout
                    );
                    return Err(AudioError::Busy);
                }
            };

        if self.cancel_token.is_cancelled() {
            return Err(AudioError::Cancelled);
        }

        info!("Acquiring audio for track {} ('{}')", track_id, search_text);

        // Probe first so an over-limit match never starts a transfer
        let probe = match timeout(self.config.probe_timeout, self.source.probe(search_text)).await
        {
            Ok(result) => result?,
            Err(_) => return Err(AudioError::Timeout("probing media")),
        };

        match probe.duration_secs {
            Some(duration) if duration >= self.config.max_duration_secs as f64 => {
                warn!(
                    "Track {} matched '{}' at {:.0}s, over the {}s limit",
                    track_id, probe.title, duration, self.config.max_duration_secs
                );
                return Err(AudioError::DurationExceeded {
                    duration_secs: duration,
                    limit_secs: self.config.max_duration_secs,
                });
            }
            Some(_) => {}
            None => {
                // An unknown duration cannot be checked against the limit
                return Err(AudioError::SourceFailed(format!(
                    "match '{}' reports no duration",
                    probe.title
                )));
            }
        }

        let reference = tokio::select! {
            _ = self.cancel_token.cancelled() => {
                info!("Acquisition for track {} abandoned by shutdown", track_id);
                return Err(AudioError::Cancelled);
            }
            result = timeout(self.config.download_timeout, self.source.fetch(track_id, &probe)) => {
                match result {
                    Ok(fetched) => fetched?,
                    Err(_) => return Err(AudioError::Timeout("downloading media")),
                }
            }
        };

        // Persist only after the artifact is fully in place, so any failure
        // above leaves the track retryable
        self.track_repo
            .set_audio_reference(track_id, reference.as_str())
            .await?;

        info!("Track {} acquired as {}", track_id, reference);
        Ok(reference)
    }
}
