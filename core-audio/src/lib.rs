//! # Audio Acquisition Module
//!
//! Downloads audio for resolved tracks through an external media source.
//!
//! Acquisition is idempotent per track: once a download has succeeded the
//! stored reference is returned without any source traffic, and concurrent
//! requests for one track collapse into a single download. Matches are
//! probed before transfer, so media at or above the duration ceiling is
//! rejected without downloading anything.

pub mod acquirer;
pub mod config;
pub mod error;
pub mod source;

pub use acquirer::AudioAcquirer;
pub use config::AcquisitionConfig;
pub use error::{AudioError, Result};
pub use source::{AudioReference, MediaProbe, MediaSource, YtDlpSource};
