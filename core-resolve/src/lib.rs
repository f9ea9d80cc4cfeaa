//! # Resolution Facade
//!
//! Ties the pipeline together: query cache + upstream search feed the track
//! store, and the stored tracks key lyrics aggregation and audio
//! acquisition. Hosts construct the pipeline with injected collaborators;
//! nothing in this crate reaches for globals.

pub mod error;
pub mod pipeline;
pub mod search;

pub use error::{ResolveError, Result};
pub use pipeline::{ResolutionPipeline, DEFAULT_MAX_CANDIDATES};
pub use search::{extract_candidates, HttpSearchProvider, SearchProvider};
