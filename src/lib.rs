//! Workspace placeholder crate.
//!
//! This crate exists so host applications can depend on `rmc-workspace` and
//! reach the resolution pipeline without wiring each member crate
//! individually. The full surface lives in the member crates
//! (`core-resolve`, `core-lyrics`, `core-audio`, `core-store`,
//! `core-runtime`).

pub use core_resolve::{ResolutionPipeline, ResolveError, Result};
