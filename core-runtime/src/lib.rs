//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the resolution pipeline:
//! - Logging and tracing infrastructure
//! - Configuration management (builder, validation, TOML files)
//! - HTTP client abstraction shared by the search and lyrics layers
//!
//! ## Overview
//!
//! This crate contains the runtime utilities every other crate in the
//! workspace depends on. It establishes the logging conventions, the
//! configuration validation rules, and the `HttpClient` capability trait
//! that keeps upstream-facing code testable with canned responses.

pub mod config;
pub mod error;
pub mod http;
pub mod logging;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
