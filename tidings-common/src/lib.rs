//! Shared plumbing for the Tidings crates.
//!
//! Right now this is only [`observability`]: one place that owns the global
//! `tracing` subscriber so the CLI and integration tests log the same way.
//!
//! ```rust
//! use tidings_common::observability::{LogConfig, LogFormat};
//!
//! let cfg = LogConfig {
//!     format: LogFormat::Json,
//!     ..LogConfig::default()
//! };
//! assert_eq!(cfg.app_name, "tidings");
//! assert_eq!(cfg.default_filter, "info");
//! ```
pub mod observability;

pub use observability::{init_logging, LogConfig, LogFormat};
