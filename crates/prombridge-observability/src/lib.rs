//! prombridge observability
//!
//! Structured logging for the exporter and the binaries that host it.
//!
//! # Features
//!
//! - **Multiple Output Formats**: Pretty, JSON, and compact output formats
//! - **Environment-based Filtering**: Dynamic log level control via `RUST_LOG`
//! - **Host friendly**: never panics when the host already installed a subscriber
//!
//! # Example
//!
//! ```ignore
//! use prombridge_observability::{init_tracing, LogFormat};
//!
//! fn main() {
//!     init_tracing(LogFormat::Pretty, None).ok();
//!     tracing::info!("exporter started");
//! }
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat};
pub use initialization::{init_tracing, init_tracing_with_config};
