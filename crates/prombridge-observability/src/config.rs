//! Logging settings for the exporter and its binary.

use std::str::FromStr;
use thiserror::Error;

/// Errors raised while installing the subscriber
#[derive(Error, Debug)]
pub enum LogError {
    /// The requested format name is unknown
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// The level filter could not be parsed
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A global subscriber was installed before this one
    #[error("A global tracing subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Output format for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, human-readable
    #[default]
    Pretty,

    /// Single line per event
    Compact,

    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(LogError::InvalidFormat(format!(
                "Unknown format: {}. Expected one of: pretty, compact, json",
                s
            ))),
        }
    }
}

/// How diagnostics are rendered.
///
/// Events always go to stderr with timestamps and thread names, so scrape
/// workers show up as `prometheus-http-<pool>-<n>`.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output format
    pub format: LogFormat,

    /// Filter directive such as `info` or `prombridge_exporter=debug`;
    /// `RUST_LOG` applies when unset
    pub level: Option<String>,

    /// ANSI colors for the pretty and compact formats
    pub use_color: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Pretty,
            level: None,
            use_color: true,
        }
    }
}

impl LogConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the filter directive
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Enable or disable colors
    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    /// Directive in effect: the configured one, else `RUST_LOG`, else `info`
    pub fn effective_level(&self) -> String {
        self.level
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| "info".to_string())
    }
}
