// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! Logging initialization and setup.
//!
//! The exporter usually runs inside a host process that may already own the
//! global subscriber, so installation is attempted with `try_init` and a
//! conflict is reported as [`LogError::AlreadyInitialized`] instead of
//! panicking.

use crate::config::{LogConfig, LogError, LogFormat};
use std::io;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Initialize tracing with the specified format and optional log level.
///
/// # Arguments
///
/// * `format` - The output format for logs
/// * `level` - Optional filter (e.g., "info", "debug"). If None, uses RUST_LOG
///
/// # Example
///
/// ```ignore
/// use prombridge_observability::{init_tracing, LogFormat};
///
/// init_tracing(LogFormat::Compact, Some("debug"))?;
/// tracing::info!("exporter starting");
/// ```
pub fn init_tracing(format: LogFormat, level: Option<&str>) -> Result<(), LogError> {
    let mut config = LogConfig::new().with_format(format);
    if let Some(level) = level {
        config = config.with_level(level);
    }
    init_tracing_with_config(config)
}

/// Initialize tracing with a detailed configuration.
pub fn init_tracing_with_config(config: LogConfig) -> Result<(), LogError> {
    let env_filter = build_env_filter(&config)?;
    let registry = Registry::default().with(env_filter);
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_thread_names(true);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(layer.with_ansi(config.use_color).pretty())
            .try_init(),
        LogFormat::Compact => registry
            .with(
                layer
                    .with_ansi(config.use_color)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    };

    result.map_err(already_initialized)
}

fn already_initialized(e: TryInitError) -> LogError {
    LogError::AlreadyInitialized(e.to_string())
}

/// Build an environment filter for the given configuration
fn build_env_filter(config: &LogConfig) -> Result<EnvFilter, LogError> {
    let level_str = config.effective_level();

    EnvFilter::try_new(&level_str).map_err(|e| {
        LogError::ConfigError(format!("Failed to parse log filter '{}': {}", level_str, e))
    })
}
