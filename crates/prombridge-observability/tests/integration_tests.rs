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
//! Integration tests for logging system
//!
//! This binary is its own process, so it is the one place where installing
//! the global subscriber can be exercised.

use prombridge_observability::{init_tracing, init_tracing_with_config, LogConfig, LogError, LogFormat};

#[test]
fn test_config_builder_chaining() {
    let config = LogConfig::new()
        .with_format(LogFormat::Json)
        .with_level("debug")
        .with_color(false);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, Some("debug".to_string()));
    assert!(!config.use_color);
}

#[test]
fn test_explicit_level_wins() {
    let config = LogConfig::new()
        .with_format(LogFormat::Compact)
        .with_level("warn");
    assert_eq!(config.effective_level(), "warn");
}

#[test]
fn test_bad_filter_is_reported_before_installing() {
    let result = init_tracing_with_config(LogConfig::new().with_level("prombridge=notalevel"));
    assert!(matches!(result, Err(LogError::ConfigError(_))));
}

#[test]
fn test_second_initialization_is_reported_not_panicking() {
    let first = init_tracing_with_config(
        LogConfig::new()
            .with_format(LogFormat::Compact)
            .with_level("info")
            .with_color(false),
    );
    assert!(first.is_ok());

    tracing::info!(component = "test", "subscriber installed");

    let second = init_tracing(LogFormat::Json, Some("debug"));
    assert!(matches!(second, Err(LogError::AlreadyInitialized(_))));
}
