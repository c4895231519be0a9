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
//! Error types for configuration loading and validation.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single rule a configuration value broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Configuration key the violation is about (`port`, `ip`, ...)
    pub field: String,
    /// Human-readable explanation, always mentioning the key
    pub reason: String,
}

impl Violation {
    /// Create a violation for `field`
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Errors raised while locating, parsing or validating a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read
    #[error("IO error reading configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML syntax or type error
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),

    /// YAML syntax or type error
    #[error("Failed to parse YAML configuration: {0}")]
    YamlParseError(#[from] serde_yaml::Error),

    /// JSON syntax or type error
    #[error("Failed to parse JSON configuration: {0}")]
    JsonParseError(#[from] serde_json::error::Error),

    /// The file extension is not one of the supported formats
    #[error("Unsupported configuration format: {0}. Supported formats: properties, toml, yaml, json")]
    UnsupportedFormat(String),

    /// No readable file at the resolved location
    #[error("Configuration file not found at path: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The path has no extension to detect the format from
    #[error("Invalid configuration path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// One or more required keys are absent
    #[error("Missing required configuration of: {}.", .0.join(" "))]
    MissingRequired(Vec<String>),

    /// Every value was present but at least one is unusable
    #[error("Error while parsing and testing the configuration: {}", join_violations(.0))]
    Invalid(Vec<Violation>),
}

impl ConfigError {
    /// Keys named by this error, if it is about specific keys
    pub fn fields(&self) -> Vec<&str> {
        match self {
            ConfigError::MissingRequired(keys) => keys.iter().map(String::as_str).collect(),
            ConfigError::Invalid(violations) => {
                violations.iter().map(|v| v.field.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Result alias used throughout the crate
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_message_lists_every_violation() {
        let err = ConfigError::Invalid(vec![
            Violation::new("port", "The port must not be greater than 65535. Value was 70000."),
            Violation::new("ip", "The ip must not be blank."),
        ]);
        let message = err.to_string();
        assert!(message.starts_with("Error while parsing and testing the configuration:"));
        assert!(message.contains("port"));
        assert!(message.contains("ip must not be blank"));
        assert_eq!(err.fields(), vec!["port", "ip"]);
    }

    #[test]
    fn test_missing_required_message() {
        let err = ConfigError::MissingRequired(vec!["metric_path".into(), "port".into()]);
        assert_eq!(
            err.to_string(),
            "Missing required configuration of: metric_path port."
        );
    }
}
