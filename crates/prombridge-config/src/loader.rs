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
use crate::error::{ConfigError, ConfigResult, Violation};
use crate::schema::{
    ExtensionConfig, IP_KEY, LABELS_KEY, METRIC_PATH_KEY, PORT_KEY, SUFFIX_KEY,
};
use crate::validation::{check_ip, check_metric_path, Validator};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `key=value` lines
    Properties,
    /// TOML document with top-level keys
    Toml,
    /// YAML mapping
    Yaml,
    /// JSON object
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("properties") => Ok(ConfigFormat::Properties),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::InvalidPath(path.to_path_buf())),
        }
    }

    /// Get format name as string
    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Properties => "properties",
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Json => "JSON",
        }
    }
}

/// Port as written by the operator: structured formats may carry a number,
/// properties files always carry text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPort {
    Number(i64),
    Text(String),
}

/// Document shape before required keys are checked.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    port: Option<RawPort>,
    ip: Option<String>,
    metric_path: Option<String>,
    suffix: Option<String>,
    labels: Option<String>,
}

impl RawConfig {
    fn from_properties(mut entries: HashMap<String, String>) -> Self {
        RawConfig {
            port: entries.remove(PORT_KEY).map(RawPort::Text),
            ip: entries.remove(IP_KEY),
            metric_path: entries.remove(METRIC_PATH_KEY),
            suffix: entries.remove(SUFFIX_KEY),
            labels: entries.remove(LABELS_KEY),
        }
    }

    fn into_config(self) -> ConfigResult<ExtensionConfig> {
        let mut missing = Vec::new();
        if self.metric_path.is_none() {
            missing.push(METRIC_PATH_KEY.to_string());
        }
        if self.ip.is_none() {
            missing.push(IP_KEY.to_string());
        }
        if self.port.is_none() {
            missing.push(PORT_KEY.to_string());
        }

        let (Some(port), Some(ip), Some(metric_path)) = (self.port, self.ip, self.metric_path)
        else {
            return Err(ConfigError::MissingRequired(missing));
        };

        let port = match port {
            RawPort::Number(port) => port,
            RawPort::Text(text) => match text.trim().parse::<i64>() {
                Ok(port) => port,
                Err(_) => {
                    // The remaining keys are still checked so that one run
                    // reports everything that is wrong.
                    let mut violations = vec![Violation::new(
                        PORT_KEY,
                        format!("Invalid port configuration '{}'.", text),
                    )];
                    violations.extend(check_metric_path(&metric_path));
                    violations.extend(check_ip(&ip));
                    return Err(ConfigError::Invalid(violations));
                }
            },
        };

        Ok(ExtensionConfig {
            port,
            ip,
            metric_path,
            suffix: self.suffix.unwrap_or_default(),
            labels: self.labels.unwrap_or_default(),
        })
    }
}

/// Reads and validates configuration files
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        ConfigLoader
    }

    /// Load configuration from a file
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<ExtensionConfig> {
        let config = self.read_file(path.as_ref())?;
        self.finish(config)
    }

    /// Load configuration from a string
    pub fn load_from_string(
        &self,
        content: &str,
        format: ConfigFormat,
    ) -> ConfigResult<ExtensionConfig> {
        let config = self.parse(content, format)?;
        self.finish(config)
    }

    fn read_file(&self, path: &Path) -> ConfigResult<ExtensionConfig> {
        debug!("Loading configuration from: {}", path.display());

        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path)?;

        info!(
            "Loaded {} configuration file: {}",
            format.name(),
            path.display()
        );

        self.parse(&content, format)
    }

    fn parse(&self, content: &str, format: ConfigFormat) -> ConfigResult<ExtensionConfig> {
        let raw = match format {
            ConfigFormat::Properties => RawConfig::from_properties(parse_properties(content)),
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };

        debug!("Configuration parsed from {}", format.name());
        raw.into_config()
    }

    fn finish(&self, config: ExtensionConfig) -> ConfigResult<ExtensionConfig> {
        config.validate()?;
        debug!("Configuration validated successfully");
        Ok(config)
    }
}

/// Parse `key=value` / `key: value` lines.
///
/// `#` and `!` start comments, a trailing backslash continues the logical
/// line, leading whitespace of values is dropped and later keys win.
pub fn parse_properties(content: &str) -> HashMap<String, String> {
    let mut entries = HashMap::new();
    let mut logical = String::new();

    for line in content.lines() {
        let line = line.trim_start();
        if logical.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!'))
        {
            continue;
        }

        let trailing_backslashes = line.chars().rev().take_while(|c| *c == '\\').count();
        if trailing_backslashes % 2 == 1 {
            logical.push_str(&line[..line.len() - 1]);
            continue;
        }
        logical.push_str(line);

        let (key, value) = split_property(&logical);
        entries.insert(key.to_string(), value.to_string());
        logical.clear();
    }

    if !logical.is_empty() {
        let (key, value) = split_property(&logical);
        entries.insert(key.to_string(), value.to_string());
    }

    entries
}

fn split_property(line: &str) -> (&str, &str) {
    match line.find(['=', ':']) {
        Some(idx) => (line[..idx].trim_end(), line[idx + 1..].trim_start()),
        None => (line.trim_end(), ""),
    }
}
