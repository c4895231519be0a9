use serde::{Deserialize, Serialize};

/// Key of the HTTP port
pub const PORT_KEY: &str = "port";
/// Key of the bind address
pub const IP_KEY: &str = "ip";
/// Key of the exposition path
pub const METRIC_PATH_KEY: &str = "metric_path";
/// Key of the optional name suffix
pub const SUFFIX_KEY: &str = "suffix";
/// Key of the optional static labels
pub const LABELS_KEY: &str = "labels";

/// Location of the configuration file, relative to the extension home
pub const CONFIG_LOCATION: &str = "conf/config.properties";
/// Location used by older releases, still honoured with a warning
pub const LEGACY_CONFIG_LOCATION: &str = "prometheusConfiguration.properties";

/// Smallest port accepted from a configuration file
pub const MIN_PORT: i64 = 1;
/// Largest port accepted from a configuration file
pub const MAX_PORT: i64 = 65535;

/// Resolved exporter configuration as read from the configuration file.
///
/// `port` is kept wide so that out-of-range values survive parsing and can be
/// reported by validation with the value the operator actually wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// HTTP port, 1-65535
    pub port: i64,

    /// Address to bind to; must not be blank
    pub ip: String,

    /// Path the exposition is served on, in addition to `/`
    pub metric_path: String,

    /// Appended to every exported metric name as `_<suffix>`
    #[serde(default)]
    pub suffix: String,

    /// Static labels, `name=value` pairs separated by `;`
    #[serde(default)]
    pub labels: String,
}

impl ExtensionConfig {
    /// Create a configuration without decoration
    pub fn new(ip: impl Into<String>, port: i64, metric_path: impl Into<String>) -> Self {
        Self {
            port,
            ip: ip.into(),
            metric_path: metric_path.into(),
            suffix: String::new(),
            labels: String::new(),
        }
    }

    /// Set the name suffix
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Set the static label declaration
    pub fn with_labels(mut self, labels: impl Into<String>) -> Self {
        self.labels = labels.into();
        self
    }

    /// Port as a socket port, `None` when out of range
    pub fn socket_port(&self) -> Option<u16> {
        u16::try_from(self.port).ok()
    }

    /// `ip:port` for log lines
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self::new("0.0.0.0", 9399, "/metrics")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExtensionConfig::default();
        assert_eq!(config.port, 9399);
        assert_eq!(config.metric_path, "/metrics");
        assert!(config.suffix.is_empty());
        assert!(config.labels.is_empty());
    }

    #[test]
    fn test_socket_port_range() {
        assert_eq!(ExtensionConfig::new("127.0.0.1", 8080, "/").socket_port(), Some(8080));
        assert_eq!(ExtensionConfig::new("127.0.0.1", 70000, "/").socket_port(), None);
        assert_eq!(ExtensionConfig::new("127.0.0.1", -1, "/").socket_port(), None);
    }

    #[test]
    fn test_optional_keys_default_when_deserializing() {
        let config: ExtensionConfig =
            serde_json::from_str(r#"{"port": 9000, "ip": "::", "metric_path": "/m"}"#).unwrap();
        assert_eq!(config.socket_addr(), ":::9000");
        assert!(config.suffix.is_empty());
    }
}
