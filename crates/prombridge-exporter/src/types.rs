//! Common types for metrics exposition

use prombridge_config::{check_metric_path, check_port, ConfigError, ExtensionConfig};
use serde::{Deserialize, Serialize};

use crate::error::ExporterResult;
use crate::sample::parse_static_labels;

/// Quantiles exported for every histogram and timer unless configured otherwise
pub const DEFAULT_QUANTILES: [f64; 6] = [0.5, 0.75, 0.95, 0.98, 0.99, 0.999];

/// Prometheus metric type of a family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Monotonic total
    Counter,
    /// Point-in-time reading
    Gauge,
    /// Bucketed distribution
    Histogram,
    /// Quantiles plus count
    Summary,
}

impl MetricKind {
    /// Name used on `# TYPE` lines
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
        }
    }
}

/// One exposition line: sanitized name, labels and value
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Sanitized name, `[a-zA-Z_:][a-zA-Z0-9_:]*`
    pub name: String,
    /// Label names, unique within the sample
    pub label_names: Vec<String>,
    /// Label values, parallel to `label_names`
    pub label_values: Vec<String>,
    /// Sample value
    pub value: f64,
}

impl Sample {
    /// Value of the label `name`, if present
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels()
            .find(|(label, _)| *label == name)
            .map(|(_, value)| value)
    }

    /// Label name/value pairs in order
    pub fn labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.label_names
            .iter()
            .map(String::as_str)
            .zip(self.label_values.iter().map(String::as_str))
    }
}

/// Samples sharing a name and type, rebuilt on every scrape
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    /// Family name
    pub name: String,
    /// Help text
    pub help: Option<String>,
    /// Type
    pub kind: MetricKind,
    /// Samples in registry order
    pub samples: Vec<Sample>,
}

/// Decoration applied to every sample of one exporter instance
#[derive(Debug, Clone, PartialEq)]
pub struct ExporterConfig {
    /// Static labels in declaration order
    pub labels: Vec<(String, String)>,
    /// Name suffix, empty for none
    pub suffix: String,
    /// Quantiles exported for histograms and timers
    pub quantiles: Vec<f64>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            suffix: String::new(),
            quantiles: DEFAULT_QUANTILES.to_vec(),
        }
    }
}

impl ExporterConfig {
    /// Build from the `suffix` and `labels` keys; malformed labels are skipped
    pub fn from_extension(config: &ExtensionConfig) -> Self {
        Self {
            labels: parse_static_labels(&config.labels),
            suffix: config.suffix.trim().to_string(),
            ..Default::default()
        }
    }

    /// Set the suffix
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Set static labels from a `name=value;...` declaration
    pub fn with_label_declaration(mut self, declaration: &str) -> Self {
        self.labels = parse_static_labels(declaration);
        self
    }

    /// Replace the quantile set; values outside 0..=1 are dropped
    pub fn with_quantiles(mut self, quantiles: &[f64]) -> Self {
        self.quantiles = quantiles
            .iter()
            .copied()
            .filter(|q| (0.0..=1.0).contains(q))
            .collect();
        self
    }
}

/// Configuration for the metrics HTTP server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host, empty for the wildcard address
    pub host: String,

    /// Bind port, 0 for an ephemeral port
    pub port: u16,

    /// Path served in addition to `/`
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 0,
            path: "/metrics".to_string(),
        }
    }
}

impl ServerConfig {
    /// Create new config
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
        }
    }

    /// Convert a validated extension configuration
    pub fn from_extension(config: &ExtensionConfig) -> ExporterResult<Self> {
        let port = config.socket_port().ok_or_else(|| {
            ConfigError::Invalid(check_port(config.port).into_iter().collect())
        })?;
        if let Some(violation) = check_metric_path(&config.metric_path) {
            return Err(ConfigError::Invalid(vec![violation]).into());
        }
        Ok(Self::new(config.ip.trim(), port, config.metric_path.clone()))
    }

    /// Host to bind, resolving the empty host to the wildcard address
    pub fn bind_host(&self) -> &str {
        match self.host.trim() {
            "" => "0.0.0.0",
            host => host,
        }
    }

    /// Get bind address with port
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_host(), self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 0);
        assert_eq!(config.path, "/metrics");
        assert_eq!(config.socket_addr(), "0.0.0.0:0");
    }

    #[test]
    fn test_server_config_from_extension() {
        let config =
            ServerConfig::from_extension(&ExtensionConfig::new(" 127.0.0.1 ", 9399, "/m")).unwrap();
        assert_eq!(config.socket_addr(), "127.0.0.1:9399");
        assert_eq!(config.path, "/m");
    }

    #[test]
    fn test_server_config_rejects_port_out_of_range() {
        let err = ServerConfig::from_extension(&ExtensionConfig::new("127.0.0.1", 70000, "/m"))
            .unwrap_err();
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_exporter_config_from_extension() {
        let config = ExporterConfig::from_extension(
            &ExtensionConfig::default()
                .with_suffix("cluster1")
                .with_labels("a=1;b=2"),
        );
        assert_eq!(config.suffix, "cluster1");
        assert_eq!(
            config.labels,
            vec![("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]
        );
        assert_eq!(config.quantiles, DEFAULT_QUANTILES.to_vec());
    }

    #[test]
    fn test_quantiles_out_of_range_dropped() {
        let config = ExporterConfig::default().with_quantiles(&[0.5, 1.5, -0.1, 0.9]);
        assert_eq!(config.quantiles, vec![0.5, 0.9]);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(MetricKind::Counter.as_str(), "counter");
        assert_eq!(MetricKind::Summary.as_str(), "summary");
    }
}
