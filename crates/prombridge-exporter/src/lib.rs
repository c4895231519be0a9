//! prombridge exporter
//!
//! Exposes an in-process metric registry over HTTP in the Prometheus text
//! exposition format.
//!
//! # Features
//!
//! - **Registry adapter**: counters, gauges, meters, histograms and timers
//!   become Prometheus samples with sanitized names
//! - **Decoration**: a configured suffix and static labels on every sample
//! - **Quantiles**: histograms and timers expand to one sample per quantile
//!   plus a `_count` sample
//! - **HTTP Endpoint**: the same exposition on `/` and on the configured path,
//!   served by a bounded pool that queues scrapes instead of dropping them
//! - **Shared registry**: an adapter for `prometheus::Registry`
//!
//! # Example
//!
//! ```ignore
//! use prombridge_exporter::{MetricRegistry, PrometheusExporter};
//! use prombridge_config::ExtensionConfig;
//! use std::sync::Arc;
//!
//! let registry = MetricRegistry::new();
//! registry.meter("requests")?.mark();
//!
//! let exporter = PrometheusExporter::new();
//! exporter.start(
//!     &ExtensionConfig::new("0.0.0.0", 9399, "/metrics").with_suffix("cluster1"),
//!     Arc::new(registry.clone()),
//! )?;
//!
//! // GET /metrics now contains `requests_total_cluster1 1`
//! exporter.stop();
//! ```

pub mod collector;
pub mod error;
pub mod exporter;
pub mod exposition;
pub mod lifecycle;
pub mod plugin;
pub mod registry;
pub mod sample;
pub mod server;
pub mod types;

pub use collector::{CollectorRegistry, ExporterCollector};
pub use error::{ExporterError, ExporterResult};
pub use exporter::RegistryExporter;
pub use exposition::{encode_text, ExpositionEndpoint, CONTENT_TYPE};
pub use lifecycle::PrometheusExporter;
pub use plugin::{
    ExtensionInformation, ExtensionMain, ExtensionStartInput, ExtensionStartOutput,
    PrometheusExtension, EXTENSION_NAME,
};
pub use registry::{
    Counter, Gauge, GaugeValue, Histogram, Meter, Metric, MetricRegistry, MetricSource, Snapshot,
    Timer,
};
pub use sample::{parse_static_labels, sanitize_metric_name, SampleBuilder};
pub use server::HttpServer;
pub use types::{ExporterConfig, MetricFamily, MetricKind, Sample, ServerConfig, DEFAULT_QUANTILES};
