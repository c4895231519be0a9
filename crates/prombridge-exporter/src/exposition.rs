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
//! Prometheus text exposition endpoint
//!
//! Serializes a fresh snapshot on every `GET` of `/` or the configured path.
//! Rendering runs on the blocking pool behind a semaphore, so a burst of
//! scrapes queues for a worker instead of being refused.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::fmt::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::error::ExporterResult;
use crate::exporter::RegistryExporter;
use crate::types::MetricFamily;

/// Content type of the text exposition format
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Serves registry snapshots as exposition text
pub struct ExpositionEndpoint {
    exporter: Arc<RegistryExporter>,
}

impl ExpositionEndpoint {
    /// Create an endpoint for `exporter`
    pub fn new(exporter: Arc<RegistryExporter>) -> Self {
        Self { exporter }
    }

    /// Collect and serialize the current registry state
    pub fn render(&self) -> ExporterResult<String> {
        let start = Instant::now();
        let families = self.exporter.collect();
        let body = encode_text(&families)?;
        debug!(
            families = families.len(),
            bytes = body.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Rendered metrics"
        );
        Ok(body)
    }

    /// Router serving `/` and `path`, rendering on at most `workers` threads at once
    pub fn router(self: Arc<Self>, path: &str, workers: usize, render_timeout: Duration) -> Router {
        let state = Arc::new(ScrapeState {
            endpoint: self,
            admission: Arc::new(Semaphore::new(workers.max(1))),
            render_timeout,
        });

        let router = Router::new().route("/", get(scrape));
        let router = if path == "/" {
            router
        } else {
            router.route(path, get(scrape))
        };
        router.with_state(state)
    }
}

struct ScrapeState {
    endpoint: Arc<ExpositionEndpoint>,
    admission: Arc<Semaphore>,
    render_timeout: Duration,
}

/// Handler for `/` and the metrics path
async fn scrape(State(state): State<Arc<ScrapeState>>) -> Response {
    debug!("Serving metrics");

    // Waits for a free worker rather than refusing the scrape.
    let permit = match Arc::clone(&state.admission).acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => {
            warn!("Metrics worker pool closed: {}", e);
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    };

    let endpoint = Arc::clone(&state.endpoint);
    let render = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        endpoint.render()
    });

    match tokio::time::timeout(state.render_timeout, render).await {
        Ok(Ok(Ok(body))) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Ok(Ok(Err(e))) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Ok(Err(e)) => {
            error!("Metrics collection failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(_) => {
            warn!(
                "Metrics render not finished within {:?}, closing connection",
                state.render_timeout
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::CONNECTION, "close")],
            )
                .into_response()
        }
    }
}

/// Serialize families to the text exposition format
pub fn encode_text(families: &[MetricFamily]) -> Result<String, std::fmt::Error> {
    let mut out = String::with_capacity(families.len() * 128);

    for family in families {
        if let Some(help) = &family.help {
            writeln!(out, "# HELP {} {}", family.name, escape_help(help))?;
        }
        writeln!(out, "# TYPE {} {}", family.name, family.kind.as_str())?;

        for sample in &family.samples {
            out.push_str(&sample.name);
            if !sample.label_names.is_empty() {
                out.push('{');
                for (i, (name, value)) in sample.labels().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write!(out, "{}=\"{}\"", name, escape_label_value(value))?;
                }
                out.push('}');
            }
            writeln!(out, " {}", format_value(sample.value))?;
        }
    }

    Ok(out)
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MetricRegistry;
    use crate::types::{ExporterConfig, MetricKind, Sample};

    fn sample(name: &str, labels: &[(&str, &str)], value: f64) -> Sample {
        Sample {
            name: name.to_string(),
            label_names: labels.iter().map(|(n, _)| n.to_string()).collect(),
            label_values: labels.iter().map(|(_, v)| v.to_string()).collect(),
            value,
        }
    }

    #[test]
    fn test_encode_lines() {
        let families = vec![MetricFamily {
            name: "latency".to_string(),
            help: Some("multi\nline".to_string()),
            kind: MetricKind::Summary,
            samples: vec![
                sample("latency", &[("quantile", "0.5"), ("dc", "eu")], 0.25),
                sample("latency_count", &[("dc", "eu")], 12.0),
            ],
        }];

        let text = encode_text(&families).unwrap();
        assert_eq!(
            text,
            "# HELP latency multi\\nline\n\
             # TYPE latency summary\n\
             latency{quantile=\"0.5\",dc=\"eu\"} 0.25\n\
             latency_count{dc=\"eu\"} 12\n"
        );
    }

    #[test]
    fn test_label_value_escaping() {
        assert_eq!(escape_label_value("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
    }

    #[test]
    fn test_special_values() {
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_value(1.0), "1");
        assert_eq!(format_value(-0.5), "-0.5");
    }

    #[test]
    fn test_render_reads_registry() {
        let registry = MetricRegistry::new();
        registry.counter("x").unwrap().inc();
        let exporter = RegistryExporter::new(Arc::new(registry), &ExporterConfig::default());

        let body = ExpositionEndpoint::new(Arc::new(exporter)).render().unwrap();
        assert!(body.contains("# TYPE x gauge\n"));
        assert!(body.lines().any(|line| line == "x 1"));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(CONTENT_TYPE, "text/plain; version=0.0.4");
    }
}
