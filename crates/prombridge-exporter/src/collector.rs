//! Prometheus collector adapter for the shared collector registry
//!
//! [`ExporterCollector`] lets a `prometheus::Registry` gather the same
//! families the HTTP endpoint serves. Registration goes through the
//! [`CollectorRegistry`] trait so tests can substitute their own registry.

use prometheus::core::{Collector, Desc};
use prometheus::proto;
use prometheus::{CounterVec, GaugeVec, Opts};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::ExporterResult;
use crate::exporter::RegistryExporter;
use crate::types::{MetricFamily, MetricKind, Sample};

static NEXT_COLLECTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Registry other integrations scrape from
pub trait CollectorRegistry: Send + Sync {
    /// Make the collector's metrics visible
    fn register(&self, collector: ExporterCollector) -> ExporterResult<()>;

    /// Remove a collector previously passed to `register`
    fn unregister(&self, collector: &ExporterCollector) -> ExporterResult<()>;
}

impl CollectorRegistry for prometheus::Registry {
    fn register(&self, collector: ExporterCollector) -> ExporterResult<()> {
        prometheus::Registry::register(self, Box::new(collector))?;
        Ok(())
    }

    fn unregister(&self, collector: &ExporterCollector) -> ExporterResult<()> {
        prometheus::Registry::unregister(self, Box::new(collector.clone()))?;
        Ok(())
    }
}

/// Custom Prometheus collector wrapping a [`RegistryExporter`]
///
/// Each instance carries a distinct descriptor so that several exporters can
/// be registered with one registry and unregistered individually.
#[derive(Clone)]
pub struct ExporterCollector {
    exporter: Arc<RegistryExporter>,
    desc: Arc<Desc>,
    id: u64,
}

impl ExporterCollector {
    /// Create a new collector wrapping the given exporter
    pub fn new(exporter: Arc<RegistryExporter>) -> ExporterResult<Self> {
        let id = NEXT_COLLECTOR_ID.fetch_add(1, Ordering::Relaxed);
        let desc = Desc::new(
            "prombridge_exporter".to_string(),
            "Metrics exported from the in-process registry".to_string(),
            Vec::new(),
            HashMap::from([("exporter_id".to_string(), id.to_string())]),
        )?;
        Ok(Self {
            exporter,
            desc: Arc::new(desc),
            id,
        })
    }

    /// Identifier distinguishing this adapter from others
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get reference to the underlying exporter
    pub fn exporter(&self) -> &RegistryExporter {
        &self.exporter
    }
}

impl Collector for ExporterCollector {
    fn desc(&self) -> Vec<&Desc> {
        vec![self.desc.as_ref()]
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        self.exporter
            .collect()
            .iter()
            .flat_map(to_proto_families)
            .collect()
    }
}

/// Summary families hold samples of two names (`x` and `x_count`); each name
/// becomes its own protobuf family.
fn to_proto_families(family: &MetricFamily) -> Vec<proto::MetricFamily> {
    let mut groups: Vec<(&str, Vec<&Sample>)> = Vec::new();
    for sample in &family.samples {
        match groups.iter_mut().find(|(name, _)| *name == sample.name) {
            Some((_, samples)) => samples.push(sample),
            None => groups.push((sample.name.as_str(), vec![sample])),
        }
    }

    let help = family.help.clone().unwrap_or_else(|| family.name.clone());
    groups
        .into_iter()
        .filter_map(|(name, samples)| {
            let label_names: Vec<&str> = samples[0].label_names.iter().map(String::as_str).collect();
            let opts = Opts::new(name, help.clone());
            let converted = match family.kind {
                MetricKind::Counter => counter_family(opts, &label_names, &samples),
                _ => gauge_family(opts, &label_names, &samples),
            };
            match converted {
                Ok(families) => Some(families),
                Err(e) => {
                    debug!("Skipping {} for the shared registry: {}", name, e);
                    None
                }
            }
        })
        .flatten()
        .collect()
}

fn counter_family(
    opts: Opts,
    label_names: &[&str],
    samples: &[&Sample],
) -> prometheus::Result<Vec<proto::MetricFamily>> {
    let vec = CounterVec::new(opts, label_names)?;
    for sample in samples {
        let values: Vec<&str> = sample.label_values.iter().map(String::as_str).collect();
        vec.get_metric_with_label_values(values.as_slice())?
            .inc_by(sample.value.max(0.0));
    }
    Ok(vec.collect())
}

fn gauge_family(
    opts: Opts,
    label_names: &[&str],
    samples: &[&Sample],
) -> prometheus::Result<Vec<proto::MetricFamily>> {
    let vec = GaugeVec::new(opts, label_names)?;
    for sample in samples {
        let values: Vec<&str> = sample.label_values.iter().map(String::as_str).collect();
        vec.get_metric_with_label_values(values.as_slice())?.set(sample.value);
    }
    Ok(vec.collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MetricRegistry;
    use crate::types::ExporterConfig;
    use prometheus::{Encoder, TextEncoder};

    fn collector(registry: &MetricRegistry, config: ExporterConfig) -> ExporterCollector {
        let exporter = RegistryExporter::new(Arc::new(registry.clone()), &config);
        ExporterCollector::new(Arc::new(exporter)).unwrap()
    }

    fn gather_text(registry: &prometheus::Registry) -> String {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_collector_ids_are_distinct() {
        let registry = MetricRegistry::new();
        let first = collector(&registry, ExporterConfig::default());
        let second = collector(&registry, ExporterConfig::default());
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_collector_gather_metrics() {
        let registry = MetricRegistry::new();
        registry.meter("requests").unwrap().mark_n(2);
        registry.histogram("size").unwrap().update(3);

        let families = collector(&registry, ExporterConfig::default()).collect();
        assert_eq!(families.len(), 3);

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("# TYPE requests_total counter"), "{}", text);
        assert!(text.contains("requests_total 2"), "{}", text);
        assert!(text.contains("size{quantile=\"0.5\"} 3"), "{}", text);
        assert!(text.contains("size_count 1"), "{}", text);
    }

    #[test]
    fn test_register_gather_unregister() {
        let registry = MetricRegistry::new();
        registry.counter("jobs").unwrap().inc_by(3);
        let shared = prometheus::Registry::new();
        let adapter = collector(&registry, ExporterConfig::default().with_label_declaration("dc=eu"));

        CollectorRegistry::register(&shared, adapter.clone()).unwrap();
        let text = gather_text(&shared);
        assert!(text.contains("jobs{dc=\"eu\"} 3"), "{}", text);

        CollectorRegistry::unregister(&shared, &adapter).unwrap();
        assert!(!gather_text(&shared).contains("jobs"));
        assert!(CollectorRegistry::unregister(&shared, &adapter).is_err());
    }
}
