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
//! Registry walk producing metric families
//!
//! Every call to [`RegistryExporter::collect`] reads the registry afresh.
//! Counters and gauges become one gauge sample, meters one `_total` counter
//! sample, histograms and timers a summary with one sample per quantile plus
//! a `_count` sample.

use std::sync::Arc;
use tracing::debug;

use crate::registry::{Metric, MetricSource, Snapshot};
use crate::sample::{SampleBuilder, QUANTILE_LABEL};
use crate::types::{ExporterConfig, MetricFamily, MetricKind, Sample};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Converts registry contents into metric families
pub struct RegistryExporter {
    source: Arc<dyn MetricSource>,
    builder: SampleBuilder,
    quantiles: Vec<(f64, String)>,
}

impl RegistryExporter {
    /// Create an exporter reading from `source`
    pub fn new(source: Arc<dyn MetricSource>, config: &ExporterConfig) -> Self {
        Self {
            source,
            builder: SampleBuilder::new(config),
            quantiles: config
                .quantiles
                .iter()
                .map(|q| (*q, q.to_string()))
                .collect(),
        }
    }

    /// Snapshot of every registered metric, in registry order
    pub fn collect(&self) -> Vec<MetricFamily> {
        self.source
            .metrics()
            .into_iter()
            .filter_map(|(name, metric)| self.family(&name, &metric))
            .collect()
    }

    fn family(&self, name: &str, metric: &Metric) -> Option<MetricFamily> {
        match metric {
            Metric::Counter(counter) => Some(self.single(
                name,
                metric,
                MetricKind::Gauge,
                self.builder.build(name, None, &[], counter.count() as f64),
            )),
            Metric::Gauge(gauge) => {
                let reading = gauge.value();
                match reading.as_f64() {
                    Some(value) => Some(self.single(
                        name,
                        metric,
                        MetricKind::Gauge,
                        self.builder.build(name, None, &[], value),
                    )),
                    None => {
                        debug!("Invalid type for gauge {}: {:?}", name, reading);
                        None
                    }
                }
            }
            Metric::Meter(meter) => Some(self.single(
                name,
                metric,
                MetricKind::Counter,
                self.builder
                    .build(name, Some("_total"), &[], meter.count() as f64),
            )),
            Metric::Histogram(histogram) => {
                Some(self.summary(name, metric, &histogram.snapshot(), histogram.count(), 1.0))
            }
            Metric::Timer(timer) => Some(self.summary(
                name,
                metric,
                &timer.snapshot(),
                timer.count(),
                NANOS_PER_SECOND,
            )),
        }
    }

    fn single(&self, name: &str, metric: &Metric, kind: MetricKind, sample: Sample) -> MetricFamily {
        MetricFamily {
            name: sample.name.clone(),
            help: Some(help(name, metric)),
            kind,
            samples: vec![sample],
        }
    }

    fn summary(
        &self,
        name: &str,
        metric: &Metric,
        snapshot: &Snapshot,
        count: u64,
        divisor: f64,
    ) -> MetricFamily {
        let mut samples: Vec<Sample> = self
            .quantiles
            .iter()
            .map(|(quantile, label)| {
                self.builder.build(
                    name,
                    None,
                    &[(QUANTILE_LABEL, label.as_str())],
                    snapshot.value(*quantile) / divisor,
                )
            })
            .collect();
        samples.push(self.builder.build(name, Some("_count"), &[], count as f64));

        MetricFamily {
            name: self.builder.build(name, None, &[], 0.0).name,
            help: Some(help(name, metric)),
            kind: MetricKind::Summary,
            samples,
        }
    }
}

fn help(name: &str, metric: &Metric) -> String {
    format!(
        "Generated from registry metric import (metric={}, type={})",
        name,
        metric.type_name()
    )
}
