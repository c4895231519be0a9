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
//! In-process metric registry read by the exporter
//!
//! Metrics are addressed by dotted hierarchical names and kept in insertion
//! order. Writers update them through shared handles while scrapes read them
//! concurrently; the exporter never mutates anything here.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::error::{ExporterError, ExporterResult};

/// Number of most recent values a histogram keeps for quantiles
pub const RESERVOIR_SIZE: usize = 1028;

/// Read API the exporter consumes
pub trait MetricSource: Send + Sync {
    /// Registered metrics in insertion order
    fn metrics(&self) -> Vec<(String, Metric)>;
}

/// Handle to one registered metric
#[derive(Clone)]
pub enum Metric {
    /// Incrementing and decrementing count
    Counter(Arc<Counter>),
    /// Value read on demand
    Gauge(Arc<Gauge>),
    /// Distribution of values
    Histogram(Arc<Histogram>),
    /// Count of events
    Meter(Arc<Meter>),
    /// Distribution of durations
    Timer(Arc<Timer>),
}

impl Metric {
    /// Type name used in errors and help text
    pub fn type_name(&self) -> &'static str {
        match self {
            Metric::Counter(_) => "counter",
            Metric::Gauge(_) => "gauge",
            Metric::Histogram(_) => "histogram",
            Metric::Meter(_) => "meter",
            Metric::Timer(_) => "timer",
        }
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Count that can go up and down
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicI64,
}

impl Counter {
    /// Add one
    pub fn inc(&self) {
        self.inc_by(1);
    }

    /// Add `n`
    pub fn inc_by(&self, n: i64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    /// Subtract one
    pub fn dec(&self) {
        self.inc_by(-1);
    }

    /// Subtract `n`
    pub fn dec_by(&self, n: i64) {
        self.inc_by(-n);
    }

    /// Current count
    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Count of events since registration
#[derive(Debug, Default)]
pub struct Meter {
    count: AtomicU64,
}

impl Meter {
    /// Record one event
    pub fn mark(&self) {
        self.mark_n(1);
    }

    /// Record `n` events
    pub fn mark_n(&self, n: u64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    /// Events recorded so far
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Reading of a gauge
#[derive(Debug, Clone, PartialEq)]
pub enum GaugeValue {
    /// Floating point reading
    Float(f64),
    /// Integral reading
    Int(i64),
    /// Flag, exported as 1 or 0
    Bool(bool),
    /// Anything else; exported only if it parses as a number
    Text(String),
}

impl GaugeValue {
    /// Numeric form, `None` when the reading has none
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GaugeValue::Float(value) => Some(*value),
            GaugeValue::Int(value) => Some(*value as f64),
            GaugeValue::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
            GaugeValue::Text(text) => text.trim().parse().ok(),
        }
    }
}

type GaugeFn = dyn Fn() -> GaugeValue + Send + Sync;

/// Value computed by a closure at read time
pub struct Gauge {
    read: Box<GaugeFn>,
}

impl Gauge {
    /// Wrap a reading closure
    pub fn new(read: impl Fn() -> GaugeValue + Send + Sync + 'static) -> Self {
        Self {
            read: Box::new(read),
        }
    }

    /// Current reading
    pub fn value(&self) -> GaugeValue {
        (self.read)()
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge").finish_non_exhaustive()
    }
}

/// Distribution over a sliding window of the most recent values
#[derive(Debug)]
pub struct Histogram {
    count: AtomicU64,
    window: Mutex<VecDeque<i64>>,
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            count: AtomicU64::new(0),
            window: Mutex::new(VecDeque::with_capacity(RESERVOIR_SIZE)),
        }
    }
}

impl Histogram {
    /// Record a value
    pub fn update(&self, value: i64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        if window.len() == RESERVOIR_SIZE {
            window.pop_front();
        }
        window.push_back(value);
    }

    /// Values recorded since registration, including evicted ones
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Sorted copy of the current window
    pub fn snapshot(&self) -> Snapshot {
        let window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        Snapshot::new(window.iter().copied().collect())
    }
}

/// Histogram of durations, recorded in nanoseconds
#[derive(Debug, Default)]
pub struct Timer {
    histogram: Histogram,
}

impl Timer {
    /// Record a duration
    pub fn update(&self, duration: Duration) {
        let nanos = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        self.histogram.update(nanos);
    }

    /// Run `f` and record how long it took
    pub fn time<R>(&self, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let result = f();
        self.update(start.elapsed());
        result
    }

    /// Durations recorded since registration
    pub fn count(&self) -> u64 {
        self.histogram.count()
    }

    /// Sorted nanosecond values of the current window
    pub fn snapshot(&self) -> Snapshot {
        self.histogram.snapshot()
    }
}

/// Sorted values of a histogram window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    values: Vec<i64>,
}

impl Snapshot {
    /// Build from unsorted values
    pub fn new(mut values: Vec<i64>) -> Self {
        values.sort_unstable();
        Self { values }
    }

    /// Number of values in the window
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Interpolated value at `quantile`; 0 for an empty window, NaN outside 0..=1
    pub fn value(&self, quantile: f64) -> f64 {
        if !(0.0..=1.0).contains(&quantile) {
            return f64::NAN;
        }
        let (Some(first), Some(last)) = (self.values.first(), self.values.last()) else {
            return 0.0;
        };

        let n = self.values.len();
        let pos = quantile * (n + 1) as f64;
        let index = pos as usize;

        if index < 1 {
            return *first as f64;
        }
        if index >= n {
            return *last as f64;
        }

        let lower = self.values[index - 1] as f64;
        let upper = self.values[index] as f64;
        lower + (pos - pos.floor()) * (upper - lower)
    }
}

#[derive(Default)]
struct RegistryInner {
    order: Vec<String>,
    metrics: HashMap<String, Metric>,
}

/// Central registry of named metrics
///
/// Thread-safe registry that can be cloned and shared across threads. Lookups
/// are get-or-create: asking for an existing name returns the same handle.
#[derive(Clone, Default)]
pub struct MetricRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl MetricRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Join name parts with `.`, skipping empty ones
    pub fn name(parts: &[&str]) -> String {
        parts
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Get or create the counter `name`
    pub fn counter(&self, name: &str) -> ExporterResult<Arc<Counter>> {
        self.get_or_insert(
            name,
            || Metric::Counter(Arc::default()),
            |metric| match metric {
                Metric::Counter(counter) => Some(Arc::clone(counter)),
                _ => None,
            },
        )
    }

    /// Get or create the meter `name`
    pub fn meter(&self, name: &str) -> ExporterResult<Arc<Meter>> {
        self.get_or_insert(
            name,
            || Metric::Meter(Arc::default()),
            |metric| match metric {
                Metric::Meter(meter) => Some(Arc::clone(meter)),
                _ => None,
            },
        )
    }

    /// Get or create the histogram `name`
    pub fn histogram(&self, name: &str) -> ExporterResult<Arc<Histogram>> {
        self.get_or_insert(
            name,
            || Metric::Histogram(Arc::default()),
            |metric| match metric {
                Metric::Histogram(histogram) => Some(Arc::clone(histogram)),
                _ => None,
            },
        )
    }

    /// Get or create the timer `name`
    pub fn timer(&self, name: &str) -> ExporterResult<Arc<Timer>> {
        self.get_or_insert(
            name,
            || Metric::Timer(Arc::default()),
            |metric| match metric {
                Metric::Timer(timer) => Some(Arc::clone(timer)),
                _ => None,
            },
        )
    }

    /// Register a gauge reading from `read`; an existing gauge is returned unchanged
    pub fn gauge(
        &self,
        name: &str,
        read: impl Fn() -> GaugeValue + Send + Sync + 'static,
    ) -> ExporterResult<Arc<Gauge>> {
        self.get_or_insert(
            name,
            || Metric::Gauge(Arc::new(Gauge::new(read))),
            |metric| match metric {
                Metric::Gauge(gauge) => Some(Arc::clone(gauge)),
                _ => None,
            },
        )
    }

    /// Remove `name`; returns whether it was registered
    pub fn remove(&self, name: &str) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.metrics.remove(name).is_none() {
            return false;
        }
        inner.order.retain(|registered| registered != name);
        true
    }

    /// Registered names in insertion order
    pub fn names(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.order.clone()
    }

    /// Number of registered metrics
    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.order.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_or_insert<T>(
        &self,
        name: &str,
        create: impl FnOnce() -> Metric,
        extract: impl Fn(&Metric) -> Option<T>,
    ) -> ExporterResult<T> {
        let mismatch = |existing: &Metric| ExporterError::KindMismatch {
            name: name.to_string(),
            existing: existing.type_name(),
        };

        {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = inner.metrics.get(name) {
                return extract(existing).ok_or_else(|| mismatch(existing));
            }
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Another writer may have registered the name between the two locks.
        if let Some(existing) = inner.metrics.get(name) {
            return extract(existing).ok_or_else(|| mismatch(existing));
        }

        let metric = create();
        let handle = extract(&metric).ok_or_else(|| mismatch(&metric))?;
        inner.order.push(name.to_string());
        inner.metrics.insert(name.to_string(), metric);
        Ok(handle)
    }
}

impl MetricSource for MetricRegistry {
    fn metrics(&self) -> Vec<(String, Metric)> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .order
            .iter()
            .filter_map(|name| {
                inner
                    .metrics
                    .get(name)
                    .map(|metric| (name.clone(), metric.clone()))
            })
            .collect()
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("names", &self.names())
            .finish()
    }
}
