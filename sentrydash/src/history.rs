//! Bounded rolling series backing the telemetry chart.

use std::collections::{BTreeMap, VecDeque};

/// Points kept per chart line.
pub const DEFAULT_SERIES_CAPACITY: usize = 30;

pub const RISK_SERIES: &str = "risk_score";
pub const PACKETS_SERIES: &str = "packets_per_sec";

pub fn push_capped<T>(dq: &mut VecDeque<T>, v: T, cap: usize) {
    dq.push_back(v);
    if dq.len() > cap {
        dq.pop_front();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Wall-clock marker shown on the x axis (`HH:MM:SS`).
    pub label: String,
    pub value: f64,
}

impl Sample {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    capacity: usize,
    samples: VecDeque<Sample>,
}

impl Series {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name: name.into(),
            capacity,
            samples: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    // Append, then drop exactly one oldest point when over capacity
    pub fn append(&mut self, sample: Sample) {
        push_capped(&mut self.samples, sample, self.capacity);
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }
}

/// All named series of a session. Series are created lazily on first append.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    default_capacity: usize,
    series: BTreeMap<String, Series>,
}

impl SeriesStore {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            default_capacity,
            series: BTreeMap::new(),
        }
    }

    pub fn append(&mut self, name: &str, sample: Sample) {
        let cap = self.default_capacity;
        self.series
            .entry(name.to_string())
            .or_insert_with(|| Series::new(name, cap))
            .append(sample);
    }

    /// Copy of the series in chronological order; empty for unknown names.
    pub fn snapshot(&self, name: &str) -> Vec<Sample> {
        self.series.get(name).map(Series::snapshot).unwrap_or_default()
    }

    pub fn latest(&self, name: &str) -> Option<&Sample> {
        self.series.get(name).and_then(Series::latest)
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series.get(name)
    }
}

impl Default for SeriesStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERIES_CAPACITY)
    }
}

/// Chart view model: shared x labels plus the two value streams.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartView {
    pub labels: Vec<String>,
    pub risk: Vec<f64>,
    pub packets: Vec<f64>,
}

impl ChartView {
    pub fn from_store(store: &SeriesStore) -> Self {
        let risk = store.snapshot(RISK_SERIES);
        let packets = store.snapshot(PACKETS_SERIES);
        Self {
            labels: risk.iter().map(|s| s.label.clone()).collect(),
            risk: risk.iter().map(|s| s.value).collect(),
            packets: packets.iter().map(|s| s.value).collect(),
        }
    }
}
