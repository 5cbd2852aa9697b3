use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// One observation: a wall-clock label (HH:MM:SS, insertion-ordered only)
/// and a numeric value. Serialized exactly as `{"x": ..., "y": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: String,
    pub y: f64,
}

impl Sample {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            x: label.into(),
            y: value,
        }
    }

    pub fn now(value: f64) -> Self {
        Self::new(chrono::Local::now().format("%H:%M:%S").to_string(), value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    CpuTemp,
    GpuTemp,
    CpuLoad,
    GpuLoad,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::CpuTemp,
        Metric::GpuTemp,
        Metric::CpuLoad,
        Metric::GpuLoad,
    ];

    /// Persistence slot name, also used as the metric label in logs.
    pub fn slot(self) -> &'static str {
        match self {
            Metric::CpuTemp => "cpu_temp",
            Metric::GpuTemp => "gpu_temp",
            Metric::CpuLoad => "cpu_load",
            Metric::GpuLoad => "gpu_load",
        }
    }
}

/// Fixed-capacity FIFO buffer of samples for one metric.
#[derive(Debug, Clone)]
pub struct BoundedSeries {
    capacity: usize,
    samples: VecDeque<Sample>,
}

impl BoundedSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends to the tail and evicts from the head until the capacity
    /// invariant holds again.
    pub fn append(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Integer mean of the current values, truncated toward zero.
    pub fn average(&self) -> i64 {
        if self.samples.is_empty() {
            return 0;
        }
        let sum: f64 = self.samples.iter().map(|s| s.y).sum();
        (sum / self.samples.len() as f64) as i64
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Bulk-loads a persisted sequence. Capacity is deliberately not
    /// enforced here: a slot written by a prior run may exceed the current
    /// limit, and the next `append` evicts back into compliance.
    pub fn restore(&mut self, samples: Vec<Sample>) {
        self.samples = samples.into();
    }

    pub fn to_vec(&self) -> Vec<Sample> {
        self.samples.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// The four independent series tracked per monitoring session. Owned by the
/// sampler and shared with readers by handle; series are not transactionally
/// coupled to each other.
#[derive(Debug)]
pub struct Trends {
    cpu_temp: BoundedSeries,
    gpu_temp: BoundedSeries,
    cpu_load: BoundedSeries,
    gpu_load: BoundedSeries,
}

impl Trends {
    pub fn new(temperature_points: usize, load_points: usize) -> Self {
        Self {
            cpu_temp: BoundedSeries::new(temperature_points),
            gpu_temp: BoundedSeries::new(temperature_points),
            cpu_load: BoundedSeries::new(load_points),
            gpu_load: BoundedSeries::new(load_points),
        }
    }

    pub fn series(&self, metric: Metric) -> &BoundedSeries {
        match metric {
            Metric::CpuTemp => &self.cpu_temp,
            Metric::GpuTemp => &self.gpu_temp,
            Metric::CpuLoad => &self.cpu_load,
            Metric::GpuLoad => &self.gpu_load,
        }
    }

    pub fn series_mut(&mut self, metric: Metric) -> &mut BoundedSeries {
        match metric {
            Metric::CpuTemp => &mut self.cpu_temp,
            Metric::GpuTemp => &mut self.gpu_temp,
            Metric::CpuLoad => &mut self.cpu_load,
            Metric::GpuLoad => &mut self.gpu_load,
        }
    }

    /// Integer averages for every metric, keyed by slot name.
    pub fn averages(&self) -> BTreeMap<String, i64> {
        Metric::ALL
            .iter()
            .map(|m| (m.slot().to_string(), self.series(*m).average()))
            .collect()
    }
}
