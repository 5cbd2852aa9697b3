//! Hardware telemetry acquisition and trend aggregation: vendor-abstracted
//! GPU probes, a sysinfo-backed host facade, bounded per-metric time series
//! with running averages, and JSON slot persistence driven by a fixed-rate
//! sampling loop.

pub mod config;
pub mod gpu;
pub mod host;
pub mod probe;
pub mod sampler;
pub mod series;
pub mod store;
