use crate::config::Config;
use crate::host::HostMetrics;
use crate::probe;
use crate::series::{Metric, Sample, Trends};
use crate::store::{StoreError, TrendStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Periodic driver of the acquire → parse → append → persist pipeline.
///
/// One background task owns the tick loop; readers share the trend buffers
/// through the lock and see the state of the last completed tick. A failed
/// tick is logged and abandoned, the next one fires on schedule.
pub struct Sampler {
    trends: Arc<RwLock<Trends>>,
    store: Arc<TrendStore>,
    interval: Duration,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl Sampler {
    /// Builds the sampler and hydrates the series from any prior snapshot.
    pub fn new(cfg: &Config, store: Arc<TrendStore>) -> Self {
        let mut trends = Trends::new(cfg.history.temperature_points, cfg.history.load_points);
        for metric in Metric::ALL {
            let restored = store.load_series(metric.slot());
            if !restored.is_empty() {
                debug!(
                    metric = metric.slot(),
                    points = restored.len(),
                    "series restored from snapshot"
                );
                trends.series_mut(metric).restore(restored);
            }
        }

        Self {
            trends: Arc::new(RwLock::new(trends)),
            store,
            interval: Duration::from_secs(cfg.interval_secs),
            shutdown: None,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Stopped → Running. The first tick fires immediately, then fixed-rate.
    pub fn start(&mut self) {
        if self.task.is_some() {
            warn!("sampler already running");
            return;
        }

        let (tx, mut rx) = watch::channel(false);
        let trends = self.trends.clone();
        let store = self.store.clone();
        let interval = self.interval;

        let task = tokio::spawn(async move {
            let mut host = HostMetrics::new();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_secs = interval.as_secs(), "sampler started");

            loop {
                tokio::select! {
                    _ = rx.changed() => {
                        info!("sampler stop requested");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(err) = run_tick(&mut host, &trends, &store).await {
                            error!(error = %err, "sampling tick abandoned");
                        }
                    }
                }
            }
        });

        self.shutdown = Some(tx);
        self.task = Some(task);
    }

    /// Running → Stopped. The in-flight tick is allowed to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                error!(error = %err, "sampler task join failed");
            }
        }
    }

    pub async fn series(&self, metric: Metric) -> Vec<Sample> {
        self.trends.read().await.series(metric).to_vec()
    }

    pub async fn average(&self, metric: Metric) -> i64 {
        self.trends.read().await.series(metric).average()
    }

    pub async fn last(&self, metric: Metric) -> Option<Sample> {
        self.trends.read().await.series(metric).last().cloned()
    }
}

async fn run_tick(
    host: &mut HostMetrics,
    trends: &RwLock<Trends>,
    store: &TrendStore,
) -> Result<(), StoreError> {
    host.refresh();

    let mut readings: Vec<(Metric, f64)> = vec![(Metric::CpuLoad, host.cpu_usage_percent())];

    match host.cpu_temperature() {
        Some(celsius) => readings.push((Metric::CpuTemp, celsius)),
        None => warn!("cpu temperature reading unavailable"),
    }

    push_gpu_reading(&mut readings, Metric::GpuTemp, &host.gpu_temperature());
    push_gpu_reading(&mut readings, Metric::GpuLoad, &host.gpu_utilization());

    let (snapshots, averages) = {
        let mut guard = trends.write().await;
        for (metric, value) in &readings {
            guard.series_mut(*metric).append(Sample::now(*value));
        }
        let snapshots: Vec<(Metric, Vec<Sample>)> = Metric::ALL
            .iter()
            .map(|m| (*m, guard.series(*m).to_vec()))
            .collect();
        (snapshots, guard.averages())
    };

    // Persist outside the lock; readers only ever block on the append above.
    for (metric, samples) in &snapshots {
        store.save_series(metric.slot(), samples)?;
    }
    store.save_averages(&averages)?;

    debug!(appended = readings.len(), "tick persisted");
    Ok(())
}

/// Vendor adapters answer with raw text. A sentinel ("unavailable", "Not
/// supported", "no discrete GPU found") carries no digits, so the series
/// simply receives no sample this tick.
fn push_gpu_reading(readings: &mut Vec<(Metric, f64)>, metric: Metric, raw: &str) {
    match probe::extract_numbers(raw, 1) {
        Ok(values) => readings.push((metric, values[0])),
        Err(err) => {
            warn!(metric = metric.slot(), raw, error = %err, "gpu reading skipped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &std::path::Path) -> Config {
        let mut cfg = Config::default();
        cfg.interval_secs = 1;
        cfg.persistence.dir = dir.display().to_string();
        cfg
    }

    #[tokio::test]
    async fn hydrates_series_from_persisted_slots() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(TrendStore::open(dir.path()).unwrap());
        let persisted = vec![
            Sample::new("09:00:00", 48.0),
            Sample::new("09:00:02", 52.0),
        ];
        store.save_series(Metric::CpuTemp.slot(), &persisted).unwrap();

        let sampler = Sampler::new(&test_config(dir.path()), store);
        assert_eq!(sampler.series(Metric::CpuTemp).await, persisted);
        assert_eq!(sampler.average(Metric::CpuTemp).await, 50);
        assert_eq!(sampler.last(Metric::CpuTemp).await.unwrap().y, 52.0);
        assert!(sampler.series(Metric::GpuLoad).await.is_empty());
        assert_eq!(sampler.average(Metric::GpuLoad).await, 0);
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(TrendStore::open(dir.path()).unwrap());
        let mut sampler = Sampler::new(&test_config(dir.path()), store);

        assert!(!sampler.is_running());
        sampler.stop().await;
        assert!(!sampler.is_running());
    }

    #[tokio::test]
    async fn start_stop_lets_the_inflight_tick_finish() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(TrendStore::open(dir.path()).unwrap());
        let mut sampler = Sampler::new(&test_config(dir.path()), store);

        sampler.start();
        assert!(sampler.is_running());
        // Starting twice does not spawn a second loop.
        sampler.start();

        sampler.stop().await;
        assert!(!sampler.is_running());
    }

    #[test]
    fn sentinel_gpu_readings_are_skipped() {
        let mut readings = Vec::new();
        push_gpu_reading(&mut readings, Metric::GpuTemp, "unavailable");
        push_gpu_reading(&mut readings, Metric::GpuLoad, "Not supported");
        push_gpu_reading(&mut readings, Metric::GpuLoad, "no discrete GPU found");
        assert!(readings.is_empty());
    }

    #[test]
    fn numeric_gpu_readings_use_the_first_value() {
        let mut readings = Vec::new();
        push_gpu_reading(&mut readings, Metric::GpuTemp, "64\n");
        push_gpu_reading(&mut readings, Metric::GpuLoad, "gpu 23.00% ee 0.00%");
        assert_eq!(readings, vec![(Metric::GpuTemp, 64.0), (Metric::GpuLoad, 23.0)]);
    }
}
