use clap::Parser;
use hwmond::config::{Config, ConfigError};
use hwmond::host::HostMetrics;
use hwmond::sampler::Sampler;
use hwmond::series::Metric;
use hwmond::store::TrendStore;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hwmond")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "./config.yaml")]
    config: String,
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match Config::load_from_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(ConfigError::Read { ref source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            info!(path = %cli.config, "config file not found, using defaults");
            Config::default()
        }
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let store = match TrendStore::open(&cfg.persistence.dir) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            error!(error = %err, "failed to open persistence store");
            std::process::exit(1);
        }
    };

    log_host_inventory();
    info!(
        interval_secs = cfg.interval_secs,
        persistence_dir = %cfg.persistence.dir,
        keep_history_on_exit = cfg.persistence.keep_history_on_exit,
        "starting hwmond"
    );

    let prior_averages = store.load_averages();
    if !prior_averages.is_empty() {
        info!(averages = ?prior_averages, "averages snapshot restored");
    }

    let mut sampler = Sampler::new(&cfg, store.clone());
    sampler.start();

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to wait for ctrl+c");
    }
    info!("ctrl+c received, stopping sampler");
    sampler.stop().await;

    for metric in Metric::ALL {
        let last = sampler.last(metric).await.map(|s| s.y);
        let average = sampler.average(metric).await;
        let points = sampler.series(metric).await.len();
        info!(
            metric = metric.slot(),
            average,
            last = ?last,
            points,
            "session summary"
        );
    }

    if cfg.persistence.keep_history_on_exit {
        info!("history kept for the next run");
    } else {
        // Session-scoped policy: slots only survive a crash, not a clean exit.
        let slots: Vec<&str> = Metric::ALL.iter().map(|m| m.slot()).collect();
        store.purge(&slots);
        info!("session history purged");
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn log_host_inventory() {
    let host = HostMetrics::new();
    info!(
        cpu = %host.cpu_name(),
        memory_total = %host.memory_total(),
        disk_total = %host.disk_total(),
        gpu = %host.gpu_name(),
        fans_rpm = %host.fan_speeds(),
        host = %host.host_name(),
        os = %host.os_description(),
        uptime = %humantime::format_duration(host.uptime()),
        "host inventory"
    );
}
