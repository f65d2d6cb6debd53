//! Entry point for `logrelay`: loads configuration, builds the configured
//! sources and destinations, and drives the scheduler until every source
//! reaches EOF or the process is asked to shut down.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use destination::{DatadogStatsdDestination, PooledSyslogDestination, StdoutDestination, SyslogDestinationConfig};
use pool::ConnectionPool;
use reader::{Reader, StdinReader};
use scheduler::{FlushThresholds, Scheduler, Source, Target};
use syslog::LocalDialer;
use tracing_subscriber::EnvFilter;

/// Per-host log-routing daemon.
#[derive(Parser, Debug)]
#[command(name = "logrelay", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "config.yaml")]
    config: String,

    /// Overrides `RUST_LOG`/the default `info` filter.
    #[arg(long)]
    log_level: Option<String>,

    /// Overrides the configured hostname.
    #[arg(long)]
    hostname: Option<String>,

    /// Restricts active sources to this list of names (repeatable).
    /// Defaults to every source in the config file.
    #[arg(long = "src")]
    sources: Vec<String>,

    /// Restricts active destinations to this list of names (repeatable).
    /// Defaults to every destination in the config file.
    #[arg(long = "dst")]
    destinations: Vec<String>,

    /// Overrides `stream_limits.max_bytes`.
    #[arg(long)]
    max_batch_bytes: Option<usize>,

    /// Overrides `stream_limits.max_count`.
    #[arg(long)]
    max_batch_size: Option<usize>,

    /// Overrides `stream_limits.max_time_secs`.
    #[arg(long)]
    flush_timeout: Option<i64>,

    /// Overrides `cache_timeout_secs`.
    #[arg(long)]
    cache_timeout: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = cli
        .log_level
        .clone()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = config::Config::load(&cli.config).with_context(|| format!("loading configuration from {}", cli.config))?;

    if let Some(hostname) = cli.hostname {
        config.hostname = hostname;
    }
    if let Some(max_bytes) = cli.max_batch_bytes {
        config.stream_limits.max_bytes = max_bytes;
    }
    if let Some(max_count) = cli.max_batch_size {
        config.stream_limits.max_count = max_count;
    }
    if let Some(max_time_secs) = cli.flush_timeout {
        config.stream_limits.max_time_secs = max_time_secs;
    }
    if let Some(cache_timeout_secs) = cli.cache_timeout {
        config.cache_timeout_secs = cache_timeout_secs;
    }

    if !cli.sources.is_empty() {
        config.check_sources(&cli.config, &cli.sources)?;
    }
    if !cli.destinations.is_empty() {
        config.check_destinations(&cli.config, &cli.destinations)?;
    }

    let active_sources: Vec<String> = if cli.sources.is_empty() { config.sources.keys().cloned().collect() } else { cli.sources };
    let active_destinations: Vec<String> =
        if cli.destinations.is_empty() { config.destinations.keys().cloned().collect() } else { cli.destinations };

    let sources = build_sources(&active_sources).await?;
    let targets = build_targets(&config, &active_destinations).await?;

    let thresholds = FlushThresholds {
        max_count: config.stream_limits.max_count,
        max_bytes: config.stream_limits.max_bytes,
        max_time: chrono::Duration::seconds(config.stream_limits.max_time_secs),
    };
    let cache_timeout = chrono::Duration::seconds(config.cache_timeout_secs);
    let flush_tick = std::time::Duration::from_secs((config.stream_limits.max_time_secs.max(2) / 2) as u64);

    let scheduler = Scheduler::new(thresholds, cache_timeout, flush_tick, targets).context("constructing scheduler")?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(wait_for_shutdown(shutdown_tx));

    tracing::info!(sources = ?active_sources, destinations = ?active_destinations, "logrelay starting");
    scheduler.run(sources, shutdown_rx).await;
    tracing::info!("logrelay stopped");

    Ok(())
}

async fn wait_for_shutdown(shutdown_tx: tokio::sync::watch::Sender<bool>) {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
}

async fn build_sources(names: &[String]) -> Result<Vec<Source>> {
    let mut sources = Vec::with_capacity(names.len());
    for name in names {
        let reader: Box<dyn Reader> = match name.as_str() {
            "stdin" => Box::new(StdinReader::new()),
            #[cfg(target_os = "linux")]
            "journal" => Box::new(reader::JournalReader::open().context("opening journal reader")?),
            other => anyhow::bail!("unsupported source {other:?}"),
        };
        sources.push(Source { name: name.clone(), reader });
    }
    Ok(sources)
}

async fn build_targets(config: &config::Config, names: &[String]) -> Result<Vec<Target>> {
    let mut targets = Vec::with_capacity(names.len());
    for name in names {
        let settings = config.destinations.get(name).cloned().unwrap_or(serde_yaml::Value::Null);
        let destination = build_destination(name, &settings).await.with_context(|| format!("building destination {name:?}"))?;
        targets.push(Target { name: name.clone(), destination });
    }
    Ok(targets)
}

async fn build_destination(name: &str, settings: &serde_yaml::Value) -> Result<Arc<dyn destination::Destination>> {
    match name {
        "stdout" => Ok(Arc::new(StdoutDestination)),
        "syslog" | "loggly" | "logdna" => {
            let template = string_field(settings, "template");
            let time_format = string_field(settings, "time_format");
            let config = SyslogDestinationConfig { template, time_format };

            let destination = match string_field(settings, "address") {
                Some(address) => {
                    let pool = ConnectionPool::new(4, syslog::RemoteDialer { address }).await.context("dialing remote syslog endpoint")?;
                    PooledSyslogDestination::new(Arc::new(pool), config)
                }
                None => {
                    let pool = ConnectionPool::new(4, LocalDialer).await.context("dialing local syslog socket")?;
                    PooledSyslogDestination::new(Arc::new(pool), config)
                }
            };
            Ok(Arc::new(destination))
        }
        "datadog" => {
            let address = string_field(settings, "address").unwrap_or_default();
            Ok(Arc::new(DatadogStatsdDestination::new(address)))
        }
        "cloudwatchlogs" | "kinesis" => {
            anyhow::bail!("destination {name:?} requires a BatchShipper wired in by an embedding application; it is not configurable from YAML alone")
        }
        other => anyhow::bail!("unknown destination {other:?}"),
    }
}

fn string_field(value: &serde_yaml::Value, key: &str) -> Option<String> {
    value.as_mapping()?.get(&serde_yaml::Value::String(key.to_string()))?.as_str().map(str::to_string)
}
