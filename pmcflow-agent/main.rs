use anyhow::{Context, Result};
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use clap::Parser;
use prometheus::{Encoder, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use pmcflow::{
    monitoring_thread, DevMsrPort, MonitoringArea, OverallValueExporter, SamplerConfig, SinkSet,
    Snapshot, SnapshotSink, CPU_ARCH,
};

#[derive(Parser, Debug)]
#[command(name = "pmcflow")]
#[command(about = "Live L3 cache counter sampling for Intel client CPUs")]
struct Args {
    #[arg(short, long, default_value_t = 0, help = "Configuration to run (see --list)")]
    config: usize,

    #[arg(long, default_value_t = 1000, help = "Delay between samples in milliseconds")]
    interval_ms: u64,

    #[arg(long, help = "CPU whose MSR device is used (default: first online CPU)")]
    msr_cpu: Option<u32>,

    #[arg(long, help = "Report counts per interval instead of per-second rates")]
    raw_counts: bool,

    #[arg(long, help = "List the available configurations and exit")]
    list: bool,

    #[arg(long, help = "Print one JSON object per sample instead of a table")]
    json: bool,

    #[arg(long, help = "Serve Prometheus metrics on this address, e.g. 0.0.0.0:8080")]
    listen: Option<SocketAddr>,

    #[arg(
        short,
        long,
        help = "Enable verbose logging (shows all MSR read/write operations)"
    )]
    verbose: bool,
}

impl Args {
    fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            msr_cpu: self.msr_cpu.unwrap_or_else(SamplerConfig::default_msr_cpu),
            config_id: self.config,
            interval: Duration::from_millis(self.interval_ms),
            raw_counts: self.raw_counts,
            json: self.json,
            listen: self.listen,
        }
    }
}

async fn metrics_handler(State(registry): State<Arc<Registry>>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }

    let content_type = encoder.format_type().to_string();
    (
        [("Content-Type", content_type)],
        String::from_utf8(buffer).unwrap_or_default(),
    )
}

fn check_permissions(cpu: u32) -> Result<()> {
    let msr_path = format!("/dev/cpu/{cpu}/msr");
    if std::fs::metadata(&msr_path).is_err() {
        anyhow::bail!(
            "Cannot access {msr_path}. The MSR kernel module may not be loaded, run: sudo modprobe msr"
        );
    }

    if let Err(e) = std::fs::File::open(&msr_path) {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            anyhow::bail!("Permission denied accessing {msr_path}, run as root");
        }
    }

    Ok(())
}

fn print_catalog(area: &MonitoringArea) {
    println!(
        "{} ({} units, {} logical processors)",
        area.architecture_name(),
        area.unit_count(),
        area.thread_count()
    );
    for (id, config) in area.monitoring_configs().iter().enumerate() {
        println!("  [{id}] {}", config.name());
        println!("      {}", config.help_text());
    }
}

/// Print every new snapshot until cancelled or the sampler goes away
async fn print_snapshots(
    mut rx: watch::Receiver<Snapshot>,
    title: String,
    json: bool,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let snapshot = rx.borrow_and_update().clone();
        let Some(result) = &snapshot.result else {
            continue;
        };

        if json {
            match serde_json::to_string(result) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!("Failed to serialize sample: {}", e),
            }
        } else {
            println!("\n{title} #{}", snapshot.sequence);
            print!("{}", snapshot.render_table());
        }
    }
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::warn!("Shutdown triggered by Ctrl+C");
        },
        _ = terminate => {
            tracing::warn!("Shutdown triggered by SIGTERM");
        },
        _ = cancel_token.cancelled() => return,
    }

    cancel_token.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = args.sampler_config();
    config.validate()?;

    check_permissions(config.msr_cpu)?;

    let arch = *CPU_ARCH;
    tracing::info!("Detected CPU architecture: {}", arch.name());

    let port = Arc::new(
        DevMsrPort::new(config.msr_cpu)
            .with_context(|| format!("opening MSR device of CPU {}", config.msr_cpu))?,
    );
    let mut area = arch
        .monitoring_area(port, config.normalizer())
        .context("building monitoring area")?;

    if args.list {
        print_catalog(&area);
        return Ok(());
    }

    let config_name = area
        .monitoring_configs()
        .get(config.config_id)
        .map(|c| c.name())
        .with_context(|| {
            format!(
                "configuration {} does not exist, {} available (see --list)",
                config.config_id,
                area.monitoring_configs().len()
            )
        })?;
    let title = format!("{} - {}", area.architecture_name(), config_name);

    let cancel = CancellationToken::new();
    let mut sinks = SinkSet::new();

    let (snapshots, rx) = SnapshotSink::new();
    sinks.push(Arc::new(snapshots));

    let registry = match config.listen {
        Some(_) => {
            let exporter = OverallValueExporter::new(area.architecture_name())?;
            let registry = exporter.registry();
            sinks.push(Arc::new(exporter));
            Some(registry)
        }
        None => None,
    };

    let sampler = {
        let cancel = cancel.clone();
        let config = config.clone();
        tokio::spawn(async move {
            let result = monitoring_thread(
                &mut area,
                config.config_id,
                &sinks,
                &cancel,
                config.interval,
            )
            .await;
            cancel.cancel();
            result
        })
    };

    let printer = tokio::spawn(print_snapshots(rx, title, config.json, cancel.clone()));

    match (config.listen, registry) {
        (Some(addr), Some(registry)) => {
            let app = Router::new()
                .route("/metrics", get(metrics_handler))
                .with_state(registry);

            tracing::warn!("Starting HTTP server on {}", addr);
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("binding {addr}"))?;

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal(cancel.clone()))
                .await?;
        }
        _ => shutdown_signal(cancel.clone()).await,
    }

    let sampled = sampler.await.context("sampling task panicked")?;
    let _ = printer.await;

    sampled.context("sampling stopped")?;
    tracing::info!("All tasks completed, exiting");

    Ok(())
}
