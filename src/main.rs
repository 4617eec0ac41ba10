//! Tunnel health daemon.
//!
//! Runs the self-monitoring layer against a simulated tunnel and exposes the
//! admin API used by `health-cli`.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────── tunnel-healthd ─────────────────────────┐
//!   │                                                                 │
//!   │  simulated tunnel ──writes──▶ counter store ◀──reads──┐         │
//!   │        │                                              │         │
//!   │        └──stage events──▶ tracer registry ◀──reads────┤         │
//!   │                               ▲                       │         │
//!   │                               │ CREATED / ADDED       │         │
//!   │  device-to-network queue ◀────┴── injection task   sampling     │
//!   │                                   (every 5s)        task (1s)   │
//!   │                                                       │         │
//!   │                     classifier → hysteresis → OverallHealth     │
//!   │                                                 │               │
//!   │                              subscribers ◀──────┼──▶ notifier   │
//!   │                                                 │               │
//!   │  admin API (axum) ◀─────────────────────────────┘               │
//!   └─────────────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use tunnel_health::config::{loader::load_config, AppConfig};
use tunnel_health::lifecycle::signals::wait_for_termination;
use tunnel_health::lifecycle::startup::Daemon;
use tunnel_health::observability::logging;

#[derive(Parser)]
#[command(name = "tunnel-healthd")]
#[command(about = "Self-monitoring daemon for the packet tunnel", long_about = None)]
struct Args {
    /// Path to a TOML config file; watched for changes.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init(&config.observability);

    tracing::info!("tunnel-healthd v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        sampling_interval_ms = config.monitor.sampling_interval_ms,
        window_secs = config.monitor.window_secs,
        alert_threshold = config.monitor.alert_threshold,
        simulation = config.simulation.enabled,
        "Configuration loaded"
    );

    let daemon = Daemon::start(config, args.config.as_deref()).await?;

    let mut health = daemon.monitor().subscribe();
    tokio::spawn(async move {
        while health.changed().await.is_ok() {
            let current = health.borrow_and_update().clone();
            tracing::debug!(state = %current.state, alerting = ?current.alerting, "Health published");
        }
    });

    wait_for_termination().await;
    daemon.shutdown().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
