//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the collaborators the monitor consumes
//! - Start the monitor, the simulated tunnel and the admin API
//! - Start the config watcher for hot reload
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The admin listener starts last (requests only when ready)

use notify::RecommendedWatcher;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::admin::{setup_admin_router, AdminState};
use crate::config::watcher::{apply_reloads, ConfigWatcher};
use crate::config::AppConfig;
use crate::health::{Collaborators, HealthMonitor, MonitorError};
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;
use crate::pipeline::{ChannelWorkQueue, LogNotifier, SimulatedTunnel, WindowedCounterStore};
use crate::tracer::{TracerPacket, TracerRegistry, UuidProbeBuilder};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Monitor(#[from] MonitorError),
    #[error("failed to bind admin API on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to watch config file: {0}")]
    Watch(#[from] notify::Error),
}

/// Running daemon components.
pub struct Daemon {
    monitor: HealthMonitor,
    counters: Arc<WindowedCounterStore>,
    shutdown: Shutdown,
    tunnel: Option<SimulatedTunnel>,
    /// Held so tracer offers queue up when no simulator drains them.
    _device_to_network: Option<mpsc::Receiver<TracerPacket>>,
    admin: Option<JoinHandle<()>>,
    admin_address: Option<SocketAddr>,
    _watcher: Option<RecommendedWatcher>,
}

impl Daemon {
    /// Build and start every subsystem. Must run inside a tokio runtime.
    pub async fn start(config: AppConfig, config_path: Option<&Path>) -> Result<Self, StartupError> {
        if config.observability.metrics_enabled {
            match config.observability.metrics_address.parse() {
                Ok(addr) => metrics::init_metrics(addr),
                Err(_) => tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                ),
            }
        }

        let counters = Arc::new(WindowedCounterStore::new(Duration::from_secs(
            config.simulation.counter_retention_secs.max(config.monitor.window_secs),
        )));
        let registry = Arc::new(TracerRegistry::with_completion_stage(
            config.tracer.capacity,
            config.tracer.completion_stage,
        ));
        let (queue, device_to_network) = ChannelWorkQueue::new(config.tracer.queue_capacity);

        let monitor = HealthMonitor::new(
            config.monitor.clone(),
            config.policy.clone(),
            Collaborators {
                counters: counters.clone(),
                registry: registry.clone(),
                probe_builder: Arc::new(UuidProbeBuilder),
                work_queue: Arc::new(queue),
                notifier: Arc::new(LogNotifier::new()),
            },
        )?;

        let shutdown = Shutdown::new();

        let (tunnel, device_to_network) = if config.simulation.enabled {
            let tunnel = SimulatedTunnel::spawn(
                config.simulation.clone(),
                counters.clone(),
                registry,
                device_to_network,
                shutdown.subscribe(),
            );
            (Some(tunnel), None)
        } else {
            tracing::info!("Simulated tunnel disabled");
            (None, Some(device_to_network))
        };

        monitor.start();

        let watcher = match config_path {
            Some(path) => {
                let (watcher, updates) = ConfigWatcher::new(path);
                let watcher = watcher.run()?;
                tokio::spawn(apply_reloads(monitor.clone(), config.clone(), updates));
                Some(watcher)
            }
            None => None,
        };

        let (admin, admin_address) = if config.admin.enabled {
            let listener = TcpListener::bind(&config.admin.bind_address)
                .await
                .map_err(|source| StartupError::Bind {
                    address: config.admin.bind_address.clone(),
                    source,
                })?;
            let address = listener.local_addr().ok();
            let router = setup_admin_router(AdminState {
                monitor: monitor.clone(),
                api_key: Arc::from(config.admin.api_key.as_str()),
                default_window_secs: config.monitor.window_secs,
            });

            let mut signal = shutdown.subscribe();
            let handle = tokio::spawn(async move {
                let server = axum::serve(listener, router)
                    .with_graceful_shutdown(async move { signal.recv().await });
                if let Err(e) = server.await {
                    tracing::error!(error = %e, "Admin API failed");
                }
            });
            tracing::info!(address = ?address, "Admin API listening");
            (Some(handle), address)
        } else {
            (None, None)
        };

        Ok(Self {
            monitor,
            counters,
            shutdown,
            tunnel,
            _device_to_network: device_to_network,
            admin,
            admin_address,
            _watcher: watcher,
        })
    }

    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    /// Counter store the pipeline writes to.
    pub fn counters(&self) -> &Arc<WindowedCounterStore> {
        &self.counters
    }

    /// Bound admin address, if the admin API is enabled.
    pub fn admin_address(&self) -> Option<SocketAddr> {
        self.admin_address
    }

    /// Stop the monitor, then every background task.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down");
        self.monitor.stop();
        self.shutdown.trigger();
        if let Some(tunnel) = self.tunnel {
            tunnel.join().await;
        }
        if let Some(admin) = self.admin {
            let _ = admin.await;
        }
    }
}
