//! Configuration file watcher for hot reload.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::AppConfig;
use crate::health::HealthMonitor;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<AppConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<AppConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread. The returned watcher
    /// must be kept alive for as long as reloads are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        match load_config(&path) {
                            Ok(new_config) => {
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Apply reloaded configs to `monitor` until the channel closes.
///
/// Only the policy, alert threshold and notification toggle are live;
/// anything else is logged as requiring a restart.
pub async fn apply_reloads(
    monitor: HealthMonitor,
    current: AppConfig,
    mut updates: mpsc::UnboundedReceiver<AppConfig>,
) {
    let mut current = current;
    while let Some(next) = updates.recv().await {
        if next == current {
            tracing::debug!("Reloaded config is unchanged");
            continue;
        }

        monitor.update_policy(next.policy.clone(), next.monitor.alert_threshold);
        if next.monitor.notifications_enabled != current.monitor.notifications_enabled {
            monitor.set_notifications_enabled(next.monitor.notifications_enabled);
        }

        let cadence_changed = next.monitor.sampling_interval_ms != current.monitor.sampling_interval_ms
            || next.monitor.window_secs != current.monitor.window_secs
            || next.monitor.injection_interval_ms != current.monitor.injection_interval_ms;
        if cadence_changed || next.tracer != current.tracer || next.admin != current.admin {
            tracing::warn!("Monitor cadence, tracer or admin settings changed; restart to apply");
        }

        current = next;
    }
}
