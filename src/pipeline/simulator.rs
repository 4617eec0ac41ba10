//! Simulated tunnel.
//!
//! Stands in for the real device/network relay in the daemon so the monitor
//! has live counters and tracers to judge. Device reads, queue drains and
//! socket exceptions are drawn at random from the configured probabilities;
//! tracers pulled off the device-to-network queue walk the remaining stages
//! with a fixed per-hop delay.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::SimulationConfig;
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::pipeline::counters::{EventKind, WindowedCounterStore};
use crate::tracer::{TracerPacket, TracerRegistry, TracerStage};

const TICK: Duration = Duration::from_millis(10);

/// Handles of the simulated tunnel tasks.
pub struct SimulatedTunnel {
    traffic: JoinHandle<()>,
    relay: JoinHandle<()>,
}

impl SimulatedTunnel {
    /// Spawn the traffic generator and the tracer relay.
    pub fn spawn(
        config: SimulationConfig,
        counters: Arc<WindowedCounterStore>,
        registry: Arc<TracerRegistry>,
        device_to_network: mpsc::Receiver<TracerPacket>,
        shutdown: ShutdownSignal,
    ) -> Self {
        tracing::info!(
            packets_per_sec = config.packets_per_sec,
            drain_probability = config.drain_probability,
            "Simulated tunnel starting"
        );

        let traffic = tokio::spawn(generate_traffic(config.clone(), counters, shutdown.clone()));
        let relay = tokio::spawn(relay_tracers(config, registry, device_to_network, shutdown));
        Self { traffic, relay }
    }

    /// Wait for both tasks to exit.
    pub async fn join(self) {
        let _ = self.traffic.await;
        let _ = self.relay.await;
    }
}

fn roll(probability: f64) -> bool {
    probability > 0.0 && fastrand::f64() < probability
}

async fn generate_traffic(
    config: SimulationConfig,
    counters: Arc<WindowedCounterStore>,
    mut shutdown: ShutdownSignal,
) {
    let mut ticker = time::interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ticks_per_sec = (Duration::from_secs(1).as_millis() / TICK.as_millis()) as f64;
    let reads_per_tick = config.packets_per_sec as f64 / ticks_per_sec;
    let mut owed = 0.0;

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = ticker.tick() => {
                owed += reads_per_tick;
                while owed >= 1.0 {
                    owed -= 1.0;
                    counters.increment(EventKind::TunRead);
                    if roll(config.drain_probability) {
                        counters.increment(EventKind::RemoveFromDeviceToNetworkQueue);
                    }
                }
                if roll(config.read_exception_probability) {
                    counters.increment(EventKind::SocketChannelReadException);
                }
                if roll(config.write_exception_probability) {
                    counters.increment(EventKind::SocketChannelWriteException);
                }
                if roll(config.connect_exception_probability) {
                    counters.increment(EventKind::SocketChannelConnectException);
                }
            }
        }
    }
    tracing::debug!("Simulated traffic stopped");
}

async fn relay_tracers(
    config: SimulationConfig,
    registry: Arc<TracerRegistry>,
    mut device_to_network: mpsc::Receiver<TracerPacket>,
    mut shutdown: ShutdownSignal,
) {
    let hop = Duration::from_millis(config.hop_delay_ms);
    loop {
        let packet = tokio::select! {
            _ = shutdown.recv() => break,
            packet = device_to_network.recv() => match packet {
                Some(packet) => packet,
                None => break,
            },
        };

        let Some(id) = TracerPacket::parse_tracer_id(&packet.payload) else {
            tracing::warn!("Packet on tracer queue without a tracer marker, dropping");
            continue;
        };
        registry.record_now(&id, TracerStage::RemovedFromDeviceToNetworkQueue);

        let registry = registry.clone();
        tokio::spawn(async move {
            for stage in [
                TracerStage::AddedToNetworkToDeviceQueue,
                TracerStage::RemovedFromNetworkToDeviceQueue,
                TracerStage::WrittenToDevice,
            ] {
                time::sleep(hop).await;
                registry.record_now(&id, stage);
            }
            tracing::trace!(tracer = %id, "Tracer relayed back to device");
        });
    }
    tracing::debug!("Tracer relay stopped");
}
