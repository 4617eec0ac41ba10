//! Cancellable periodic tasks with conflated scheduling.
//!
//! # Design Decisions
//! - The cycle runs inline in the task loop, so two cycles never overlap
//! - Ticks missed while a cycle is running are skipped, not queued
//! - A cycle that errors or panics is logged and the next tick proceeds

use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::lifecycle::shutdown::ShutdownSignal;
use crate::observability::metrics;

/// Spawn `cycle` on `runtime`, running it immediately and then every
/// `period` until `shutdown` fires or the task is aborted.
pub fn spawn_periodic<F, E>(
    runtime: &Handle,
    name: &'static str,
    period: Duration,
    mut shutdown: ShutdownSignal,
    mut cycle: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Result<(), E> + Send + 'static,
    E: Display,
{
    runtime.spawn(async move {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::debug!(task = name, period_ms = period.as_millis() as u64, "Periodic task started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::debug!(task = name, "Periodic task received shutdown signal, exiting loop");
                    break;
                }
                _ = ticker.tick() => {
                    match panic::catch_unwind(AssertUnwindSafe(&mut cycle)) {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            tracing::warn!(task = name, error = %e, "Periodic cycle failed");
                            metrics::record_cycle_fault(name);
                        }
                        Err(_) => {
                            tracing::error!(task = name, "Periodic cycle panicked, waiting for next tick");
                            metrics::record_cycle_fault(name);
                        }
                    }
                }
            }
        }
    })
}
