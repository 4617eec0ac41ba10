//! Windowed event counters written by the pipeline stages.
//!
//! # Responsibilities
//! - Define the event kinds the monitor samples
//! - Define the `CounterStore` boundary consumed by the monitor
//! - Provide an in-memory store with bounded retention
//!
//! # Design Decisions
//! - One `DashMap` shard entry per event kind; writers for different kinds
//!   never contend
//! - Timestamps older than the retention horizon are pruned on write

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Raw events emitted by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// A packet was read from the device interface.
    TunRead,
    /// A packet was taken off the device-to-network queue.
    RemoveFromDeviceToNetworkQueue,
    SocketChannelReadException,
    SocketChannelWriteException,
    SocketChannelConnectException,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::TunRead,
        EventKind::RemoveFromDeviceToNetworkQueue,
        EventKind::SocketChannelReadException,
        EventKind::SocketChannelWriteException,
        EventKind::SocketChannelConnectException,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TunRead => "TUN_READ",
            EventKind::RemoveFromDeviceToNetworkQueue => "REMOVE_FROM_DEVICE_TO_NETWORK_QUEUE",
            EventKind::SocketChannelReadException => "SOCKET_CHANNEL_READ_EXCEPTION",
            EventKind::SocketChannelWriteException => "SOCKET_CHANNEL_WRITE_EXCEPTION",
            EventKind::SocketChannelConnectException => "SOCKET_CHANNEL_CONNECT_EXCEPTION",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a windowed count could not be produced.
#[derive(Debug, Error)]
pub enum CounterStoreError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
}

/// Source of windowed event counts.
pub trait CounterStore: Send + Sync {
    /// Number of `kind` events recorded at or after `since`.
    fn count(&self, kind: EventKind, since: Instant) -> Result<u64, CounterStoreError>;
}

/// In-memory counter store keeping raw timestamps for a retention horizon.
pub struct WindowedCounterStore {
    samples: DashMap<EventKind, VecDeque<Instant>>,
    retention: Duration,
}

impl WindowedCounterStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            samples: DashMap::new(),
            retention,
        }
    }

    /// Record one `kind` event now.
    pub fn increment(&self, kind: EventKind) {
        let mut entry = self.samples.entry(kind).or_default();
        // Stamped under the entry guard so appends stay in time order.
        let now = Instant::now();
        self.push(entry.value_mut(), now);
    }

    /// Record one `kind` event at `at`.
    pub fn record_at(&self, kind: EventKind, at: Instant) {
        let mut entry = self.samples.entry(kind).or_default();
        self.push(entry.value_mut(), at);
    }

    fn push(&self, timestamps: &mut VecDeque<Instant>, at: Instant) {
        timestamps.push_back(at);
        if let Some(horizon) = at.checked_sub(self.retention) {
            while timestamps.front().is_some_and(|t| *t < horizon) {
                timestamps.pop_front();
            }
        }
    }

    /// Drop every recorded sample.
    pub fn reset(&self) {
        self.samples.clear();
    }
}

impl Default for WindowedCounterStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl CounterStore for WindowedCounterStore {
    fn count(&self, kind: EventKind, since: Instant) -> Result<u64, CounterStoreError> {
        let Some(entry) = self.samples.get(&kind) else {
            return Ok(0);
        };
        // `record_at` accepts any timestamp, so the deque is not guaranteed
        // to be sorted.
        let count = entry.iter().filter(|t| **t >= since).count();
        Ok(count as u64)
    }
}
