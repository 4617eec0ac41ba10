//! Health verdicts and the aggregate state published to subscribers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tri-state outcome of one classification, or of the whole system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthVerdict {
    /// Not enough samples to judge yet.
    Initializing,
    Good,
    Bad,
}

impl HealthVerdict {
    pub fn is_definitive(&self) -> bool {
        !matches!(self, HealthVerdict::Initializing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthVerdict::Initializing => "initializing",
            HealthVerdict::Good => "good",
            HealthVerdict::Bad => "bad",
        }
    }
}

impl fmt::Display for HealthVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signals the monitor debounces independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthMetric {
    /// Device reads drained from the device-to-network queue.
    TunReadQueueRatio,
    SocketReadExceptions,
    SocketWriteExceptions,
    SocketConnectExceptions,
    TracerSuccessRate,
}

impl HealthMetric {
    pub const ALL: [HealthMetric; 5] = [
        HealthMetric::TunReadQueueRatio,
        HealthMetric::SocketReadExceptions,
        HealthMetric::SocketWriteExceptions,
        HealthMetric::SocketConnectExceptions,
        HealthMetric::TracerSuccessRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthMetric::TunReadQueueRatio => "tun_read_queue_ratio",
            HealthMetric::SocketReadExceptions => "socket_read_exceptions",
            HealthMetric::SocketWriteExceptions => "socket_write_exceptions",
            HealthMetric::SocketConnectExceptions => "socket_connect_exceptions",
            HealthMetric::TracerSuccessRate => "tracer_success_rate",
        }
    }
}

impl fmt::Display for HealthMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate health as published after every sampling cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallHealth {
    pub state: HealthVerdict,
    /// Metrics whose trackers are currently alerting.
    pub alerting: Vec<HealthMetric>,
}

impl OverallHealth {
    pub fn initializing() -> Self {
        Self {
            state: HealthVerdict::Initializing,
            alerting: Vec::new(),
        }
    }

    pub fn is_bad(&self) -> bool {
        self.state == HealthVerdict::Bad
    }
}

impl Default for OverallHealth {
    fn default() -> Self {
        Self::initializing()
    }
}
