//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the health
//! daemon. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::tracer::TracerStage;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Sampling and injection cadence.
    pub monitor: MonitorConfig,

    /// Tracer registry settings.
    pub tracer: TracerConfig,

    /// Classification thresholds.
    pub policy: PolicyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Simulated tunnel used by the daemon.
    pub simulation: SimulationConfig,
}

/// Health monitor cadence and debounce.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Interval between sampling cycles in milliseconds.
    pub sampling_interval_ms: u64,

    /// Trailing window each cycle aggregates over, in seconds.
    pub window_secs: u64,

    /// Interval between automatic tracer injections in milliseconds.
    pub injection_interval_ms: u64,

    /// Consecutive bad samples before a metric alerts.
    pub alert_threshold: u32,

    /// Show the bad-health notification.
    pub notifications_enabled: bool,
}

impl MonitorConfig {
    pub fn sampling_interval(&self) -> Duration {
        Duration::from_millis(self.sampling_interval_ms)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn injection_interval(&self) -> Duration {
        Duration::from_millis(self.injection_interval_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sampling_interval_ms: 1_000,
            window_secs: 10,
            injection_interval_ms: 5_000,
            alert_threshold: 5,
            notifications_enabled: true,
        }
    }
}

/// Tracer registry settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TracerConfig {
    /// Maximum number of tracers kept in memory.
    pub capacity: usize,

    /// Stage that marks a tracer as done. Unset: every valid tracer is
    /// reported as completed.
    pub completion_stage: Option<TracerStage>,

    /// Capacity of the device-to-network queue tracers are offered to.
    pub queue_capacity: usize,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            capacity: 1_000,
            completion_stage: None,
            queue_capacity: 1_024,
        }
    }
}

/// Classification thresholds.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    /// Device reads needed before throughput is judged.
    pub throughput_warmup_inputs: u64,

    /// Minimum drained/read ratio (0.0 - 1.0).
    pub throughput_min_ratio: f64,

    /// Socket exceptions per window at which a category turns bad.
    pub exception_limit: u64,

    /// Tracers needed before the success rate is judged.
    pub tracer_warmup_total: u64,

    /// Minimum tracer success ratio (0.0 - 1.0).
    pub tracer_min_success_ratio: f64,

    /// Tracers slower than this count as failures, in milliseconds.
    pub slow_tracer_cutoff_ms: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            throughput_warmup_inputs: 100,
            throughput_min_ratio: 0.70,
            exception_limit: 20,
            tracer_warmup_total: 10,
            tracer_min_success_ratio: 0.95,
            slow_tracer_cutoff_ms: 1_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9464".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // WARNING: This is a placeholder! Change this outside development.
            api_key: "CHANGE_ME".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Simulated tunnel driving the daemon's counters and tracers.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Run the simulated tunnel.
    pub enabled: bool,

    /// Device reads per second.
    pub packets_per_sec: u32,

    /// Probability that a device read is drained from the queue (0.0 - 1.0).
    pub drain_probability: f64,

    /// Probability per tick of a socket read exception.
    pub read_exception_probability: f64,

    /// Probability per tick of a socket write exception.
    pub write_exception_probability: f64,

    /// Probability per tick of a socket connect exception.
    pub connect_exception_probability: f64,

    /// Latency added per tracer hop, in milliseconds.
    pub hop_delay_ms: u64,

    /// How long raw counter samples are kept, in seconds.
    pub counter_retention_secs: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            packets_per_sec: 200,
            drain_probability: 0.99,
            read_exception_probability: 0.0,
            write_exception_probability: 0.0,
            connect_exception_probability: 0.0,
            hop_delay_ms: 5,
            counter_retention_secs: 60,
        }
    }
}
