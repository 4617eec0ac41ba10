//! Self-monitoring for a local packet-forwarding tunnel.
//!
//! Samples pipeline counters over a trailing window, injects tracer packets
//! that walk the real pipeline stages, and debounces per-metric verdicts
//! into a single published health state.

pub mod admin;
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod tracer;

pub use config::AppConfig;
pub use health::{HealthMonitor, HealthVerdict, OverallHealth};
pub use lifecycle::Shutdown;
pub use tracer::TracerRegistry;
