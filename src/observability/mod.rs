//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Monitor, registry and periodic tasks produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields, never pre-formatted messages
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
