//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Sampling cycle (monitor.rs):
//!     Periodic timer
//!     → windowed counts (CounterStore) + tracer summaries (TracerRegistry)
//!     → classifier.rs (Initializing / Good / Bad per metric)
//!     → hysteresis.rs (consecutive bad samples per metric)
//!     → OverallHealth published to subscribers
//!     → notification shown / hidden on transitions
//!
//! Injection cycle (monitor.rs):
//!     Periodic timer
//!     → ProbeBuilder → registry (CREATED, ADDED_TO_DEVICE_TO_NETWORK_QUEUE)
//!     → WorkQueue
//! ```
//!
//! # Design Decisions
//! - Classification is pure; all state lives in the trackers
//! - A metric alerts only after N consecutive bad samples
//! - Overall health is recomputed from scratch every cycle

pub mod classifier;
pub mod hysteresis;
pub mod monitor;
pub mod verdict;

pub use classifier::{ExceptionCategory, HealthClassifier, TracerTally};
pub use hysteresis::HysteresisTracker;
pub use monitor::{Collaborators, HealthMonitor, MetricStatus, MonitorError, MonitorSnapshot};
pub use verdict::{HealthMetric, HealthVerdict, OverallHealth};
