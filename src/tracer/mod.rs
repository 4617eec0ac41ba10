//! Tracer probe subsystem.
//!
//! # Data Flow
//! ```text
//! HealthMonitor injection task / inject_probes(n)
//!     → ProbeBuilder::build (fresh id)
//!     → registry.rs: CREATED, ADDED_TO_DEVICE_TO_NETWORK_QUEUE
//!     → WorkQueue::offer (real pipeline)
//!
//! Pipeline stages:
//!     → registry.rs: REMOVED_FROM_..., WRITTEN_TO_DEVICE, ...
//!
//! HealthMonitor sampling task:
//!     → registry.summaries(window start)
//!     → Completed / Invalid / InFlight
//! ```
//!
//! # Design Decisions
//! - A tracer whose first event is not CREATED is invalid forever
//! - Memory is bounded; the least recently touched tracer is evicted

pub mod packet;
pub mod registry;
pub mod types;

pub use packet::{ProbeBuilder, TracerPacket, UuidProbeBuilder};
pub use registry::TracerRegistry;
pub use types::{TracerEvent, TracerId, TracerProbe, TracerStage, TracerSummary};
