//! Pipeline boundary.
//!
//! # Data Flow
//! ```text
//! Pipeline stages (real tunnel or simulator.rs):
//!     → counters.rs (TUN_READ, queue drains, socket exceptions)
//!     → tracer registry (stage events for tracer packets)
//!
//! HealthMonitor:
//!     ← counters.rs (windowed counts)
//!     → queue.rs (tracer hand-off)
//!     → notification.rs (bad health alert)
//! ```
//!
//! # Design Decisions
//! - The monitor only sees traits; the daemon wires in-memory implementations
//! - Writers never block on readers

pub mod counters;
pub mod notification;
pub mod queue;
pub mod simulator;

pub use counters::{CounterStore, CounterStoreError, EventKind, WindowedCounterStore};
pub use notification::{LogNotifier, NotificationGateway};
pub use queue::{ChannelWorkQueue, WorkQueue};
pub use simulator::SimulatedTunnel;
