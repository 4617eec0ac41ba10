//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build collaborators → Start monitor → Start admin API
//!
//! Periodic tasks (periodic.rs):
//!     interval tick → cycle (inline, conflated) → next tick
//!     shutdown signal / abort → exit
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → trigger → monitor.stop() → tasks exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then collaborators, then tasks
//! - Stopping the monitor never waits for an in-flight cycle

pub mod periodic;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
