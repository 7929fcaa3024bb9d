//! # pacer-transport
//!
//! Tick-driven packet transmission scheduler.
//!
//! Once per logical tick the scheduler accepts arrivals (data packets and
//! acks), transmits at most one packet chosen by urgency, and requeues any
//! transmission whose ack did not arrive within its tolerance.
//!
//! ## Crate structure
//!
//! - [`queue`] — Array-backed binary max-heap
//! - [`packet`] — Packet model and processing-cost table
//! - [`scheduler`] — Tick state machine and in-flight tracking
//! - [`stats`] — Scheduler counters
//! - [`config`] — TOML configuration
//! - [`error`] — Error types

pub mod config;
pub mod error;
pub mod packet;
pub mod queue;
pub mod scheduler;
pub mod stats;

pub use error::SchedulerError;
pub use packet::{Packet, PacketId, PacketKind, Tick};
pub use scheduler::{Scheduler, TickOutcome};
