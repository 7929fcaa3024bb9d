//! Tick simulator for `pacer-transport`.
//!
//! Stands in for the packet source and the transmission medium so the
//! scheduler can be exercised end to end without any network I/O: a seeded
//! traffic generator feeds arrivals, a lossy medium turns transmissions
//! into delayed acks, and every tick is recorded for replay.

pub mod log;
pub mod medium;
pub mod runner;
pub mod scenario;
