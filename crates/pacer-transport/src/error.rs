//! Error types for the Pacer transport core.

use thiserror::Error;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// Input the scheduler refuses to interpret, e.g. a packet kind that has
    /// no entry in the processing-cost table.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
