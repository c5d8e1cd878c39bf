//! Error types for the zen-metrics engine.

use thiserror::Error;

/// Errors raised by metric construction, updates and synchronization.
///
/// Every input-validation error is raised before any accumulator is touched,
/// so a failed `update` leaves lifetime and window state exactly as it was.
#[derive(Debug, Error)]
pub enum MetricError {
    /// A required input tensor was absent (e.g. `predictions` on update).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Input shapes disagree with each other or with the declared task count.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Construction-time configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A state name was used that was never declared on this computation.
    #[error("Unknown metric state: {0}")]
    UnknownState(&'static str),

    /// A windowed read was requested for a state declared without a window.
    #[error("Metric state is not windowed: {0}")]
    NotWindowed(&'static str),

    /// The external collective-reduce primitive failed. Not recoverable
    /// locally; propagated verbatim to the caller of `compute()`.
    #[error("Collective reduction failed: {0}")]
    Reduction(String),
}
