//! Collective-reduction seam toward the distributed transport.
//!
//! The engine never implements cross-worker communication itself; it calls
//! a [`CollectiveReduce`] handle once per named state per `compute()`. The
//! call is synchronous and blocking: it returns only once every worker in
//! the group has contributed, which is the single stalling point in the
//! engine. A stalled peer surfaces as whatever failure the transport raises,
//! propagated unchanged.

use ndarray::{Array1, ArrayView1};

use crate::error::MetricError;
use crate::state::ReduceOp;

/// Blocking reduce-across-workers primitive supplied by the transport layer.
///
/// Every worker in the group must call `reduce` for the same logical
/// quantity in the same order, or the job deadlocks; the engine guarantees
/// a deterministic call order (declared-state order) but cannot detect a
/// diverging peer.
pub trait CollectiveReduce: Send + Sync {
    /// Combines `value` with every other worker's value under `op` and
    /// returns the group-wide result.
    fn reduce(&self, value: ArrayView1<'_, f64>, op: ReduceOp) -> Result<Array1<f64>, MetricError>;
}

/// Single-process reducer: returns the local value unchanged.
///
/// The default for jobs without a distributed group, and the reason
/// `compute()` is idempotent in single-process runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReduce;

impl CollectiveReduce for NoopReduce {
    fn reduce(&self, value: ArrayView1<'_, f64>, _op: ReduceOp) -> Result<Array1<f64>, MetricError> {
        Ok(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn noop_reduce_is_identity() {
        let value = array![1.0, 2.5];
        let reduced = NoopReduce.reduce(value.view(), ReduceOp::Sum).unwrap();
        assert_eq!(reduced, value);
    }
}
