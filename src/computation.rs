//! Core update/compute contract shared by all metric variants.
//!
//! A metric computation owns one [`MetricStates`] table, consumes batches
//! through `update` and materializes per-namespace reports through
//! `compute_reports`. Concrete variants (recall today, more later) form a
//! closed set behind this one capability trait; new variants are added by
//! implementing the trait, not by inheritance chains.

use ndarray::ArrayView2;

use crate::error::MetricError;
use crate::report::MetricReport;
use crate::state::MetricStates;

/// One mini-batch of per-task model outputs, shaped `[n_tasks, batch_size]`.
///
/// `predictions` is optional at the type level because some pipelines probe
/// metrics with label-only batches; variants that require predictions fail
/// with [`MetricError::InvalidInput`] before touching any state. `weights`
/// defaults to all-ones when absent.
#[derive(Debug, Clone, Copy)]
pub struct MetricBatch<'a> {
    pub predictions: Option<ArrayView2<'a, f64>>,
    pub labels: ArrayView2<'a, f64>,
    pub weights: Option<ArrayView2<'a, f64>>,
}

impl<'a> MetricBatch<'a> {
    /// Batch with predictions and labels, implicit all-ones weights.
    pub fn new(predictions: ArrayView2<'a, f64>, labels: ArrayView2<'a, f64>) -> Self {
        Self {
            predictions: Some(predictions),
            labels,
            weights: None,
        }
    }

    /// Attaches explicit per-sample weights.
    pub fn with_weights(mut self, weights: ArrayView2<'a, f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Number of samples in this batch (the trailing dimension).
    pub fn num_samples(&self) -> usize {
        self.labels.ncols()
    }

    /// Validates that predictions are present and that every provided tensor
    /// is `[n_tasks, batch_size]` with agreeing shapes.
    ///
    /// Runs before any state mutation so a failed update is all-or-nothing.
    pub fn validate(&self, n_tasks: usize) -> Result<ArrayView2<'a, f64>, MetricError> {
        let predictions = self.predictions.ok_or_else(|| {
            MetricError::InvalidInput(
                "'predictions' must not be None for metric update".to_string(),
            )
        })?;

        let expected = (n_tasks, predictions.ncols());
        check_shape(expected, predictions.dim())?;
        check_shape(expected, self.labels.dim())?;
        if let Some(weights) = self.weights {
            check_shape(expected, weights.dim())?;
        }
        Ok(predictions)
    }
}

fn check_shape(expected: (usize, usize), actual: (usize, usize)) -> Result<(), MetricError> {
    if expected != actual {
        return Err(MetricError::ShapeMismatch { expected, actual });
    }
    Ok(())
}

/// Capability interface implemented by every concrete metric variant.
///
/// Implementations declare their named states at construction, fold each
/// batch into those states in `update`, and derive one report per namespace
/// prefix (lifetime, window) in `compute_reports`. `update` never blocks;
/// the distributed sync lives in [`ZenMetric`](crate::metric::ZenMetric),
/// not here.
pub trait MetricComputation: Send {
    /// Stable name of the concrete metric this computation produces.
    fn name(&self) -> crate::report::MetricName;

    /// Read access to the owned state table.
    fn states(&self) -> &MetricStates;

    /// Mutable access to the owned state table (used by the sync step).
    fn states_mut(&mut self) -> &mut MetricStates;

    /// Folds one batch into the declared states.
    ///
    /// Validates inputs first and leaves all state untouched on failure.
    fn update(&mut self, batch: &MetricBatch<'_>) -> Result<(), MetricError>;

    /// Derives reports from the (possibly already-reduced) accumulators.
    fn compute_reports(&self) -> Result<Vec<MetricReport>, MetricError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn missing_predictions_is_invalid_input() {
        let labels = array![[1.0, 0.0]];
        let batch = MetricBatch {
            predictions: None,
            labels: labels.view(),
            weights: None,
        };
        assert!(matches!(
            batch.validate(1),
            Err(MetricError::InvalidInput(_))
        ));
    }

    #[test]
    fn disagreeing_shapes_are_rejected() {
        let predictions = array![[0.6, 0.4, 0.9]];
        let labels = array![[1.0, 1.0]];
        let batch = MetricBatch::new(predictions.view(), labels.view());
        assert!(matches!(
            batch.validate(1),
            Err(MetricError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn task_count_mismatch_is_rejected() {
        let predictions = array![[0.6, 0.4], [0.1, 0.2]];
        let labels = array![[1.0, 1.0], [0.0, 0.0]];
        let batch = MetricBatch::new(predictions.view(), labels.view());
        assert!(batch.validate(2).is_ok());
        assert!(matches!(
            batch.validate(3),
            Err(MetricError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn num_samples_is_the_trailing_dimension() {
        let predictions = array![[0.6, 0.4, 0.9]];
        let labels = array![[1.0, 1.0, 0.0]];
        let batch = MetricBatch::new(predictions.view(), labels.view());
        assert_eq!(batch.num_samples(), 3);
    }
}
