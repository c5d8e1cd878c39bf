//! Multi-task metric wrapper and cross-worker synchronization.
//!
//! [`ZenMetric`] owns one metric computation per task group, fans batches
//! out to them by slicing task rows, and drives the collective reduction
//! that makes every worker's LIFETIME and WINDOW reports agree.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use ndarray::s;

use crate::computation::{MetricBatch, MetricComputation};
use crate::config::{MetricConfig, RecTask};
use crate::error::MetricError;
use crate::recall::RecallComputation;
use crate::report::{MetricNamespace, NamespacedReport};
use crate::state::StateDescriptor;
use crate::sync::CollectiveReduce;

struct TaskGroup {
    tasks: Vec<RecTask>,
    rows: Range<usize>,
    computation: Box<dyn MetricComputation>,
}

/// A metric over a fixed set of tasks, sharded into one or more
/// computations and synchronized across workers on `compute()`.
pub struct ZenMetric {
    namespace: MetricNamespace,
    n_tasks: usize,
    groups: Vec<TaskGroup>,
    reducer: Arc<dyn CollectiveReduce>,
}

impl fmt::Debug for ZenMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZenMetric")
            .field("namespace", &self.namespace)
            .field("n_tasks", &self.n_tasks)
            .field("task_names", &self.task_names())
            .finish_non_exhaustive()
    }
}

impl ZenMetric {
    /// Creates a recall metric with a single computation spanning all tasks.
    pub fn recall(
        tasks: Vec<RecTask>,
        config: MetricConfig,
        reducer: Arc<dyn CollectiveReduce>,
    ) -> Result<Self, MetricError> {
        Self::recall_sharded(vec![tasks], config, reducer)
    }

    /// Creates a recall metric sharded by task group: each group gets its
    /// own computation over a contiguous range of task rows, in order.
    ///
    /// `config.n_tasks` must equal the total task count across groups.
    pub fn recall_sharded(
        task_groups: Vec<Vec<RecTask>>,
        config: MetricConfig,
        reducer: Arc<dyn CollectiveReduce>,
    ) -> Result<Self, MetricError> {
        config.validate()?;
        let total: usize = task_groups.iter().map(|g| g.len()).sum();
        if total != config.n_tasks {
            return Err(MetricError::InvalidConfiguration(format!(
                "task groups cover {} tasks but n_tasks is {}",
                total, config.n_tasks
            )));
        }
        if task_groups.iter().any(|g| g.is_empty()) {
            return Err(MetricError::InvalidConfiguration(
                "empty task group".to_string(),
            ));
        }

        let mut groups = Vec::with_capacity(task_groups.len());
        let mut offset = 0;
        for tasks in task_groups {
            let rows = offset..offset + tasks.len();
            offset = rows.end;
            let computation = Box::new(RecallComputation::new(
                tasks.len(),
                config.window_size,
                config.threshold,
            ));
            groups.push(TaskGroup {
                tasks,
                rows,
                computation,
            });
        }

        Ok(Self {
            namespace: MetricNamespace::Recall,
            n_tasks: config.n_tasks,
            groups,
            reducer,
        })
    }

    /// The namespace this metric's reports are emitted under.
    pub fn namespace(&self) -> MetricNamespace {
        self.namespace
    }

    /// Task names in row order across all groups.
    pub fn task_names(&self) -> Vec<&str> {
        self.groups
            .iter()
            .flat_map(|g| g.tasks.iter().map(|t| t.name.as_str()))
            .collect()
    }

    /// Folds one batch (shaped `[n_tasks, batch_size]` over all tasks) into
    /// the owning computations. Never blocks.
    ///
    /// The whole batch is validated before any group is touched, so a
    /// failed update mutates no state in any group.
    pub fn update(&mut self, batch: &MetricBatch<'_>) -> Result<(), MetricError> {
        let predictions = batch.validate(self.n_tasks)?;
        for group in &mut self.groups {
            let rows = group.rows.clone();
            // Views are Copy, so slice_move keeps the batch's data lifetime
            // instead of borrowing from the locals here.
            let sliced = MetricBatch {
                predictions: Some(predictions.slice_move(s![rows.clone(), ..])),
                labels: batch.labels.slice_move(s![rows.clone(), ..]),
                weights: batch.weights.map(|w| w.slice_move(s![rows, ..])),
            };
            group.computation.update(&sliced)?;
        }
        Ok(())
    }

    /// Synchronizes all state across the worker group and emits reports.
    ///
    /// Blocks exactly once per declared state at the collective reduce.
    /// Every worker must call this the same number of times in the same
    /// relative order or the group deadlocks; the engine reduces states in
    /// declared order per group to keep its side of that contract. After
    /// this call the local lifetime accumulators hold the reduced values,
    /// so every worker observes identical LIFETIME and WINDOW reports.
    pub fn compute(&mut self) -> Result<Vec<NamespacedReport>, MetricError> {
        let mut reports = Vec::new();
        for group in &mut self.groups {
            let descriptors: Vec<StateDescriptor> = group
                .computation
                .states()
                .descriptors()
                .copied()
                .collect();

            for descriptor in &descriptors {
                let lifetime = group
                    .computation
                    .states()
                    .lifetime(descriptor.name)?
                    .to_owned();
                let reduced = self.reducer.reduce(lifetime.view(), descriptor.reduce_op)?;
                group
                    .computation
                    .states_mut()
                    .set_lifetime(descriptor.name, reduced)?;

                if descriptor.windowed {
                    let window = group.computation.states().window_value(descriptor.name)?;
                    let reduced = self.reducer.reduce(window.view(), descriptor.reduce_op)?;
                    group
                        .computation
                        .states_mut()
                        .set_window_snapshot(descriptor.name, reduced)?;
                }
            }

            log::debug!(
                "{} metric synchronized {} states for tasks {:?}",
                self.namespace,
                descriptors.len(),
                group.rows
            );

            for report in group.computation.compute_reports()? {
                reports.push(NamespacedReport {
                    namespace: self.namespace,
                    name: report.name,
                    prefix: report.prefix,
                    value: report.value,
                });
            }
        }
        Ok(reports)
    }
}
