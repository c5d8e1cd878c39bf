//! Cross-worker synchronization: a real blocking reduce group driven by
//! one thread per simulated worker, checking the associativity property
//! (k workers over disjoint batches agree with one worker over the
//! concatenation) and failure propagation.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use approx::assert_relative_eq;
use ndarray::{array, Array1, ArrayView1, Axis};
use zen_metrics::{
    CollectiveReduce, MetricBatch, MetricConfig, MetricError, NamespacedReport, NoopReduce,
    RecTask, ReduceOp, ZenMetric,
};

struct GroupState {
    round: usize,
    arrived: usize,
    acc: Option<Array1<f64>>,
    results: Vec<Array1<f64>>,
}

/// In-process collective group: every worker thread blocks in `reduce`
/// until all `world_size` peers have contributed, then all observe the
/// same combined value. Rounds are numbered so a fast worker can enter the
/// next reduction while a slow one is still reading the previous result.
struct ThreadGroupReduce {
    world_size: usize,
    state: Mutex<GroupState>,
    all_arrived: Condvar,
}

impl ThreadGroupReduce {
    fn new(world_size: usize) -> Self {
        Self {
            world_size,
            state: Mutex::new(GroupState {
                round: 0,
                arrived: 0,
                acc: None,
                results: Vec::new(),
            }),
            all_arrived: Condvar::new(),
        }
    }
}

impl CollectiveReduce for ThreadGroupReduce {
    fn reduce(
        &self,
        value: ArrayView1<'_, f64>,
        op: ReduceOp,
    ) -> Result<Array1<f64>, MetricError> {
        let mut group = self.state.lock().unwrap();
        let my_round = group.round;

        match group.acc.as_mut() {
            None => group.acc = Some(value.to_owned()),
            Some(acc) => {
                for (a, &v) in acc.iter_mut().zip(value.iter()) {
                    *a = match op {
                        ReduceOp::Sum => *a + v,
                        ReduceOp::Max => a.max(v),
                        ReduceOp::Min => a.min(v),
                    };
                }
            }
        }

        group.arrived += 1;
        if group.arrived == self.world_size {
            let result = group.acc.take().unwrap();
            group.results.push(result);
            group.arrived = 0;
            group.round += 1;
            self.all_arrived.notify_all();
        } else {
            while group.round == my_round {
                group = self.all_arrived.wait(group).unwrap();
            }
        }
        Ok(group.results[my_round].clone())
    }
}

/// Reducer that always fails, standing in for an unreachable peer.
struct FailingReduce;

impl CollectiveReduce for FailingReduce {
    fn reduce(
        &self,
        _value: ArrayView1<'_, f64>,
        _op: ReduceOp,
    ) -> Result<Array1<f64>, MetricError> {
        Err(MetricError::Reduction("peer unreachable".to_string()))
    }
}

fn config(n_tasks: usize) -> MetricConfig {
    MetricConfig {
        n_tasks,
        window_size: 1_000,
        threshold: 0.5,
    }
}

fn tasks(n: usize) -> Vec<RecTask> {
    (0..n).map(|i| RecTask::new(format!("task_{i}"))).collect()
}

#[test]
fn reduction_over_disjoint_workers_matches_single_worker() {
    let n_tasks = 2;
    let worker_batches = [
        (
            array![[0.9, 0.3], [0.6, 0.6]],
            array![[1.0, 1.0], [1.0, 0.0]],
        ),
        (
            array![[0.2, 0.8], [0.4, 0.9]],
            array![[1.0, 0.0], [1.0, 1.0]],
        ),
        (
            array![[0.5, 0.7], [0.1, 0.2]],
            array![[1.0, 1.0], [0.0, 1.0]],
        ),
    ];

    // One worker over the concatenation of every batch.
    let mut reference = ZenMetric::recall(tasks(n_tasks), config(n_tasks), Arc::new(NoopReduce))
        .unwrap();
    let all_predictions = ndarray::concatenate(
        Axis(1),
        &worker_batches
            .iter()
            .map(|(p, _)| p.view())
            .collect::<Vec<_>>(),
    )
    .unwrap();
    let all_labels = ndarray::concatenate(
        Axis(1),
        &worker_batches
            .iter()
            .map(|(_, l)| l.view())
            .collect::<Vec<_>>(),
    )
    .unwrap();
    reference
        .update(&MetricBatch::new(all_predictions.view(), all_labels.view()))
        .unwrap();
    let expected = reference.compute().unwrap();

    // k workers over disjoint batches, synchronized through a blocking
    // in-process group.
    let group = Arc::new(ThreadGroupReduce::new(worker_batches.len()));
    let mut handles = Vec::new();
    for (predictions, labels) in worker_batches.clone() {
        let reducer: Arc<dyn CollectiveReduce> = group.clone();
        handles.push(thread::spawn(move || -> Vec<NamespacedReport> {
            let mut metric = ZenMetric::recall(tasks(n_tasks), config(n_tasks), reducer).unwrap();
            metric
                .update(&MetricBatch::new(predictions.view(), labels.view()))
                .unwrap();
            metric.compute().unwrap()
        }));
    }

    let worker_reports: Vec<Vec<NamespacedReport>> = handles
        .into_iter()
        .map(|h| h.join().expect("worker thread panicked"))
        .collect();

    // Every worker observes identical reports after the sync.
    for reports in &worker_reports[1..] {
        assert_eq!(reports, &worker_reports[0]);
    }

    // And those reports match the single-worker concatenation.
    assert_eq!(expected.len(), worker_reports[0].len());
    for (expected_report, actual_report) in expected.iter().zip(&worker_reports[0]) {
        assert_eq!(expected_report.key(), actual_report.key());
        for (e, a) in expected_report.value.iter().zip(actual_report.value.iter()) {
            assert_relative_eq!(*e, *a, max_relative = 1e-12);
        }
    }
}

#[test]
fn thread_group_sums_across_all_workers() {
    let group = Arc::new(ThreadGroupReduce::new(2));
    let g0 = group.clone();
    let g1 = group.clone();

    let h0 = thread::spawn(move || g0.reduce(array![1.0, 2.0].view(), ReduceOp::Sum).unwrap());
    let h1 = thread::spawn(move || g1.reduce(array![10.0, 20.0].view(), ReduceOp::Sum).unwrap());

    assert_eq!(h0.join().unwrap(), array![11.0, 22.0]);
    assert_eq!(h1.join().unwrap(), array![11.0, 22.0]);
}

#[test]
fn reduction_failure_propagates_from_compute() {
    let mut metric =
        ZenMetric::recall(tasks(1), config(1), Arc::new(FailingReduce)).unwrap();
    let predictions = array![[0.9]];
    let labels = array![[1.0]];
    metric
        .update(&MetricBatch::new(predictions.view(), labels.view()))
        .unwrap();

    let err = metric.compute().unwrap_err();
    assert!(matches!(err, MetricError::Reduction(_)));
}
