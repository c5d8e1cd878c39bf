//! Streaming metric computation engine for recommendation-model training
//! and evaluation.
//!
//! This crate incrementally aggregates prediction-quality statistics over a
//! stream of mini-batches produced by many parallel worker processes. Every
//! metric maintains two views per task:
//!
//! - **Lifetime**: unbounded running accumulation since construction
//! - **Window**: bounded recent history, measured in samples
//!
//! and periodically synchronizes both across all workers through a
//! pluggable collective-reduce primitive, so every worker reports the same
//! values after each sync point.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use ndarray::array;
//! use zen_metrics::{MetricBatch, MetricConfigBuilder, NoopReduce, RecTask, ZenMetric};
//!
//! # fn main() -> Result<(), zen_metrics::MetricError> {
//! let config = MetricConfigBuilder::new()
//!     .n_tasks(1)
//!     .window_size(1000)
//!     .build()?;
//! let mut recall = ZenMetric::recall(
//!     vec![RecTask::new("click")],
//!     config,
//!     Arc::new(NoopReduce),
//! )?;
//!
//! let predictions = array![[0.6, 0.4, 0.9]];
//! let labels = array![[1.0, 1.0, 0.0]];
//! recall.update(&MetricBatch::new(predictions.view(), labels.view()))?;
//!
//! for report in recall.compute()? {
//!     println!("{} = {:?}", report.key(), report.value);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency contract
//!
//! `update` calls must arrive serially from one logical thread per process;
//! the engine provides no internal locking. `compute()` blocks at the
//! collective reduce and must be called with the same frequency and step
//! ordering by every worker in the group.

pub mod computation;
pub mod config;
pub mod error;
pub mod metric;
pub mod recall;
pub mod report;
pub mod state;
pub mod sync;
pub mod window;

pub use computation::{MetricBatch, MetricComputation};
pub use config::{MetricConfig, MetricConfigBuilder, RecTask, DEFAULT_THRESHOLD};
pub use error::MetricError;
pub use metric::ZenMetric;
pub use recall::{compute_recall, RecallComputation};
pub use report::{MetricName, MetricNamespace, MetricPrefix, MetricReport, NamespacedReport};
pub use state::{MetricStates, ReduceOp, StateDescriptor};
pub use sync::{CollectiveReduce, NoopReduce};
pub use window::WindowBuffer;
