//! Bounded window buffer for recent per-batch metric contributions.
//!
//! Each named state that opts into windowing gets one of these. The buffer
//! retains whole batch contributions and evicts oldest-first once the total
//! retained sample count exceeds the configured window size, which is
//! measured in samples rather than batches.

use std::collections::VecDeque;

use ndarray::Array1;

/// One retained batch contribution.
#[derive(Debug, Clone)]
struct WindowEntry {
    contribution: Array1<f64>,
    num_samples: usize,
}

/// FIFO buffer of recent per-batch contributions, bounded by sample count.
///
/// Not thread-shared: one instance per windowed state per computation, owned
/// exclusively by its [`MetricStates`](crate::state::MetricStates) table.
#[derive(Debug, Clone)]
pub struct WindowBuffer {
    window_size: usize,
    n_tasks: usize,
    entries: VecDeque<WindowEntry>,
    retained_samples: usize,
}

impl WindowBuffer {
    /// Creates an empty buffer retaining up to `window_size` samples across
    /// per-task vectors of length `n_tasks`.
    pub fn new(window_size: usize, n_tasks: usize) -> Self {
        Self {
            window_size,
            n_tasks,
            entries: VecDeque::new(),
            retained_samples: 0,
        }
    }

    /// Appends a batch contribution and evicts oldest entries until the
    /// retained sample total fits the window again.
    ///
    /// A `num_samples` of zero is rejected as a no-op. The newest entry is
    /// never evicted even if it alone exceeds the window size, so the
    /// windowed sum may transiently exceed the nominal window target.
    pub fn append(&mut self, contribution: Array1<f64>, num_samples: usize) {
        if num_samples == 0 {
            log::trace!("window buffer: rejecting empty batch contribution");
            return;
        }
        debug_assert_eq!(contribution.len(), self.n_tasks);

        self.entries.push_back(WindowEntry {
            contribution,
            num_samples,
        });
        self.retained_samples += num_samples;

        while self.retained_samples > self.window_size && self.entries.len() > 1 {
            let evicted = self
                .entries
                .pop_front()
                .map(|e| e.num_samples)
                .unwrap_or(0);
            self.retained_samples -= evicted;
        }
    }

    /// Sum over all retained contributions; zero vector when empty.
    ///
    /// Recomputed from the retained entries on every call so the result is
    /// exactly the sum of what is currently held (no accumulated float
    /// drift from incremental subtraction).
    pub fn windowed_sum(&self) -> Array1<f64> {
        let mut sum = Array1::<f64>::zeros(self.n_tasks);
        for entry in &self.entries {
            sum += &entry.contribution;
        }
        sum
    }

    /// Number of samples currently retained.
    pub fn retained_samples(&self) -> usize {
        self.retained_samples
    }

    /// Number of batch entries currently retained.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
