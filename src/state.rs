//! Named-state storage for metric computations.
//!
//! Each metric variant declares a small, fixed set of named states at
//! construction. Every state owns an unbounded lifetime accumulator and,
//! optionally, a window buffer of recent batch contributions. State names
//! are resolved against a fixed table built once at declaration time rather
//! than through any runtime reflection.

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::MetricError;
use crate::window::WindowBuffer;

/// Associative and commutative operators usable for cross-worker reduction.
///
/// The operator must be order-independent so that the reduced result does
/// not depend on worker order (up to floating point rounding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReduceOp {
    Sum,
    Max,
    Min,
}

/// Declaration of one named state: retention and reduction semantics.
///
/// Serializable for diagnostics; never deserialized (state names are
/// compile-time constants declared by the metric variant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateDescriptor {
    /// Stable state name, unique within one computation.
    pub name: &'static str,
    /// Whether a window buffer tracks this state's recent contributions.
    pub windowed: bool,
    /// Operator applied when merging per-worker values.
    pub reduce_op: ReduceOp,
    /// Whether the state must survive a checkpoint round-trip. Surfaced for
    /// the external persistence collaborator; not enforced here.
    pub persistent: bool,
}

/// One registered state slot.
#[derive(Debug, Clone)]
struct StateSlot {
    descriptor: StateDescriptor,
    lifetime: Array1<f64>,
    window: Option<WindowBuffer>,
    /// Reduced windowed sum installed by the last sync; cleared on the next
    /// local mutation so local reads fall back to the buffer.
    window_snapshot: Option<Array1<f64>>,
}

/// Fixed table of named states owned by one metric computation.
#[derive(Debug, Clone)]
pub struct MetricStates {
    n_tasks: usize,
    window_size: usize,
    slots: Vec<StateSlot>,
}

impl MetricStates {
    /// Creates an empty state table for `n_tasks` tasks with windows bounded
    /// at `window_size` samples.
    pub fn new(n_tasks: usize, window_size: usize) -> Self {
        Self {
            n_tasks,
            window_size,
            slots: Vec::new(),
        }
    }

    /// Registers a named state, initialized to an all-zero vector of length
    /// `n_tasks`. Windowed states also get a window buffer.
    ///
    /// Declared once per state at construction; declaring the same name
    /// twice is a programming error and panics.
    pub fn declare(&mut self, descriptor: StateDescriptor) {
        assert!(
            self.slots.iter().all(|s| s.descriptor.name != descriptor.name),
            "state '{}' declared twice",
            descriptor.name
        );
        let window = descriptor
            .windowed
            .then(|| WindowBuffer::new(self.window_size, self.n_tasks));
        self.slots.push(StateSlot {
            descriptor,
            lifetime: Array1::zeros(self.n_tasks),
            window,
            window_snapshot: None,
        });
    }

    /// Number of tasks every state vector is indexed by.
    pub fn n_tasks(&self) -> usize {
        self.n_tasks
    }

    /// Declared state descriptors, in declaration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &StateDescriptor> {
        self.slots.iter().map(|s| &s.descriptor)
    }

    /// Names of states tagged persistent, for the external checkpointer.
    pub fn persistent_states(&self) -> Vec<&'static str> {
        self.slots
            .iter()
            .filter(|s| s.descriptor.persistent)
            .map(|s| s.descriptor.name)
            .collect()
    }

    fn slot(&self, name: &'static str) -> Result<&StateSlot, MetricError> {
        self.slots
            .iter()
            .find(|s| s.descriptor.name == name)
            .ok_or(MetricError::UnknownState(name))
    }

    fn slot_mut(&mut self, name: &'static str) -> Result<&mut StateSlot, MetricError> {
        self.slots
            .iter_mut()
            .find(|s| s.descriptor.name == name)
            .ok_or(MetricError::UnknownState(name))
    }

    /// Current lifetime accumulator for `name`.
    pub fn lifetime(&self, name: &'static str) -> Result<ArrayView1<'_, f64>, MetricError> {
        Ok(self.slot(name)?.lifetime.view())
    }

    /// Current windowed value for `name`: the reduced snapshot if a sync
    /// installed one, otherwise the local window buffer sum.
    ///
    /// Fails with [`MetricError::NotWindowed`] for states declared without
    /// a window.
    pub fn window_value(&self, name: &'static str) -> Result<Array1<f64>, MetricError> {
        let slot = self.slot(name)?;
        match (&slot.window_snapshot, &slot.window) {
            (Some(snapshot), _) => Ok(snapshot.clone()),
            (None, Some(window)) => Ok(window.windowed_sum()),
            (None, None) => Err(MetricError::NotWindowed(slot.descriptor.name)),
        }
    }

    /// Adds `delta` to the lifetime accumulator and, when the state is
    /// windowed, appends `(delta, num_samples)` to its window buffer.
    ///
    /// `delta` must have length `n_tasks`; a mismatch fails before any
    /// mutation is applied.
    pub fn add(
        &mut self,
        name: &'static str,
        delta: ArrayView1<'_, f64>,
        num_samples: usize,
    ) -> Result<(), MetricError> {
        let n_tasks = self.n_tasks;
        let slot = self.slot_mut(name)?;
        if delta.len() != n_tasks {
            return Err(MetricError::ShapeMismatch {
                expected: (n_tasks, 1),
                actual: (delta.len(), 1),
            });
        }
        slot.lifetime += &delta;
        slot.window_snapshot = None;
        if let Some(window) = slot.window.as_mut() {
            window.append(delta.to_owned(), num_samples);
        }
        Ok(())
    }

    /// Replaces the lifetime accumulator with a reduced value. Used only by
    /// the distributed sync step.
    pub fn set_lifetime(
        &mut self,
        name: &'static str,
        value: Array1<f64>,
    ) -> Result<(), MetricError> {
        let n_tasks = self.n_tasks;
        let slot = self.slot_mut(name)?;
        debug_assert_eq!(value.len(), n_tasks);
        slot.lifetime = value;
        Ok(())
    }

    /// Installs a reduced windowed-sum snapshot. Used only by the
    /// distributed sync step; cleared again by the next local `add`.
    pub fn set_window_snapshot(
        &mut self,
        name: &'static str,
        value: Array1<f64>,
    ) -> Result<(), MetricError> {
        let slot = self.slot_mut(name)?;
        slot.window_snapshot = Some(value);
        Ok(())
    }
}
