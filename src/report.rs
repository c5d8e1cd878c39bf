//! Metric naming and report value types.
//!
//! Reports are immutable value objects: once produced by `compute()` they
//! are never mutated and are safe to share across threads.

use std::fmt;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Distinguishes a lifetime report from a windowed report of the same metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricPrefix {
    Lifetime,
    Window,
}

impl MetricPrefix {
    /// Stable string form used in composed report keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricPrefix::Lifetime => "lifetime",
            MetricPrefix::Window => "window",
        }
    }
}

impl fmt::Display for MetricPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of concrete metric names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricName {
    Recall,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::Recall => "recall",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of metric namespaces; the stable outer naming scope a metric's
/// reports are emitted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricNamespace {
    Recall,
}

impl MetricNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricNamespace::Recall => "recall",
        }
    }
}

impl fmt::Display for MetricNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One report produced by a metric computation, before namespacing.
///
/// `value` is a vector of length `n_tasks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub name: MetricName,
    pub prefix: MetricPrefix,
    pub value: Array1<f64>,
}

/// A computation report stamped with its metric's namespace by the owning
/// [`ZenMetric`](crate::metric::ZenMetric).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespacedReport {
    pub namespace: MetricNamespace,
    pub name: MetricName,
    pub prefix: MetricPrefix,
    pub value: Array1<f64>,
}

impl NamespacedReport {
    /// Stable composed key, e.g. `recall|lifetime_recall`.
    pub fn key(&self) -> String {
        format!("{}|{}_{}", self.namespace, self.prefix, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn composed_key_is_stable() {
        let report = NamespacedReport {
            namespace: MetricNamespace::Recall,
            name: MetricName::Recall,
            prefix: MetricPrefix::Window,
            value: array![0.5],
        };
        assert_eq!(report.key(), "recall|window_recall");
    }

    #[test]
    fn reports_round_trip_through_json() {
        let report = NamespacedReport {
            namespace: MetricNamespace::Recall,
            name: MetricName::Recall,
            prefix: MetricPrefix::Lifetime,
            value: array![0.25, 1.0],
        };
        let json = serde_json::to_string(&report).unwrap();
        let back: NamespacedReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
