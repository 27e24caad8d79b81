// Rows handed to the presentation layer after every update

use serde::Serialize;

use crate::metrics::format::NOT_AVAILABLE;

/// One display row: a label followed by formatted metric values
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricRow {
    pub label: String,
    pub metrics: Vec<String>,
    /// False when the unit's counters could not be read this interval
    pub available: bool,
}

impl MetricRow {
    pub fn new(label: impl Into<String>, metrics: Vec<String>) -> Self {
        Self {
            label: label.into(),
            metrics,
            available: true,
        }
    }

    /// Placeholder row for a unit whose counters could not be read
    pub fn unavailable(label: impl Into<String>, metric_count: usize) -> Self {
        Self {
            label: label.into(),
            metrics: vec![NOT_AVAILABLE.to_string(); metric_count],
            available: false,
        }
    }

    /// Number of string fields, label included
    pub fn width(&self) -> usize {
        1 + self.metrics.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.label.as_str()).chain(self.metrics.iter().map(String::as_str))
    }
}

/// Result of one `update` call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonitoringUpdateResult {
    /// Kind of unit the per-unit rows describe (e.g. "CBo")
    pub unit_name: String,
    /// Totals across every available unit
    pub overall: MetricRow,
    /// Per-unit rows in ascending unit order
    pub units: Vec<MetricRow>,
    /// Raw named totals for reuse by other displays
    pub overall_values: Vec<(String, f64)>,
    /// Units whose counters could not be read this interval
    pub failed_units: usize,
}

impl MonitoringUpdateResult {
    /// Per-unit rows followed by the aggregate row
    pub fn rows(&self) -> impl Iterator<Item = &MetricRow> {
        self.units.iter().chain(std::iter::once(&self.overall))
    }

    pub fn overall_value(&self, name: &str) -> Option<f64> {
        self.overall_values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value)
    }
}
