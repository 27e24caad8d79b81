// Monitoring configuration: one coherent experiment on a counter bank

use crate::counters::area::CounterBank;
use crate::error::Result;
use crate::metrics::MonitoringUpdateResult;

/// Programs a set of events into the bank's counter slots and turns the
/// drained deltas into display rows.
///
/// Every row returned by `update` has exactly `columns().len()` fields.
pub trait MonitoringConfig: Send {
    fn name(&self) -> &'static str;

    fn help_text(&self) -> &'static str;

    /// Column headers; the first column holds the row label
    fn columns(&self) -> &'static [&'static str];

    /// Program event selects on every unit. Must fully overwrite whatever a
    /// previous configuration left behind.
    fn initialize(&mut self, bank: &mut CounterBank) -> Result<()>;

    /// Drain every unit and build the per-unit and aggregate rows
    fn update(&mut self, bank: &mut CounterBank) -> Result<MonitoringUpdateResult>;
}
