// Monitoring area: one domain of identical hardware units sharing a
// configuration catalog

use pmcflow_raw::RegisterAddress;
use std::sync::Arc;

use crate::common::affinity::PinGuard;
use crate::common::msr::RegisterPort;
use crate::counters::accounting::read_and_clear_all;
use crate::counters::config::MonitoringConfig;
use crate::counters::normalize::Normalizer;
use crate::error::{PmcError, Result};
use crate::metrics::MonitoringUpdateResult;

/// Normalized counter values of one unit for the latest interval
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitCounterState {
    pub counters: Vec<f64>,
}

impl UnitCounterState {
    pub fn zeroed(width: usize) -> Self {
        Self {
            counters: vec![0.0; width],
        }
    }

    /// Counter `slot`, or 0 if this state has fewer slots
    pub fn get(&self, slot: usize) -> f64 {
        self.counters.get(slot).copied().unwrap_or(0.0)
    }

    fn accumulate(&mut self, other: &UnitCounterState) {
        if self.counters.len() < other.counters.len() {
            self.counters.resize(other.counters.len(), 0.0);
        }
        for (total, value) in self.counters.iter_mut().zip(&other.counters) {
            *total += value;
        }
    }
}

/// Outcome of draining every unit once
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sweep {
    pub sampled_units: usize,
    pub failed_units: usize,
}

/// Register access, normalization and per-unit state for one area
///
/// Slot `i` of `units` belongs to hardware unit `i`. The slot count is fixed
/// at construction. A slot is `None` until the unit is first sampled and
/// again for any interval in which its counters could not be read.
pub struct CounterBank {
    port: Arc<dyn RegisterPort>,
    normalizer: Box<dyn Normalizer>,
    units: Vec<Option<UnitCounterState>>,
    totals: UnitCounterState,
}

impl CounterBank {
    pub fn new(
        port: Arc<dyn RegisterPort>,
        unit_count: usize,
        normalizer: Box<dyn Normalizer>,
    ) -> Self {
        Self {
            port,
            normalizer,
            units: vec![None; unit_count],
            totals: UnitCounterState::default(),
        }
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn port(&self) -> &dyn RegisterPort {
        self.port.as_ref()
    }

    pub fn per_second(&self) -> bool {
        self.normalizer.per_second()
    }

    pub fn normalizer_name(&self) -> &'static str {
        self.normalizer.name()
    }

    pub fn unit(&self, unit: usize) -> Option<&UnitCounterState> {
        self.units.get(unit).and_then(Option::as_ref)
    }

    pub fn units(&self) -> &[Option<UnitCounterState>] {
        &self.units
    }

    pub fn totals(&self) -> &UnitCounterState {
        &self.totals
    }

    pub fn pin(&self, mask: u64) -> Result<PinGuard> {
        self.port.pin_to(mask)
    }

    pub(crate) fn reset_normalizer(&mut self) {
        self.normalizer.reset();
    }

    /// Write `selectors[s]` to event select slot `s` of every unit and zero
    /// the matching counter, so the first sample only reflects these events.
    pub fn program(
        &self,
        selectors: &[(RegisterAddress, u64)],
        counters: &[RegisterAddress],
    ) -> Result<()> {
        for unit in 0..self.unit_count() {
            for (select, value) in selectors {
                self.port.write(select.for_unit(unit), *value)?;
            }
            for counter in counters {
                self.port.write(counter.for_unit(unit), 0)?;
            }
        }

        tracing::debug!(
            "Programmed {} event selects on {} units",
            selectors.len(),
            self.unit_count()
        );
        Ok(())
    }

    /// Drain and normalize one unit's counters
    ///
    /// The unit's time base only advances once every counter has been read.
    /// A failed drain clears the counters, so the next sample is measured
    /// from the failure instead.
    fn sample_unit(
        &mut self,
        unit: usize,
        counters: &[RegisterAddress],
    ) -> Result<UnitCounterState> {
        let addrs: Vec<u64> = counters.iter().map(|counter| counter.for_unit(unit)).collect();

        let raw = match read_and_clear_all(self.port.as_ref(), &addrs) {
            Ok(raw) => raw,
            Err(e) => {
                self.normalizer.restart(unit);
                return Err(e);
            }
        };

        let factor = self.normalizer.factor(unit);
        Ok(UnitCounterState {
            counters: raw.into_iter().map(|value| value as f64 * factor).collect(),
        })
    }

    /// Drain every unit in ascending order and rebuild the totals
    ///
    /// A unit whose counters cannot be read is left out of the totals for
    /// this interval; the remaining units are still sampled.
    pub fn sweep(&mut self, counters: &[RegisterAddress]) -> Sweep {
        self.totals = UnitCounterState::zeroed(counters.len());
        let mut sweep = Sweep::default();

        for unit in 0..self.unit_count() {
            match self.sample_unit(unit, counters) {
                Ok(state) => {
                    self.totals.accumulate(&state);
                    self.units[unit] = Some(state);
                    sweep.sampled_units += 1;
                }
                Err(e) => {
                    tracing::warn!("Unit {} unavailable this interval: {}", unit, e);
                    self.units[unit] = None;
                    sweep.failed_units += 1;
                }
            }
        }

        if sweep.failed_units > 0 {
            tracing::warn!(
                "{} of {} units failed to sample",
                sweep.failed_units,
                self.unit_count()
            );
        }

        sweep
    }
}

/// One monitoring domain: a counter bank plus the configurations that can
/// drive it, at most one of which is active.
pub struct MonitoringArea {
    architecture: String,
    thread_count: usize,
    configs: Vec<Box<dyn MonitoringConfig>>,
    bank: CounterBank,
    active: Option<usize>,
}

impl MonitoringArea {
    /// Build an area from its parts
    ///
    /// `discover` reads the unit count from hardware once; it is never
    /// re-run. `catalog` receives that count and returns the configurations
    /// in display order.
    pub fn new<D, C>(
        architecture: impl Into<String>,
        port: Arc<dyn RegisterPort>,
        discover: D,
        normalizer: Box<dyn Normalizer>,
        catalog: C,
    ) -> Result<Self>
    where
        D: FnOnce(&dyn RegisterPort) -> Result<usize>,
        C: FnOnce(usize) -> Vec<Box<dyn MonitoringConfig>>,
    {
        let architecture = architecture.into();
        let unit_count = discover(port.as_ref())?;
        let configs = catalog(unit_count);
        let thread_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        tracing::info!(
            "Initializing {} monitoring area with {} units, {} configurations",
            architecture,
            unit_count,
            configs.len()
        );

        Ok(Self {
            architecture,
            thread_count,
            configs,
            bank: CounterBank::new(port, unit_count, normalizer),
            active: None,
        })
    }

    pub fn architecture_name(&self) -> &str {
        &self.architecture
    }

    pub fn monitoring_configs(&self) -> &[Box<dyn MonitoringConfig>] {
        &self.configs
    }

    /// Logical processors in the system
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    pub fn unit_count(&self) -> usize {
        self.bank.unit_count()
    }

    pub fn bank(&self) -> &CounterBank {
        &self.bank
    }

    pub fn active_config(&self) -> Option<usize> {
        self.active
    }

    /// Make `config_id` the active configuration and program it
    ///
    /// Out-of-range ids are rejected before anything is written. Returns the
    /// configuration's column headers.
    pub fn select(&mut self, config_id: usize) -> Result<&'static [&'static str]> {
        let count = self.configs.len();
        let config = self.configs.get_mut(config_id).ok_or_else(|| {
            PmcError::ConfigurationState(format!(
                "configuration {config_id} out of range ({count} available)"
            ))
        })?;

        self.active = None;
        config.initialize(&mut self.bank)?;
        self.bank.reset_normalizer();
        self.active = Some(config_id);

        tracing::info!(
            "Selected configuration '{}' on {} ({} normalization)",
            config.name(),
            self.architecture,
            self.bank.normalizer_name()
        );

        Ok(config.columns())
    }

    /// Sample the active configuration once
    pub fn update(&mut self) -> Result<MonitoringUpdateResult> {
        let config_id = self.active.ok_or_else(|| {
            PmcError::ConfigurationState(
                "update called before a configuration was initialized".to_string(),
            )
        })?;

        let config = &mut self.configs[config_id];
        config.update(&mut self.bank)
    }
}
