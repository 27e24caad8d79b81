// L3 cache-box monitoring configurations
//
// Every configuration programs the two counters of each CBo; counter 0
// counts a broad event and counter 1 a subset of it.

use pmcflow_raw::current_arch::cbo::{msr, UncoreGlobalControl, CACHE_LINE_SIZE};
use pmcflow_raw::{Register, RegisterLayout};

use crate::counters::area::{CounterBank, UnitCounterState};
use crate::counters::cbo::events::CboEvent;
use crate::counters::config::MonitoringConfig;
use crate::error::Result;
use crate::metrics::{
    format_large_number, format_percent, ratio, MetricRow, MonitoringUpdateResult,
};

/// Snoop configurations program and sample the boxes from core 0
const SNOOP_PIN_MASK: u64 = 0x1;

const UNIT_NAME: &str = "CBo";

/// Enable the uncore PMU and program `events` into both counter slots of
/// every box, zeroing the counters.
fn program_cbos(bank: &CounterBank, events: [CboEvent; 2]) -> Result<()> {
    let global = Register::new(
        msr::MSR_UNC_PERF_GLOBAL_CTRL,
        UncoreGlobalControl {
            enable: true,
            freeze: false,
        },
    );
    bank.port().write(global.address, global.to_msr_value())?;

    let selectors = [
        (msr::PERFEVTSEL[0], events[0].selector().to_msr_value()),
        (msr::PERFEVTSEL[1], events[1].selector().to_msr_value()),
    ];
    bank.program(&selectors, &msr::PERFCTR)
}

/// Drain every box and build rows with `metrics`, which receives the
/// normalized counters and the bandwidth unit suffix.
fn collect_rows(
    bank: &mut CounterBank,
    events: [CboEvent; 2],
    metric_count: usize,
    metrics: fn(&UnitCounterState, &str) -> Vec<String>,
) -> MonitoringUpdateResult {
    let sweep = bank.sweep(&msr::PERFCTR);
    let bandwidth_unit = if bank.per_second() { "B/s" } else { "B" };

    let units = (0..bank.unit_count())
        .map(|cbo| {
            let label = format!("{UNIT_NAME} {cbo}");
            match bank.unit(cbo) {
                Some(state) => MetricRow::new(label, metrics(state, bandwidth_unit)),
                None => MetricRow::unavailable(label, metric_count),
            }
        })
        .collect();

    let totals = bank.totals();
    let overall = if sweep.sampled_units == 0 && sweep.failed_units > 0 {
        MetricRow::unavailable("Overall", metric_count)
    } else {
        MetricRow::new("Overall", metrics(totals, bandwidth_unit))
    };

    let overall_values = events
        .iter()
        .enumerate()
        .map(|(slot, event)| (event.name().to_string(), totals.get(slot)))
        .collect();

    MonitoringUpdateResult {
        unit_name: UNIT_NAME.to_string(),
        overall,
        units,
        overall_values,
        failed_units: sweep.failed_units,
    }
}

/// counter 1 as a share of counter 0, plus the bytes it moved
fn subset_metrics(state: &UnitCounterState, bandwidth_unit: &str) -> Vec<String> {
    let (all, subset) = (state.get(0), state.get(1));
    vec![
        format_percent(ratio(subset, all)),
        format_large_number(subset * CACHE_LINE_SIZE as f64) + bandwidth_unit,
        format_large_number(all),
        format_large_number(subset),
    ]
}

/// L3 hit rate from all lookups (counter 0) and I-state lookups (counter 1)
#[derive(Debug, Default)]
pub struct HitrateConfig;

impl HitrateConfig {
    const EVENTS: [CboEvent; 2] = [CboEvent::L3Lookups, CboEvent::L3Misses];
    const COLUMNS: [&'static str; 5] = ["Item", "Hitrate", "Hit BW", "All Lookups", "I state"];

    fn metrics(state: &UnitCounterState, bandwidth_unit: &str) -> Vec<String> {
        let (lookups, misses) = (state.get(0), state.get(1));
        vec![
            format_percent(ratio(misses, lookups).map(|miss_rate| 1.0 - miss_rate)),
            format_large_number((lookups - misses) * CACHE_LINE_SIZE as f64) + bandwidth_unit,
            format_large_number(lookups),
            format_large_number(misses),
        ]
    }
}

impl MonitoringConfig for HitrateConfig {
    fn name(&self) -> &'static str {
        "L3 Hitrate"
    }

    fn help_text(&self) -> &'static str {
        "Counts every L3 lookup and the lookups that found the line in I state \
         (misses). Hitrate is 1 - misses/lookups; Hit BW assumes 64 bytes per hit."
    }

    fn columns(&self) -> &'static [&'static str] {
        &Self::COLUMNS
    }

    fn initialize(&mut self, bank: &mut CounterBank) -> Result<()> {
        program_cbos(bank, Self::EVENTS)
    }

    fn update(&mut self, bank: &mut CounterBank) -> Result<MonitoringUpdateResult> {
        Ok(collect_rows(
            bank,
            Self::EVENTS,
            Self::COLUMNS.len() - 1,
            Self::metrics,
        ))
    }
}

/// Share of snoop responses that invalidated a core's copy of the line
#[derive(Debug, Default)]
pub struct SnoopInvalidateConfig;

impl SnoopInvalidateConfig {
    const EVENTS: [CboEvent; 2] = [CboEvent::SnoopResponses, CboEvent::SnoopInvalidations];
    const COLUMNS: [&'static str; 5] = [
        "Item",
        "Invalidate Resp %",
        "Invalidate BW",
        "All Snoop Responses",
        "Core Cache Lines Invalidated",
    ];
}

impl MonitoringConfig for SnoopInvalidateConfig {
    fn name(&self) -> &'static str {
        "Snoop Invalidations"
    }

    fn help_text(&self) -> &'static str {
        "Counts snoop responses from the cores and the responses that invalidated \
         a line held in a core's private cache. Sampled from core 0."
    }

    fn columns(&self) -> &'static [&'static str] {
        &Self::COLUMNS
    }

    fn initialize(&mut self, bank: &mut CounterBank) -> Result<()> {
        let _pin = bank.pin(SNOOP_PIN_MASK)?;
        program_cbos(bank, Self::EVENTS)
    }

    fn update(&mut self, bank: &mut CounterBank) -> Result<MonitoringUpdateResult> {
        let _pin = bank.pin(SNOOP_PIN_MASK)?;
        Ok(collect_rows(
            bank,
            Self::EVENTS,
            Self::COLUMNS.len() - 1,
            subset_metrics,
        ))
    }
}

/// Share of snoop responses that hit a line (modified or not) in a core
#[derive(Debug, Default)]
pub struct SnoopHitConfig;

impl SnoopHitConfig {
    const EVENTS: [CboEvent; 2] = [CboEvent::SnoopResponses, CboEvent::SnoopHits];
    const COLUMNS: [&'static str; 5] = [
        "Item",
        "Snoop Hitrate",
        "Snoop Hit BW",
        "All Snoop Responses",
        "Snoop Hits",
    ];
}

impl MonitoringConfig for SnoopHitConfig {
    fn name(&self) -> &'static str {
        "Snoop Hits"
    }

    fn help_text(&self) -> &'static str {
        "Counts snoop responses from the cores and the responses that hit a \
         modified or clean line. Sampled from core 0."
    }

    fn columns(&self) -> &'static [&'static str] {
        &Self::COLUMNS
    }

    fn initialize(&mut self, bank: &mut CounterBank) -> Result<()> {
        let _pin = bank.pin(SNOOP_PIN_MASK)?;
        program_cbos(bank, Self::EVENTS)
    }

    fn update(&mut self, bank: &mut CounterBank) -> Result<MonitoringUpdateResult> {
        let _pin = bank.pin(SNOOP_PIN_MASK)?;
        Ok(collect_rows(
            bank,
            Self::EVENTS,
            Self::COLUMNS.len() - 1,
            subset_metrics,
        ))
    }
}
