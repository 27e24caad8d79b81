// Alder Lake L3 monitoring area: one unit per CBo (L3 slice)

pub mod configs;
pub mod events;

pub use configs::{HitrateConfig, SnoopHitConfig, SnoopInvalidateConfig};
pub use events::CboEvent;

use pmcflow_raw::current_arch::cbo::{msr, CboConfig};
use pmcflow_raw::Register;
use std::sync::Arc;

use crate::common::msr::RegisterPort;
use crate::counters::area::MonitoringArea;
use crate::counters::config::MonitoringConfig;
use crate::counters::normalize::Normalizer;
use crate::error::{PmcError, Result};

pub const ARCHITECTURE_NAME: &str = "Alder Lake L3";

/// Read the number of enabled cache boxes from `MSR_UNC_CBO_CONFIG`
pub fn discover_cbo_count(port: &dyn RegisterPort) -> Result<usize> {
    let mut config = Register::<CboConfig>::with_address(msr::MSR_UNC_CBO_CONFIG);
    let raw = port.read(config.address)?;
    config.from_msr_value(raw);

    config.validate().map_err(|reason| {
        PmcError::Topology(format!("MSR_UNC_CBO_CONFIG = 0x{raw:X}: {reason}"))
    })?;

    tracing::info!("Discovered {} CBo units", config.layout.cbo_count);
    Ok(config.layout.cbo_count as usize)
}

/// Configurations offered for the CBo area, in selection order
pub fn catalog(_cbo_count: usize) -> Vec<Box<dyn MonitoringConfig>> {
    vec![
        Box::new(HitrateConfig),
        Box::new(SnoopInvalidateConfig),
        Box::new(SnoopHitConfig),
    ]
}

pub fn alder_lake_l3(
    port: Arc<dyn RegisterPort>,
    normalizer: Box<dyn Normalizer>,
) -> Result<MonitoringArea> {
    MonitoringArea::new(
        ARCHITECTURE_NAME,
        port,
        discover_cbo_count,
        normalizer,
        catalog,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::testing::FakePort;
    use crate::counters::normalize::Unscaled;

    fn area_with_config(raw: u64) -> Result<MonitoringArea> {
        let port = Arc::new(FakePort::new());
        port.set(msr::MSR_UNC_CBO_CONFIG, raw);
        alder_lake_l3(port, Box::new(Unscaled))
    }

    #[test]
    fn test_discovers_cbo_count() {
        let area = area_with_config(0x6).unwrap();
        assert_eq!(area.unit_count(), 6);
        assert_eq!(area.architecture_name(), "Alder Lake L3");
    }

    #[test]
    fn test_zero_cbos_is_topology_error() {
        assert!(matches!(
            area_with_config(0x0),
            Err(PmcError::Topology(_))
        ));
        assert!(matches!(
            area_with_config(0x8),
            Err(PmcError::Topology(_))
        ));
    }

    #[test]
    fn test_unreadable_capability_register() {
        let port = Arc::new(FakePort::new());
        port.fail(msr::MSR_UNC_CBO_CONFIG);
        let result = alder_lake_l3(port, Box::new(Unscaled));
        assert!(matches!(result, Err(PmcError::RegisterAccess { .. })));
    }

    #[test]
    fn test_topology_read_once() {
        let port = Arc::new(FakePort::new());
        port.set(msr::MSR_UNC_CBO_CONFIG, 0x4);
        let mut area = alder_lake_l3(port.clone(), Box::new(Unscaled)).unwrap();

        port.set(msr::MSR_UNC_CBO_CONFIG, 0x2);
        area.select(0).unwrap();
        area.update().unwrap();

        assert_eq!(area.unit_count(), 4);
        assert_eq!(area.update().unwrap().units.len(), 4);
    }

    #[test]
    fn test_catalog_order() {
        let area = area_with_config(0x4).unwrap();
        let names: Vec<&str> = area.monitoring_configs().iter().map(|c| c.name()).collect();
        assert_eq!(names, ["L3 Hitrate", "Snoop Invalidations", "Snoop Hits"]);
    }

    #[test]
    fn test_scenario_switch_without_rebuilding() {
        let port = Arc::new(FakePort::new());
        port.set(msr::MSR_UNC_CBO_CONFIG, 0x2);
        let mut area = alder_lake_l3(port.clone(), Box::new(Unscaled)).unwrap();

        area.select(0).unwrap();
        port.bump(msr::perfctr(0, 0), 1000);
        port.bump(msr::perfctr(0, 1), 900);

        let columns = area.select(2).unwrap();
        assert_eq!(columns[1], "Snoop Hitrate");
        assert_eq!(area.active_config(), Some(2));

        port.bump(msr::perfctr(0, 0), 10);
        port.bump(msr::perfctr(0, 1), 5);
        let result = area.update().unwrap();
        assert_eq!(result.units[0].metrics[0], "50.00%");
        assert_eq!(result.overall_value("Snoop Responses"), Some(10.0));
        assert_eq!(result.overall_value("L3 Lookups"), None);
    }
}
