// CPU architecture detection and monitoring area registry

use once_cell::sync::Lazy;
use std::sync::Arc;

use crate::common::cpuid::Signature;
use crate::common::msr::RegisterPort;
use crate::counters::area::MonitoringArea;
use crate::counters::cbo;
use crate::counters::normalize::Normalizer;
use crate::error::{PmcError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuArchitecture {
    AlderLake,
    RaptorLake,
    Unknown,
}

impl CpuArchitecture {
    pub fn name(&self) -> &'static str {
        match self {
            CpuArchitecture::AlderLake => "Alder Lake",
            CpuArchitecture::RaptorLake => "Raptor Lake",
            CpuArchitecture::Unknown => "Unknown",
        }
    }

    /// Map a CPUID signature to an architecture
    ///
    /// Raptor Lake keeps the Alder Lake client uncore, so both share one
    /// register layout.
    pub fn from_signature(sig: Signature) -> Self {
        if sig.family != 0x6 {
            return CpuArchitecture::Unknown;
        }

        match sig.model {
            0x97 | 0x9A | 0xBE => CpuArchitecture::AlderLake,
            0xB7 | 0xBA | 0xBF => CpuArchitecture::RaptorLake,
            _ => CpuArchitecture::Unknown,
        }
    }

    /// Build the monitoring area for this architecture
    pub fn monitoring_area(
        &self,
        port: Arc<dyn RegisterPort>,
        normalizer: Box<dyn Normalizer>,
    ) -> Result<MonitoringArea> {
        match self {
            CpuArchitecture::AlderLake | CpuArchitecture::RaptorLake => {
                cbo::alder_lake_l3(port, normalizer)
            }
            CpuArchitecture::Unknown => Err(PmcError::Config(
                "no monitoring area is available for this CPU".to_string(),
            )),
        }
    }
}

pub static CPU_ARCH: Lazy<CpuArchitecture> = Lazy::new(detect_architecture);

fn detect_architecture() -> CpuArchitecture {
    let sig = Signature::current();

    tracing::info!(
        "CPU: Family {:X}, Model {:X}, Stepping {:X}",
        sig.family,
        sig.model,
        sig.stepping
    );

    let arch = CpuArchitecture::from_signature(sig);
    if arch == CpuArchitecture::Unknown {
        tracing::warn!("Unsupported CPU model: {:X}", sig.model);
    } else {
        tracing::info!("Detected CPU architecture: {}", arch.name());
    }

    arch
}
