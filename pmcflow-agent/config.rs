use std::net::SocketAddr;
use std::time::Duration;

use crate::counters::normalize::{ElapsedTime, Normalizer, Unscaled};
use crate::error::{PmcError, Result};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// Settings for one sampling session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerConfig {
    /// CPU whose `msr` device node is used for register access
    pub msr_cpu: u32,
    /// Zero-based index into the area's configuration catalog
    pub config_id: usize,
    pub interval: Duration,
    /// Report counts per interval instead of per-second rates
    pub raw_counts: bool,
    pub json: bool,
    /// Serve Prometheus metrics on this address
    pub listen: Option<SocketAddr>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            msr_cpu: 0,
            config_id: 0,
            interval: DEFAULT_INTERVAL,
            raw_counts: false,
            json: false,
            listen: None,
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(PmcError::Config(
                "sampling interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn normalizer(&self) -> Box<dyn Normalizer> {
        if self.raw_counts {
            Box::new(Unscaled)
        } else {
            Box::new(ElapsedTime::new())
        }
    }

    /// First online CPU, used when no `--msr-cpu` is given
    pub fn default_msr_cpu() -> u32 {
        detect_online_cpus().first().copied().unwrap_or(0)
    }
}

/// Detect online CPUs from /sys/devices/system/cpu/online
pub fn detect_online_cpus() -> Vec<u32> {
    std::fs::read_to_string("/sys/devices/system/cpu/online")
        .ok()
        .and_then(|s| parse_cpu_list(&s))
        .unwrap_or_else(|| {
            tracing::warn!("Failed to detect online CPUs, using default: 0");
            vec![0]
        })
}

/// Parse CPU list like "0-3,8-11" into Vec<u32>
fn parse_cpu_list(s: &str) -> Option<Vec<u32>> {
    let mut cpus = Vec::new();
    for part in s.trim().split(',') {
        if let Some((start, end)) = part.split_once('-') {
            let start: u32 = start.parse().ok()?;
            let end: u32 = end.parse().ok()?;
            cpus.extend(start..=end);
        } else {
            cpus.push(part.parse().ok()?);
        }
    }
    Some(cpus)
}
