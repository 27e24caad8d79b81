// Macros (must be first for visibility)
#[macro_use]
pub mod macros;

pub mod common;
pub mod config;
pub mod counters;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod prom;

pub use common::{CpuArchitecture, DevMsrPort, RegisterPort, CPU_ARCH};
pub use config::SamplerConfig;
pub use counters::{MonitoringArea, MonitoringConfig, Normalizer};
pub use error::{PmcError, Result};
pub use metrics::{MetricRow, MonitoringUpdateResult};
pub use orchestrator::{monitoring_thread, PresentationSink, SinkSet, Snapshot, SnapshotSink};
pub use prom::OverallValueExporter;
