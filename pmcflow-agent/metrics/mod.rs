pub mod format;
pub mod result;

pub use format::{format_large_number, format_percent, ratio};
pub use result::{MetricRow, MonitoringUpdateResult};
