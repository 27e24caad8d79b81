pub mod accounting;
pub mod area;
pub mod cbo;
pub mod config;
pub mod normalize;

pub use accounting::{read_and_clear, read_and_clear_all};
pub use area::{CounterBank, MonitoringArea, Sweep, UnitCounterState};
pub use config::MonitoringConfig;
pub use normalize::{ElapsedTime, Normalizer, Unscaled};
