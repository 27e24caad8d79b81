// Sampling loop and hand-off to presentation sinks

pub mod sampler;
pub mod snapshot;

pub use sampler::{monitoring_thread, PresentationSink, SinkSet};
pub use snapshot::{Snapshot, SnapshotSink};
