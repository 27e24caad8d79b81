use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::counters::area::MonitoringArea;
use crate::error::Result;
use crate::metrics::MonitoringUpdateResult;

/// Receives the output of a sampling loop
pub trait PresentationSink: Send + Sync {
    /// Column headers, sent once after the configuration is selected
    fn columns(&self, columns: &[&str]);

    /// One result per sampling interval
    fn publish(&self, result: MonitoringUpdateResult);
}

/// Forwards everything to several sinks
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Arc<dyn PresentationSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Arc<dyn PresentationSink>) {
        self.sinks.push(sink);
    }
}

impl PresentationSink for SinkSet {
    fn columns(&self, columns: &[&str]) {
        for sink in &self.sinks {
            sink.columns(columns);
        }
    }

    fn publish(&self, result: MonitoringUpdateResult) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.publish(result.clone());
            }
            last.publish(result);
        }
    }
}

/// Select `config_id` on `area` and sample it every `interval` until
/// `cancel` fires.
///
/// Cancellation is observed while waiting, so the loop exits without
/// another update. An update that has started always completes. A failing
/// update ends the loop with its error.
pub async fn monitoring_thread(
    area: &mut MonitoringArea,
    config_id: usize,
    sink: &dyn PresentationSink,
    cancel: &CancellationToken,
    interval: Duration,
) -> Result<()> {
    let columns = area.select(config_id)?;
    sink.columns(columns);

    tracing::info!(
        "Sampling {} every {:?}",
        area.architecture_name(),
        interval
    );

    let mut cycles: u64 = 0;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Sampling loop cancelled after {} cycles", cycles);
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        let result = match area.update() {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Update failed, stopping sampling loop: {}", e);
                return Err(e);
            }
        };

        cycles += 1;
        tracing::debug!(
            "Cycle {}: {} units, {} failed",
            cycles,
            result.units.len(),
            result.failed_units
        );
        sink.publish(result);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::testing::FakePort;
    use crate::counters::cbo;
    use crate::counters::normalize::Unscaled;
    use crate::error::PmcError;
    use parking_lot::Mutex;
    use pmcflow_raw::current_arch::cbo::msr;

    /// Records everything and cancels after `stop_after` results
    struct RecordingSink {
        columns: Mutex<Vec<String>>,
        results: Mutex<Vec<MonitoringUpdateResult>>,
        port: Arc<FakePort>,
        writes_at_stop: Mutex<Option<usize>>,
        cancel: CancellationToken,
        stop_after: usize,
    }

    impl RecordingSink {
        fn new(port: Arc<FakePort>, cancel: CancellationToken, stop_after: usize) -> Self {
            Self {
                columns: Mutex::new(Vec::new()),
                results: Mutex::new(Vec::new()),
                port,
                writes_at_stop: Mutex::new(None),
                cancel,
                stop_after,
            }
        }
    }

    impl PresentationSink for RecordingSink {
        fn columns(&self, columns: &[&str]) {
            *self.columns.lock() = columns.iter().map(|c| c.to_string()).collect();
        }

        fn publish(&self, result: MonitoringUpdateResult) {
            let mut results = self.results.lock();
            results.push(result);
            if results.len() == self.stop_after {
                *self.writes_at_stop.lock() = Some(self.port.write_count());
                self.cancel.cancel();
            }
        }
    }

    fn area(port: &Arc<FakePort>) -> MonitoringArea {
        port.set(msr::MSR_UNC_CBO_CONFIG, 0x4);
        cbo::alder_lake_l3(port.clone(), Box::new(Unscaled)).unwrap()
    }

    #[tokio::test]
    async fn test_cancel_between_iterations_stops_writes() {
        let port = Arc::new(FakePort::new());
        let mut area = area(&port);
        let cancel = CancellationToken::new();
        let sink = RecordingSink::new(port.clone(), cancel.clone(), 1);

        monitoring_thread(&mut area, 0, &sink, &cancel, Duration::from_millis(5))
            .await
            .unwrap();

        assert_eq!(sink.columns.lock()[1], "Hitrate");
        assert_eq!(sink.results.lock().len(), 1);
        assert_eq!(*sink.writes_at_stop.lock(), Some(port.write_count()));
    }

    #[tokio::test]
    async fn test_cancel_during_wait_exits_promptly() {
        let port = Arc::new(FakePort::new());
        let mut area = area(&port);
        let cancel = CancellationToken::new();
        let sink = RecordingSink::new(port.clone(), cancel.clone(), usize::MAX);

        let canceller = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        };
        let sampler = tokio::time::timeout(
            Duration::from_secs(5),
            monitoring_thread(&mut area, 1, &sink, &cancel, Duration::from_secs(60)),
        );

        let (outcome, _) = tokio::join!(sampler, canceller);

        assert!(matches!(outcome, Ok(Ok(()))));
        assert!(sink.results.lock().is_empty());
    }

    #[tokio::test]
    async fn test_counters_left_over_from_before_selection_are_dropped() {
        let port = Arc::new(FakePort::new());
        let mut area = area(&port);
        let cancel = CancellationToken::new();
        let sink = RecordingSink::new(port.clone(), cancel.clone(), 3);

        port.bump(msr::perfctr(2, 0), 50);
        monitoring_thread(&mut area, 0, &sink, &cancel, Duration::from_millis(1))
            .await
            .unwrap();

        let results = sink.results.lock();
        assert_eq!(results.len(), 3);
        for result in results.iter() {
            assert_eq!(result.units.len(), 4);
            assert_eq!(result.overall_value("L3 Lookups"), Some(0.0));
        }
    }

    #[tokio::test]
    async fn test_invalid_config_id_is_rejected() {
        let port = Arc::new(FakePort::new());
        let mut area = area(&port);
        let cancel = CancellationToken::new();
        let sink = RecordingSink::new(port.clone(), cancel.clone(), 1);

        let result =
            monitoring_thread(&mut area, 9, &sink, &cancel, Duration::from_millis(1)).await;

        assert!(matches!(result, Err(PmcError::ConfigurationState(_))));
        assert!(sink.columns.lock().is_empty());
        assert_eq!(port.write_count(), 0);
    }

    #[tokio::test]
    async fn test_pin_failure_ends_loop() {
        let port = Arc::new(FakePort::new());
        let mut area = area(&port);
        let cancel = CancellationToken::new();
        let sink = RecordingSink::new(port.clone(), cancel.clone(), usize::MAX);
        port.reject_pins();

        let result =
            monitoring_thread(&mut area, 2, &sink, &cancel, Duration::from_millis(1)).await;

        assert!(matches!(result, Err(PmcError::Pinning(_))));
    }

    #[test]
    fn test_sink_set_fans_out() {
        let port = Arc::new(FakePort::new());
        let cancel = CancellationToken::new();
        let first = Arc::new(RecordingSink::new(port.clone(), cancel.clone(), usize::MAX));
        let second = Arc::new(RecordingSink::new(port, cancel, usize::MAX));

        let mut set = SinkSet::new();
        set.push(first.clone());
        set.push(second.clone());
        set.columns(&["Item", "Hitrate"]);
        set.publish(MonitoringUpdateResult::default());

        assert_eq!(first.results.lock().len(), 1);
        assert_eq!(second.columns.lock().len(), 2);
    }
}
