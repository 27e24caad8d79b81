// Prometheus export of the named overall values of each update

use prometheus::{Gauge, GaugeVec, IntCounter, Opts, Registry};
use std::sync::Arc;

use crate::error::Result;
use crate::metrics::MonitoringUpdateResult;
use crate::orchestrator::PresentationSink;

pub struct OverallValueExporter {
    registry: Arc<Registry>,
    overall: GaugeVec,
    failed_units: Gauge,
    updates: IntCounter,
}

impl OverallValueExporter {
    pub fn new(area: &str) -> Result<Self> {
        let instance_label =
            std::env::var("INSTANCE_LABEL").unwrap_or_else(|_| "server".to_string());
        Self::with_instance(area, &instance_label)
    }

    pub fn with_instance(area: &str, instance_label: &str) -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let overall = GaugeVec::new(
            Opts::new(
                "pmcflow_overall_value",
                "Sum of one counter across all available units for the last interval",
            )
            .const_label("instance", instance_label)
            .const_label("area", area),
            &["metric"],
        )?;
        registry.register(Box::new(overall.clone()))?;

        let failed_units = Gauge::with_opts(
            Opts::new(
                "pmcflow_failed_units",
                "Units whose counters could not be read in the last interval",
            )
            .const_label("instance", instance_label)
            .const_label("area", area),
        )?;
        registry.register(Box::new(failed_units.clone()))?;

        let updates = IntCounter::with_opts(
            Opts::new("pmcflow_updates_total", "Completed sampling intervals")
                .const_label("instance", instance_label)
                .const_label("area", area),
        )?;
        registry.register(Box::new(updates.clone()))?;

        Ok(Self {
            registry,
            overall,
            failed_units,
            updates,
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }
}

impl PresentationSink for OverallValueExporter {
    fn columns(&self, _columns: &[&str]) {
        // New configuration, drop the previous one's values
        self.overall.reset();
        self.failed_units.set(0.0);
    }

    fn publish(&self, result: MonitoringUpdateResult) {
        for (name, value) in &result.overall_values {
            self.overall.with_label_values(&[name.as_str()]).set(*value);
        }
        self.failed_units.set(result.failed_units as f64);
        self.updates.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, TextEncoder};

    fn encode(exporter: &OverallValueExporter) -> String {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&exporter.registry().gather(), &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    fn result(lookups: f64) -> MonitoringUpdateResult {
        MonitoringUpdateResult {
            unit_name: "CBo".to_string(),
            overall_values: vec![
                ("L3 Lookups".to_string(), lookups),
                ("L3 Misses".to_string(), 400.0),
            ],
            failed_units: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_exports_overall_values() {
        let exporter = OverallValueExporter::with_instance("Alder Lake L3", "test").unwrap();
        exporter.columns(&["Item", "Hitrate"]);
        exporter.publish(result(4000.0));

        let text = encode(&exporter);
        assert!(text.contains(r#"metric="L3 Lookups""#));
        assert!(text.contains(r#"instance="test""#));
        assert!(text.contains("pmcflow_updates_total"));

        let value = exporter
            .overall
            .with_label_values(&["L3 Lookups"])
            .get();
        assert_eq!(value, 4000.0);
        assert_eq!(exporter.failed_units.get(), 1.0);
    }

    #[test]
    fn test_columns_reset_previous_values() {
        let exporter = OverallValueExporter::with_instance("Alder Lake L3", "test").unwrap();
        exporter.publish(result(1.0));
        exporter.columns(&["Item", "Snoop Hitrate"]);

        assert!(!encode(&exporter).contains("L3 Lookups"));
        assert_eq!(exporter.failed_units.get(), 0.0);
        assert_eq!(exporter.updates.get(), 1);
    }
}
