// Latest-result hand-off between the sampling loop and its readers

use serde::Serialize;
use std::fmt::Write as _;
use tokio::sync::watch;

use crate::metrics::MonitoringUpdateResult;
use crate::orchestrator::sampler::PresentationSink;

/// Column headers plus the most recent result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub columns: Vec<String>,
    /// Number of results published since the columns were set
    pub sequence: u64,
    pub result: Option<MonitoringUpdateResult>,
}

impl Snapshot {
    /// Fixed-width text table, per-unit rows first and the aggregate last
    pub fn render_table(&self) -> String {
        let Some(result) = &self.result else {
            return String::new();
        };

        let mut widths: Vec<usize> = self.columns.iter().map(String::len).collect();
        for row in result.rows() {
            for (i, field) in row.fields().enumerate() {
                match widths.get_mut(i) {
                    Some(width) => *width = (*width).max(field.len()),
                    None => widths.push(field.len()),
                }
            }
        }

        let mut out = String::new();
        let header = self.columns.iter().map(String::as_str);
        write_line(&mut out, header, &widths);
        for row in result.rows() {
            write_line(&mut out, row.fields(), &widths);
        }
        out
    }
}

fn write_line<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let mut line = String::new();
    for (field, &width) in fields.zip(widths) {
        let _ = write!(line, "{field:<width$}  ");
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Sink that keeps only the newest snapshot in a `watch` channel
///
/// The sampling loop is the only writer. Readers that fall behind skip
/// straight to the latest result.
pub struct SnapshotSink {
    tx: watch::Sender<Snapshot>,
}

impl SnapshotSink {
    pub fn new() -> (Self, watch::Receiver<Snapshot>) {
        let (tx, rx) = watch::channel(Snapshot::default());
        (Self { tx }, rx)
    }
}

impl PresentationSink for SnapshotSink {
    fn columns(&self, columns: &[&str]) {
        self.tx.send_modify(|snapshot| {
            snapshot.columns = columns.iter().map(|c| c.to_string()).collect();
            snapshot.sequence = 0;
            snapshot.result = None;
        });
    }

    fn publish(&self, result: MonitoringUpdateResult) {
        self.tx.send_modify(|snapshot| {
            snapshot.sequence += 1;
            snapshot.result = Some(result);
        });
    }
}
