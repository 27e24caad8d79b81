// Per-unit normalization of raw counter deltas

use std::collections::HashMap;
use std::time::Instant;

/// Scale factor applied to a unit's raw deltas before display
pub trait Normalizer: Send {
    fn name(&self) -> &'static str;

    /// Factor for `unit`'s deltas collected since its previous sample
    fn factor(&mut self, unit: usize) -> f64;

    /// Whether scaled values are per-second rates
    fn per_second(&self) -> bool {
        false
    }

    /// Counters were just zeroed; restart any interval bookkeeping
    fn reset(&mut self) {}

    /// `unit`'s counters were cleared without producing a sample
    fn restart(&mut self, _unit: usize) {}
}

/// Raw counts per sampling interval
#[derive(Debug, Clone, Copy, Default)]
pub struct Unscaled;

impl Normalizer for Unscaled {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn factor(&mut self, _unit: usize) -> f64 {
        1.0
    }
}

/// Divide by the measured time since each unit was last sampled
///
/// Compensates for loop jitter: a late sample covers a longer interval and is
/// scaled down accordingly. The first sample of a unit is measured from the
/// last reset.
#[derive(Debug, Clone)]
pub struct ElapsedTime {
    started: Instant,
    last_sample: HashMap<usize, Instant>,
}

impl ElapsedTime {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            last_sample: HashMap::new(),
        }
    }

    pub(crate) fn factor_at(&mut self, unit: usize, now: Instant) -> f64 {
        let previous = self.last_sample.insert(unit, now).unwrap_or(self.started);
        let seconds = now.saturating_duration_since(previous).as_secs_f64();
        if seconds == 0.0 {
            return 1.0;
        }
        1.0 / seconds
    }
}

impl Default for ElapsedTime {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer for ElapsedTime {
    fn name(&self) -> &'static str {
        "per-second"
    }

    fn factor(&mut self, unit: usize) -> f64 {
        self.factor_at(unit, Instant::now())
    }

    fn per_second(&self) -> bool {
        true
    }

    fn reset(&mut self) {
        self.started = Instant::now();
        self.last_sample.clear();
    }

    fn restart(&mut self, unit: usize) {
        self.last_sample.insert(unit, Instant::now());
    }
}
