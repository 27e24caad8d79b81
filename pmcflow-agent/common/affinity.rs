use nix::sched::{sched_getaffinity, sched_setaffinity, CpuSet};
use nix::unistd::Pid;

use crate::error::{PmcError, Result};

/// Restricts the calling thread to a set of logical processors and restores
/// the previous affinity on drop.
pub struct AffinityGuard {
    old_affinity: CpuSet,
}

impl AffinityGuard {
    /// Pin to every processor whose bit is set in `mask`
    pub fn with_mask(mask: u64) -> Result<Self> {
        if mask == 0 {
            return Err(PmcError::Pinning("Empty affinity mask".to_string()));
        }

        let old_affinity = sched_getaffinity(Pid::from_raw(0))
            .map_err(|e| PmcError::Pinning(format!("Failed to get affinity: {e}")))?;

        let mut new_affinity = CpuSet::new();
        for cpu in (0..64).filter(|bit| mask & (1u64 << bit) != 0) {
            new_affinity.set(cpu).map_err(|e| {
                PmcError::Pinning(format!("Failed to set CPU {cpu} in set: {e}"))
            })?;
        }

        sched_setaffinity(Pid::from_raw(0), &new_affinity).map_err(|e| {
            PmcError::Pinning(format!("Failed to set affinity to mask 0x{mask:X}: {e}"))
        })?;

        tracing::debug!("Pinned sampling thread to mask 0x{:X}", mask);

        Ok(Self { old_affinity })
    }
}

impl Drop for AffinityGuard {
    fn drop(&mut self) {
        let _ = sched_setaffinity(Pid::from_raw(0), &self.old_affinity);
    }
}

/// Pin held for the duration of one configuration call
///
/// Ports that have no notion of processor affinity hand out an empty guard.
/// `on_release` runs when the guard is dropped, before the affinity is
/// restored.
pub struct PinGuard {
    mask: u64,
    release: Option<Box<dyn FnOnce() + Send>>,
    _affinity: Option<AffinityGuard>,
}

impl PinGuard {
    pub fn new(mask: u64, affinity: AffinityGuard) -> Self {
        Self {
            mask,
            release: None,
            _affinity: Some(affinity),
        }
    }

    pub fn noop(mask: u64) -> Self {
        Self {
            mask,
            release: None,
            _affinity: None,
        }
    }

    pub fn on_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    pub fn mask(&self) -> u64 {
        self.mask
    }
}

impl Drop for PinGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Lowest-numbered processor in `mask`
pub fn first_cpu(mask: u64) -> Result<u32> {
    if mask == 0 {
        return Err(PmcError::Pinning("Empty affinity mask".to_string()));
    }
    Ok(mask.trailing_zeros())
}

#[cfg(test)]
pub(crate) fn allowed_cpu() -> Option<usize> {
    let current = sched_getaffinity(Pid::from_raw(0)).ok()?;
    (0..64).find(|&cpu| current.is_set(cpu).unwrap_or(false))
}
