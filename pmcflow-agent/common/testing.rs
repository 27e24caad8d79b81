// In-memory register port for unit tests

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

use crate::common::affinity::PinGuard;
use crate::common::msr::RegisterPort;
use crate::error::{PmcError, Result};

#[derive(Default)]
struct FakeState {
    registers: HashMap<u64, u64>,
    failing: HashSet<u64>,
    failing_writes: HashSet<u64>,
    fail_next_read: HashSet<u64>,
    writes: usize,
    pins: Vec<u64>,
    reject_pins: bool,
}

#[derive(Default)]
pub struct FakePort {
    state: Mutex<FakeState>,
}

impl FakePort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a register without recording a write
    pub fn set(&self, addr: u64, value: u64) {
        self.state.lock().registers.insert(addr, value);
    }

    /// Simulate hardware counting `delta` events
    pub fn bump(&self, addr: u64, delta: u64) {
        *self.state.lock().registers.entry(addr).or_insert(0) += delta;
    }

    pub fn get(&self, addr: u64) -> u64 {
        self.state.lock().registers.get(&addr).copied().unwrap_or(0)
    }

    /// Fail every read and write of `addr`
    pub fn fail(&self, addr: u64) {
        self.state.lock().failing.insert(addr);
    }

    pub fn fail_writes(&self, addr: u64) {
        self.state.lock().failing_writes.insert(addr);
    }

    /// Fail only the next read of `addr`
    pub fn fail_next_read(&self, addr: u64) {
        self.state.lock().fail_next_read.insert(addr);
    }

    pub fn reject_pins(&self) {
        self.state.lock().reject_pins = true;
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    pub fn pins(&self) -> Vec<u64> {
        self.state.lock().pins.clone()
    }
}

impl RegisterPort for FakePort {
    fn read(&self, addr: u64) -> Result<u64> {
        let mut state = self.state.lock();
        if state.failing.contains(&addr) || state.fail_next_read.remove(&addr) {
            return Err(PmcError::register(addr, "injected failure"));
        }
        Ok(state.registers.get(&addr).copied().unwrap_or(0))
    }

    fn write(&self, addr: u64, value: u64) -> Result<()> {
        let mut state = self.state.lock();
        if state.failing.contains(&addr) || state.failing_writes.contains(&addr) {
            return Err(PmcError::register(addr, "injected failure"));
        }
        state.registers.insert(addr, value);
        state.writes += 1;
        Ok(())
    }

    fn pin_to(&self, mask: u64) -> Result<PinGuard> {
        let mut state = self.state.lock();
        if state.reject_pins {
            return Err(PmcError::Pinning(format!("mask 0x{mask:X} rejected")));
        }
        state.pins.push(mask);
        Ok(PinGuard::noop(mask))
    }
}
