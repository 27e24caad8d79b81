// Read-and-clear counter accounting
//
// Counters are zeroed after every read so each sample is the delta since the
// previous one and no wraparound arithmetic is needed. Hardware may count an
// event between the read and the clear; that event is lost. The undercount is
// bounded by the events of a few cycles per read.

use crate::common::msr::RegisterPort;
use crate::error::Result;

/// Read a counter, reset it to zero and return the value seen before the reset
pub fn read_and_clear(port: &dyn RegisterPort, addr: u64) -> Result<u64> {
    let values = read_and_clear_all(port, &[addr])?;
    Ok(values[0])
}

/// Drain a group of counters that belong to one sample
///
/// Every counter is read before any of them is cleared. On failure the whole
/// group is cleared as far as the port allows and the error is returned, so
/// the next sample of every counter starts from the same point.
pub fn read_and_clear_all(port: &dyn RegisterPort, addrs: &[u64]) -> Result<Vec<u64>> {
    let values = match addrs.iter().map(|&addr| port.read(addr)).collect::<Result<Vec<_>>>() {
        Ok(values) => values,
        Err(e) => {
            clear_best_effort(port, addrs);
            return Err(e);
        }
    };

    for (i, &addr) in addrs.iter().enumerate() {
        if let Err(e) = port.write(addr, 0) {
            clear_best_effort(port, &addrs[i + 1..]);
            return Err(e);
        }
    }

    Ok(values)
}

fn clear_best_effort(port: &dyn RegisterPort, addrs: &[u64]) {
    for &addr in addrs {
        if let Err(e) = port.write(addr, 0) {
            tracing::debug!("Could not clear counter 0x{:X}: {}", addr, e);
        }
    }
}
