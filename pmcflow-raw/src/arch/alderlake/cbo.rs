//! CBo (Cache Box) register definitions for Alder Lake client parts
//!
//! Each L3 slice has one CBo with two programmable 44-bit counters. The
//! number of enabled boxes is reported by `MSR_UNC_CBO_CONFIG`.
//!
//! ## References
//!
//! - Intel® 64 and IA-32 Architectures Software Developer's Manual, Volume 4
//! - Intel® 64 and IA-32 Architectures Software Developer's Manual, Volume 3B,
//!   "Uncore Performance Monitoring (Client)"

use crate::register::RegisterLayout;

/// Number of programmable counters per CBo
pub const COUNTERS_PER_CBO: usize = 2;

/// Stride between CBo box MSR addresses
pub const CBO_BOX_STRIDE: u64 = 0x8;

/// Bytes moved per counted cache lookup
pub const CACHE_LINE_SIZE: u64 = 64;

/// MSR addresses for CBo units
pub mod msr {
    use super::{CBO_BOX_STRIDE, COUNTERS_PER_CBO};
    use crate::register::RegisterAddress;

    /// Uncore capability register, reports the CBo count
    pub const MSR_UNC_CBO_CONFIG: u64 = 0x396;

    /// Uncore global control (enable / freeze for every uncore counter)
    pub const MSR_UNC_PERF_GLOBAL_CTRL: u64 = 0x2FF0;

    /// CBo 0 event select 0
    pub const MSR_UNC_CBO_PERFEVTSEL0_BASE: u64 = 0x2000;

    /// CBo 0 event select 1
    pub const MSR_UNC_CBO_PERFEVTSEL1_BASE: u64 = 0x2001;

    /// CBo 0 counter 0
    pub const MSR_UNC_CBO_PERFCTR0_BASE: u64 = 0x2002;

    /// CBo 0 counter 1
    pub const MSR_UNC_CBO_PERFCTR1_BASE: u64 = 0x2003;

    /// Event select registers, indexed by counter slot
    pub const PERFEVTSEL: [RegisterAddress; COUNTERS_PER_CBO] = [
        RegisterAddress::new(MSR_UNC_CBO_PERFEVTSEL0_BASE, CBO_BOX_STRIDE),
        RegisterAddress::new(MSR_UNC_CBO_PERFEVTSEL1_BASE, CBO_BOX_STRIDE),
    ];

    /// Counter registers, indexed by counter slot
    pub const PERFCTR: [RegisterAddress; COUNTERS_PER_CBO] = [
        RegisterAddress::new(MSR_UNC_CBO_PERFCTR0_BASE, CBO_BOX_STRIDE),
        RegisterAddress::new(MSR_UNC_CBO_PERFCTR1_BASE, CBO_BOX_STRIDE),
    ];

    /// Get event select MSR address for a counter slot of a specific CBo
    pub const fn perfevtsel(cbo_index: usize, counter_num: usize) -> u64 {
        PERFEVTSEL[counter_num].for_unit(cbo_index)
    }

    /// Get counter value MSR address for a counter slot of a specific CBo
    pub const fn perfctr(cbo_index: usize, counter_num: usize) -> u64 {
        PERFCTR[counter_num].for_unit(cbo_index)
    }
}

/// `MSR_UNC_CBO_CONFIG` layout
///
/// Bits 0-3 report the CBo count. Only the low three bits are used; the
/// SDM note about subtracting one does not match what client parts report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CboConfig {
    /// Number of enabled cache boxes
    pub cbo_count: u8,
}

impl RegisterLayout for CboConfig {
    fn to_msr_value(&self) -> u64 {
        self.cbo_count as u64 & 0x7
    }

    fn from_msr_value(value: u64) -> Self {
        Self {
            cbo_count: (value & 0x7) as u8,
        }
    }

    fn validate(&self) -> Result<(), &'static str> {
        if self.cbo_count == 0 {
            return Err("CBo count must be non-zero");
        }
        if self.cbo_count > 7 {
            return Err("CBo count must be <= 7 (3 bits)");
        }
        Ok(())
    }
}

/// `MSR_UNC_PERF_GLOBAL_CTRL` layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UncoreGlobalControl {
    /// Enable all uncore counters (bit 29)
    pub enable: bool,
    /// Freeze all uncore counters (bit 31)
    pub freeze: bool,
}

impl RegisterLayout for UncoreGlobalControl {
    fn to_msr_value(&self) -> u64 {
        (if self.enable { 1 << 29 } else { 0 }) | (if self.freeze { 1 << 31 } else { 0 })
    }

    fn from_msr_value(value: u64) -> Self {
        Self {
            enable: (value & (1 << 29)) != 0,
            freeze: (value & (1 << 31)) != 0,
        }
    }
}

/// CBo event select register layout
///
/// ## Register Format
///
/// | Bits   | Field               | Description                          |
/// |--------|---------------------|--------------------------------------|
/// | 0-7    | event_select        | Event code to count                  |
/// | 8-15   | unit_mask           | Event sub-select (umask)             |
/// | 18     | edge_detect         | Count rising edges vs level          |
/// | 20     | overflow_interrupt  | Raise PMI on overflow                |
/// | 22     | enable              | Enable counter                       |
/// | 23     | invert              | Invert counter mask comparison       |
/// | 24-28  | counter_mask        | Threshold (5 bits)                   |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UncorePerfEvtSel {
    /// Event select code (bits 0-7)
    pub event_select: u8,

    /// Unit mask / event sub-select (bits 8-15)
    pub unit_mask: u8,

    /// Edge detection mode (bit 18)
    pub edge_detect: bool,

    /// Overflow interrupt (bit 20)
    pub overflow_interrupt: bool,

    /// Enable counter (bit 22)
    pub enable: bool,

    /// Invert counter mask comparison (bit 23)
    pub invert: bool,

    /// Counter mask (bits 24-28, 5 bits)
    pub counter_mask: u8,
}

impl UncorePerfEvtSel {
    /// Enabled selector for `event`/`umask` with no filtering
    pub const fn counting(event_select: u8, unit_mask: u8) -> Self {
        Self {
            event_select,
            unit_mask,
            edge_detect: false,
            overflow_interrupt: false,
            enable: true,
            invert: false,
            counter_mask: 0,
        }
    }
}

impl RegisterLayout for UncorePerfEvtSel {
    fn to_msr_value(&self) -> u64 {
        (self.event_select as u64)
            | ((self.unit_mask as u64) << 8)
            | (if self.edge_detect { 1 << 18 } else { 0 })
            | (if self.overflow_interrupt { 1 << 20 } else { 0 })
            | (if self.enable { 1 << 22 } else { 0 })
            | (if self.invert { 1 << 23 } else { 0 })
            | ((self.counter_mask as u64 & 0x1F) << 24)
    }

    fn from_msr_value(value: u64) -> Self {
        Self {
            event_select: (value & 0xFF) as u8,
            unit_mask: ((value >> 8) & 0xFF) as u8,
            edge_detect: (value & (1 << 18)) != 0,
            overflow_interrupt: (value & (1 << 20)) != 0,
            enable: (value & (1 << 22)) != 0,
            invert: (value & (1 << 23)) != 0,
            counter_mask: ((value >> 24) & 0x1F) as u8,
        }
    }

    fn validate(&self) -> Result<(), &'static str> {
        if self.counter_mask > 31 {
            return Err("Counter mask must be <= 31 (5 bits)");
        }
        Ok(())
    }
}

/// CBo event codes
pub mod events {
    /// Snoop responses received from cores
    pub const XSNP_RESPONSE: u8 = 0x22;

    /// L3 lookups
    pub const LLC_LOOKUP: u8 = 0x34;
}

/// CBo unit masks (event sub-selectors)
pub mod umasks {
    /// `LLC_LOOKUP` umasks: low nibble selects line state, high nibble the
    /// request source
    pub mod llc_lookup {
        /// Hit in M state
        pub const STATE_M: u8 = 0x01;

        /// Hit in E or S state
        pub const STATE_ES: u8 = 0x06;

        /// Lookup in I state (miss)
        pub const STATE_I: u8 = 0x08;

        /// Every line state
        pub const ANY_STATE: u8 = STATE_M | STATE_ES | STATE_I;

        /// Any request source
        pub const ANY_REQUEST: u8 = 0x80;

        /// All lookups
        pub const ALL: u8 = ANY_STATE | ANY_REQUEST;

        /// Lookups that missed
        pub const MISS: u8 = STATE_I | ANY_REQUEST;
    }

    /// `XSNP_RESPONSE` umasks: low nibble selects the response, high bits
    /// the request that caused the snoop
    pub mod xsnp_response {
        /// Snoop invalidated a core's copy of the line
        pub const INVALIDATE: u8 = 0x02;

        /// Hit a non-modified line
        pub const HIT: u8 = 0x04;

        /// Hit a modified line
        pub const HITM: u8 = 0x08;

        /// Invalidated a line the core held
        pub const INVALIDATE_ANY: u8 = 0x10;

        /// Caused by an external snoop
        pub const EXTERNAL: u8 = 0x20;

        /// Caused by a core memory request
        pub const CORE_REQUEST: u8 = 0x40;

        /// Caused by an L3 eviction
        pub const L3_EVICTION: u8 = 0x80;

        /// Every source filter
        pub const ANY_SOURCE: u8 = EXTERNAL | CORE_REQUEST | L3_EVICTION;

        /// All snoop responses
        pub const ALL: u8 = 0xFF;
    }
}
