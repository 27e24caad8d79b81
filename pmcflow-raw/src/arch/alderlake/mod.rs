//! Intel Alder Lake client uncore register definitions
//!
//! ## Uncore Units
//!
//! - **CBo** (Cache Box) - one per L3 slice, two programmable counters each
//! - **Global** - uncore-wide enable/freeze control
//!
//! ## References
//!
//! - Intel® 64 and IA-32 Architectures Software Developer's Manual, Volume 4,
//!   "MSRs Specific to 12th Generation Intel® Core™ Processors"

pub mod cbo;
