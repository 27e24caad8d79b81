//! # pmcflow-raw
//!
//! Register definitions for Intel client uncore performance monitoring.
//!
//! This crate holds the bit-level layouts and MSR addresses used to program
//! the per-slice L3 cache boxes (CBo) of Intel client processors. It performs
//! no register access itself; the agent crate owns the access port.
//!
//! ## Features
//!
//! Select the target architecture via feature flags:
//! - `alderlake` (default) - Alder Lake / Raptor Lake client uncore
//!
//! ## Usage
//!
//! ```ignore
//! use pmcflow_raw::current_arch::cbo;
//! use pmcflow_raw::RegisterLayout;
//!
//! // Address of PERFEVTSEL0 in the third cache box
//! let addr = cbo::msr::PERFEVTSEL[0].for_unit(2);
//!
//! let sel = cbo::UncorePerfEvtSel {
//!     event_select: cbo::events::LLC_LOOKUP,
//!     unit_mask: cbo::umasks::llc_lookup::ANY_STATE,
//!     enable: true,
//!     ..Default::default()
//! };
//!
//! port.write(addr, sel.to_msr_value())?;
//! ```

pub mod arch;
pub mod register;

pub use register::{Register, RegisterAddress, RegisterLayout};

// Export current architecture based on feature flag
#[cfg(feature = "alderlake")]
pub use arch::alderlake as current_arch;
