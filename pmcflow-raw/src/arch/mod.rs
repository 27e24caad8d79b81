//! Architecture-specific register definitions
//!
//! Each Intel client generation places its uncore PMON registers at
//! different MSR addresses. This module provides architecture-specific
//! definitions organized by CPU family.
//!
//! ## Supported Architectures
//!
//! - **Alder Lake** (`alderlake` feature) - 12th/13th/14th gen client parts,
//!   including Raptor Lake which keeps the same CBo register map

#[cfg(feature = "alderlake")]
pub mod alderlake;
