pub mod affinity;
pub mod arch;
pub mod cpuid;
pub mod msr;

#[cfg(test)]
pub mod testing;

pub use affinity::{AffinityGuard, PinGuard};
pub use arch::{CpuArchitecture, CPU_ARCH};
pub use msr::{DevMsrPort, RegisterPort};
