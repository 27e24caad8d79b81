use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PmcError {
    #[error("Register access failed at MSR 0x{addr:X}: {reason}")]
    RegisterAccess { addr: u64, reason: String },

    #[error("Invalid uncore topology: {0}")]
    Topology(String),

    #[error("Affinity operation failed: {0}")]
    Pinning(String),

    #[error("Configuration state error: {0}")]
    ConfigurationState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Nix error: {0}")]
    Nix(#[from] nix::Error),

    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

impl PmcError {
    pub(crate) fn register(addr: u64, reason: impl Into<String>) -> Self {
        PmcError::RegisterAccess {
            addr,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PmcError>;
