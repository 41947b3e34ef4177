use std::io;
use thiserror::Error;

use intel_dimm_raw::CapabilityError;

#[derive(Error, Debug)]
pub enum DimmError {
    #[error("Unsupported PCU device: 0x{0:04x}")]
    NotSupportedDevice(u16),

    #[error("No populated DIMM channel found")]
    NoChannelsFound,

    #[error("Allocation failed: {0}")]
    AllocationFailure(String),

    #[error("DIMM channel {0} is not exposed")]
    ChannelNotExposed(usize),

    #[error("No intel_dimm capable PCU device attached")]
    NoDevices,

    #[error("PCI operation failed: {0}")]
    PciError(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Prometheus error: {0}")]
    PrometheusError(#[from] prometheus::Error),
}

impl From<CapabilityError> for DimmError {
    fn from(err: CapabilityError) -> Self {
        match err {
            CapabilityError::NotSupportedDevice(id) => DimmError::NotSupportedDevice(id),
        }
    }
}

/// Why a PCU instance failed to attach
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachFailure {
    NotSupportedDevice,
    NoChannelsFound,
    AllocationFailure,
}

impl DimmError {
    /// Project an attach error onto the closed failure taxonomy.
    ///
    /// Transport errors during the probe are reported as `NoChannelsFound`,
    /// the instance is unusable either way.
    pub fn kind(&self) -> AttachFailure {
        match self {
            DimmError::NotSupportedDevice(_) => AttachFailure::NotSupportedDevice,
            DimmError::AllocationFailure(_) => AttachFailure::AllocationFailure,
            _ => AttachFailure::NoChannelsFound,
        }
    }
}

pub type Result<T> = std::result::Result<T, DimmError>;
