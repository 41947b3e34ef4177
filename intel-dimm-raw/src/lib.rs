//! # intel-dimm-raw
//!
//! PCU register definitions for Intel DIMM temperature sensors.
//!
//! Intel Xeon processors report the temperature of each memory channel in a
//! byte of the PCU (Power Control Unit) PCI configuration space. The offsets,
//! the number of channels and the PCI function carrying them change from
//! Sandy Bridge-EP to Emerald Rapids. This crate provides the per-generation
//! layouts and the lookup from PCU device id to layout.
//!
//! ## Usage
//!
//! ```
//! use intel_dimm_raw::{resolve, TemperatureRegister};
//!
//! let pcu = resolve(0x2080).unwrap();
//! assert_eq!(pcu.channels.len(), 6);
//! assert_eq!(pcu.channels[0].label, "MC_0_CH_A");
//!
//! // Byte read at pcu.channels[0].register_offset
//! let reg = TemperatureRegister::from_config_byte(41);
//! assert_eq!(reg.millidegrees(), 41_000);
//! ```

pub mod arch;
pub mod capability;
pub mod register;

// Re-export for convenience
pub use capability::{
    is_supported, resolve, CapabilityEntry, CapabilityError, DimmChannel, Generation, Result,
    CAPABILITY_TABLE, MAX_CHANNELS,
};
pub use register::{TemperatureRegister, MILLIDEGREES_PER_DEGREE};
