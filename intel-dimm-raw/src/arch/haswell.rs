//! Haswell-EP / Broadwell-EP PCU register definitions
//!
//! These parts have one or two IMCs per socket:
//!
//! - One IMC: all four channels are reported by device 30 function 0.
//!   Function 4 is still enumerated but every temperature byte reads zero.
//! - Two IMCs: channels A/B are reported by function 0, channels C/D by
//!   function 4.
//!
//! Function 0 uses the Sandy Bridge layout, see
//! [`DIMM_CHANNELS_MC0`](crate::arch::sandybridge::DIMM_CHANNELS_MC0).

use crate::capability::DimmChannel;

/// PCI device ids of the PCU functions
pub mod pci {
    /// Haswell-EP PCU, device 30 function 0
    pub const HASWELL_PCU_F0: u16 = 0x2f98;

    /// Haswell-EP PCU, device 30 function 4
    pub const HASWELL_PCU_F4: u16 = 0x2f9c;

    /// Broadwell-EP PCU, device 30 function 0
    pub const BROADWELL_PCU_F0: u16 = 0x6f98;

    /// Broadwell-EP PCU, device 30 function 4
    pub const BROADWELL_PCU_F4: u16 = 0x6f9c;
}

/// DIMM temperature channels of memory controller 1 (function 4)
pub const DIMM_CHANNELS_MC1: [DimmChannel; 2] = [
    DimmChannel::new("MC_1_CH_C", 0x60),
    DimmChannel::new("MC_1_CH_D", 0x61),
];
