//! Sandy Bridge-EP PCU register definitions
//!
//! The single-IMC layout introduced with Sandy Bridge-EP is reused unchanged
//! by Ivy Bridge-EP and by PCU function 0 of Haswell-EP and Broadwell-EP.
//!
//! ## References
//!
//! - Intel® Xeon® Processor E5 Family Datasheet, Volume 2 (PCU0 registers)

use crate::capability::DimmChannel;

/// PCI device ids of the PCU function carrying the DIMM temperature bytes
pub mod pci {
    /// Sandy Bridge-EP PCU, device 30 function 0
    pub const SANDY_BRIDGE_PCU_F0: u16 = 0x3cc0;

    /// Ivy Bridge-EP PCU, device 30 function 0
    pub const IVY_BRIDGE_PCU_F0: u16 = 0x0ec0;
}

/// DIMM temperature channels of memory controller 0
///
/// Channels A and B are always present. C and D read back zero on SKUs
/// that split the channels over two IMCs.
pub const DIMM_CHANNELS_MC0: [DimmChannel; 4] = [
    DimmChannel::new("MC_0_CH_A", 0x60),
    DimmChannel::new("MC_0_CH_B", 0x61),
    DimmChannel::new("MC_0_CH_C", 0x62),
    DimmChannel::new("MC_0_CH_D", 0x63),
];
