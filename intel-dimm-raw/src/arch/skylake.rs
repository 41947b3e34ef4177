//! Skylake-SP PCU register definitions
//!
//! Six DDR4 channels over two IMCs, all reported by PCU function 0.
//! Cascade Lake-SP shares the device id and layout.
//!
//! ## References
//!
//! - Intel® Xeon® Processor Scalable Family Datasheet, Volume 2

use crate::capability::DimmChannel;

/// PCI device ids of the PCU function
pub mod pci {
    /// Skylake-SP / Cascade Lake-SP PCU, device 30 function 0
    pub const SKYLAKE_PCU_F0: u16 = 0x2080;
}

/// DIMM temperature channels, IMC 0 then IMC 1
///
/// Offset 0x97 is skipped between the two controllers.
pub const DIMM_CHANNELS: [DimmChannel; 6] = [
    DimmChannel::new("MC_0_CH_A", 0x94),
    DimmChannel::new("MC_0_CH_B", 0x95),
    DimmChannel::new("MC_0_CH_C", 0x96),
    DimmChannel::new("MC_1_CH_D", 0x98),
    DimmChannel::new("MC_1_CH_E", 0x99),
    DimmChannel::new("MC_1_CH_F", 0x9a),
];
