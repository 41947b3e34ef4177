//! Ice Lake-SP and later PCU register definitions
//!
//! Eight channels over four IMCs, two channels each. The layout holds from
//! Ice Lake-SP through Sapphire Rapids and Emerald Rapids.

use crate::capability::DimmChannel;

/// PCI device ids of the PCU function
pub mod pci {
    /// Ice Lake-SP PCU, device 30 function 2
    pub const ICE_LAKE_PCU_F2: u16 = 0x345a;

    /// Sapphire Rapids / Emerald Rapids PCU, device 30 function 2
    pub const SAPPHIRE_RAPIDS_PCU_F2: u16 = 0x325a;
}

/// DIMM temperature channels, two per IMC with a stride of 4 bytes
pub const DIMM_CHANNELS: [DimmChannel; 8] = [
    DimmChannel::new("MC_0_CH_A", 0xc8),
    DimmChannel::new("MC_0_CH_B", 0xc9),
    DimmChannel::new("MC_1_CH_C", 0xcc),
    DimmChannel::new("MC_1_CH_D", 0xcd),
    DimmChannel::new("MC_2_CH_E", 0xd0),
    DimmChannel::new("MC_2_CH_F", 0xd1),
    DimmChannel::new("MC_3_CH_G", 0xd4),
    DimmChannel::new("MC_3_CH_H", 0xd5),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_pairs_share_imc_stride() {
        for pair in DIMM_CHANNELS.chunks(2) {
            assert_eq!(pair[1].register_offset, pair[0].register_offset + 1);
        }
        for (imc, pair) in DIMM_CHANNELS.chunks(2).enumerate() {
            assert_eq!(pair[0].register_offset, 0xc8 + 4 * imc as u8);
        }
    }
}
