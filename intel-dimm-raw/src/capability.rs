//! PCU capability table
//!
//! Maps a PCU PCI device id to the ordered list of DIMM channels it reports.
//! The position of a channel in its layout is its channel index: the bit in
//! the presence mask and the sensor index exposed to users.

use crate::arch::{haswell, icelake, sandybridge, skylake};

pub type Result<T> = std::result::Result<T, CapabilityError>;

/// Upper bound on channels per layout, the presence mask is one byte wide
pub const MAX_CHANNELS: usize = 8;

/// Errors raised while resolving a PCU capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    #[error("PCU device 0x{0:04x} is not supported")]
    NotSupportedDevice(u16),
}

/// CPU generation a PCU device id belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generation {
    SandyBridge,
    IvyBridge,
    Haswell,
    Broadwell,
    Skylake,
    IceLake,
    SapphireRapids,
}

impl Generation {
    pub fn name(&self) -> &'static str {
        match self {
            Generation::SandyBridge => "Sandy Bridge",
            Generation::IvyBridge => "Ivy Bridge",
            Generation::Haswell => "Haswell",
            Generation::Broadwell => "Broadwell",
            Generation::Skylake => "Skylake",
            Generation::IceLake => "Ice Lake",
            Generation::SapphireRapids => "Sapphire Rapids",
        }
    }
}

/// One DIMM temperature channel inside a PCU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimmChannel {
    /// Sensor label, e.g. `MC_0_CH_A`
    pub label: &'static str,
    /// Temperature byte offset in PCU configuration space
    pub register_offset: u8,
}

impl DimmChannel {
    pub const fn new(label: &'static str, register_offset: u8) -> Self {
        Self {
            label,
            register_offset,
        }
    }
}

/// Channel layout reported by one PCU device id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityEntry {
    pub device_id: u16,
    pub generation: Generation,
    pub channels: &'static [DimmChannel],
}

impl CapabilityEntry {
    const fn new(
        device_id: u16,
        generation: Generation,
        channels: &'static [DimmChannel],
    ) -> Self {
        Self {
            device_id,
            generation,
            channels,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, index: usize) -> Option<&'static DimmChannel> {
        self.channels.get(index)
    }
}

const _: () = assert!(sandybridge::DIMM_CHANNELS_MC0.len() <= MAX_CHANNELS);
const _: () = assert!(haswell::DIMM_CHANNELS_MC1.len() <= MAX_CHANNELS);
const _: () = assert!(skylake::DIMM_CHANNELS.len() <= MAX_CHANNELS);
const _: () = assert!(icelake::DIMM_CHANNELS.len() <= MAX_CHANNELS);

/// Every supported PCU function, in lookup order
pub static CAPABILITY_TABLE: &[CapabilityEntry] = &[
    CapabilityEntry::new(
        sandybridge::pci::SANDY_BRIDGE_PCU_F0,
        Generation::SandyBridge,
        &sandybridge::DIMM_CHANNELS_MC0,
    ),
    CapabilityEntry::new(
        sandybridge::pci::IVY_BRIDGE_PCU_F0,
        Generation::IvyBridge,
        &sandybridge::DIMM_CHANNELS_MC0,
    ),
    CapabilityEntry::new(
        haswell::pci::HASWELL_PCU_F0,
        Generation::Haswell,
        &sandybridge::DIMM_CHANNELS_MC0,
    ),
    CapabilityEntry::new(
        haswell::pci::BROADWELL_PCU_F0,
        Generation::Broadwell,
        &sandybridge::DIMM_CHANNELS_MC0,
    ),
    CapabilityEntry::new(
        haswell::pci::HASWELL_PCU_F4,
        Generation::Haswell,
        &haswell::DIMM_CHANNELS_MC1,
    ),
    CapabilityEntry::new(
        haswell::pci::BROADWELL_PCU_F4,
        Generation::Broadwell,
        &haswell::DIMM_CHANNELS_MC1,
    ),
    CapabilityEntry::new(
        skylake::pci::SKYLAKE_PCU_F0,
        Generation::Skylake,
        &skylake::DIMM_CHANNELS,
    ),
    CapabilityEntry::new(
        icelake::pci::ICE_LAKE_PCU_F2,
        Generation::IceLake,
        &icelake::DIMM_CHANNELS,
    ),
    CapabilityEntry::new(
        icelake::pci::SAPPHIRE_RAPIDS_PCU_F2,
        Generation::SapphireRapids,
        &icelake::DIMM_CHANNELS,
    ),
];

/// Look up the channel layout of a PCU device id
///
/// # Errors
///
/// Returns [`CapabilityError::NotSupportedDevice`] when the id is not in
/// [`CAPABILITY_TABLE`].
pub fn resolve(device_id: u16) -> Result<&'static CapabilityEntry> {
    CAPABILITY_TABLE
        .iter()
        .find(|entry| entry.device_id == device_id)
        .ok_or(CapabilityError::NotSupportedDevice(device_id))
}

pub fn is_supported(device_id: u16) -> bool {
    resolve(device_id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn layout(device_id: u16) -> Vec<(&'static str, u8)> {
        resolve(device_id)
            .unwrap()
            .channels
            .iter()
            .map(|ch| (ch.label, ch.register_offset))
            .collect()
    }

    #[test]
    fn test_single_imc_generations_share_layout() {
        let expected = vec![
            ("MC_0_CH_A", 0x60),
            ("MC_0_CH_B", 0x61),
            ("MC_0_CH_C", 0x62),
            ("MC_0_CH_D", 0x63),
        ];
        for id in [0x3cc0, 0x0ec0, 0x2f98, 0x6f98] {
            assert_eq!(layout(id), expected, "device 0x{id:04x}");
        }
    }

    #[test]
    fn test_second_imc_function() {
        let expected = vec![("MC_1_CH_C", 0x60), ("MC_1_CH_D", 0x61)];
        assert_eq!(layout(0x2f9c), expected);
        assert_eq!(layout(0x6f9c), expected);
    }

    #[test]
    fn test_skylake_layout() {
        assert_eq!(
            layout(0x2080),
            vec![
                ("MC_0_CH_A", 0x94),
                ("MC_0_CH_B", 0x95),
                ("MC_0_CH_C", 0x96),
                ("MC_1_CH_D", 0x98),
                ("MC_1_CH_E", 0x99),
                ("MC_1_CH_F", 0x9a),
            ]
        );
        assert_eq!(resolve(0x2080).unwrap().generation, Generation::Skylake);
    }

    #[test]
    fn test_icelake_layout() {
        let expected = vec![
            ("MC_0_CH_A", 0xc8),
            ("MC_0_CH_B", 0xc9),
            ("MC_1_CH_C", 0xcc),
            ("MC_1_CH_D", 0xcd),
            ("MC_2_CH_E", 0xd0),
            ("MC_2_CH_F", 0xd1),
            ("MC_3_CH_G", 0xd4),
            ("MC_3_CH_H", 0xd5),
        ];
        assert_eq!(layout(0x345a), expected);
        assert_eq!(layout(0x325a), expected);
    }

    #[test]
    fn test_unknown_device_is_rejected() {
        assert_eq!(
            resolve(0x9999),
            Err(CapabilityError::NotSupportedDevice(0x9999))
        );
        assert!(!is_supported(0x0000));
        assert!(!is_supported(0xffff));
    }

    #[test]
    fn test_table_invariants() {
        let mut ids = HashSet::new();
        for entry in CAPABILITY_TABLE {
            assert!(ids.insert(entry.device_id), "duplicate id");
            assert!((2..=MAX_CHANNELS).contains(&entry.channel_count()));

            let labels: HashSet<_> = entry.channels.iter().map(|c| c.label).collect();
            let offsets: HashSet<_> = entry.channels.iter().map(|c| c.register_offset).collect();
            assert_eq!(labels.len(), entry.channel_count());
            assert_eq!(offsets.len(), entry.channel_count());
        }
        assert_eq!(CAPABILITY_TABLE.len(), 9);
    }
}
