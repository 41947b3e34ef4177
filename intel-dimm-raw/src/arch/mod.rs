//! Architecture-specific PCU register definitions
//!
//! Each Intel Xeon generation places the per-channel DIMM temperature bytes
//! at different PCU configuration-space offsets, and some split the channels
//! across two PCI functions. This module provides the per-generation layouts
//! organized by CPU family.
//!
//! ## Supported Architectures
//!
//! - **Sandy Bridge-EP / Ivy Bridge-EP** - 4 channels, one IMC
//! - **Haswell-EP / Broadwell-EP** - 4 channels, one or two IMCs
//! - **Skylake-SP / Cascade Lake-SP** - 6 channels, two IMCs
//! - **Ice Lake-SP .. Emerald Rapids** - 8 channels, four IMCs

pub mod haswell;
pub mod icelake;
pub mod sandybridge;
pub mod skylake;
