pub mod pci;

pub use pci::{ConfigSpace, PciAddress, PciDevice, PciHandle};
