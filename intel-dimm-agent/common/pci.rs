use once_cell::sync::Lazy;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{DimmError, Result};

pub const PCI_VENDOR_ID_INTEL: u16 = 0x8086;

static PCI_PROC_ROOT: Lazy<PathBuf> = Lazy::new(|| host_path("/proc/bus/pci"));
static PCI_SYSFS_ROOT: Lazy<PathBuf> = Lazy::new(|| host_path("/sys/bus/pci/devices"));

fn host_path(path: &str) -> PathBuf {
    if std::env::var("DOCKER_RUNNING").is_ok() {
        PathBuf::from(format!("/pcm{path}"))
    } else {
        PathBuf::from(path)
    }
}

/// Byte-wide access to a device's PCI configuration space
pub trait ConfigSpace {
    fn read_config_byte(&self, offset: u8) -> Result<u8>;
}

impl<T: ConfigSpace + ?Sized> ConfigSpace for &T {
    fn read_config_byte(&self, offset: u8) -> Result<u8> {
        (**self).read_config_byte(offset)
    }
}

impl<T: ConfigSpace + ?Sized> ConfigSpace for Arc<T> {
    fn read_config_byte(&self, offset: u8) -> Result<u8> {
        (**self).read_config_byte(offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PciAddress {
    pub domain: u16,
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl PciAddress {
    pub fn new(domain: u16, bus: u8, device: u8, function: u8) -> Self {
        Self {
            domain,
            bus,
            device,
            function,
        }
    }

    pub fn devfn(&self) -> u8 {
        (self.device << 3) | (self.function & 0x7)
    }

    fn proc_path(&self, root: &Path) -> PathBuf {
        let bus_dir = if self.domain > 0 {
            format!("{:04x}:{:02x}", self.domain, self.bus)
        } else {
            format!("{:02x}", self.bus)
        };
        root.join(bus_dir)
            .join(format!("{:02x}.{:x}", self.device, self.function))
    }
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:x}",
            self.domain, self.bus, self.device, self.function
        )
    }
}

impl FromStr for PciAddress {
    type Err = DimmError;

    /// Parse `dddd:bb:dd.f`, or `bb:dd.f` for domain 0
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DimmError::ConfigError(format!("Invalid PCI address: {s}"));

        let s = s.trim();
        let (slot, function) = s.rsplit_once('.').ok_or_else(invalid)?;
        let parts: Vec<&str> = slot.split(':').collect();
        let (domain, bus, device) = match parts.as_slice() {
            [bus, device] => ("0", *bus, *device),
            [domain, bus, device] => (*domain, *bus, *device),
            _ => return Err(invalid()),
        };

        let domain = u16::from_str_radix(domain, 16).map_err(|_| invalid())?;
        let bus = u8::from_str_radix(bus, 16).map_err(|_| invalid())?;
        let device = u8::from_str_radix(device, 16).map_err(|_| invalid())?;
        let function = u8::from_str_radix(function, 16).map_err(|_| invalid())?;

        if device > 0x1f || function > 7 {
            return Err(invalid());
        }

        Ok(Self::new(domain, bus, device, function))
    }
}

pub struct PciHandle {
    file: parking_lot::Mutex<File>,
    address: PciAddress,
}

impl PciHandle {
    pub fn new(address: PciAddress) -> Result<Self> {
        Self::open(address, address.proc_path(&PCI_PROC_ROOT))
    }

    /// Open an explicit configuration-space file for `address`
    pub fn open(address: PciAddress, path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .open(path.as_ref())
            .map_err(|e| {
                DimmError::PciError(format!("Failed to open PCI device {address}: {e}"))
            })?;

        Ok(Self {
            file: parking_lot::Mutex::new(file),
            address,
        })
    }

    pub fn address(&self) -> PciAddress {
        self.address
    }

    pub fn read8(&self, offset: u8) -> Result<u8> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(u64::from(offset))).map_err(|e| {
            DimmError::PciError(format!(
                "Failed to seek to offset 0x{offset:02x} on {}: {e}",
                self.address
            ))
        })?;

        let mut buffer = [0u8; 1];
        file.read_exact(&mut buffer).map_err(|e| {
            DimmError::PciError(format!(
                "Failed to read at offset 0x{offset:02x} on {}: {e}",
                self.address
            ))
        })?;

        tracing::debug!(
            "PCI read: {} offset 0x{:02x} = 0x{:02x}",
            self.address,
            offset,
            buffer[0]
        );
        Ok(buffer[0])
    }
}

impl ConfigSpace for PciHandle {
    fn read_config_byte(&self, offset: u8) -> Result<u8> {
        self.read8(offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PciDevice {
    pub address: PciAddress,
    pub vendor_id: u16,
    pub device_id: u16,
}

/// List every PCI function known to sysfs
pub fn enumerate_devices() -> Result<Vec<PciDevice>> {
    enumerate_devices_in(&PCI_SYSFS_ROOT)
}

/// List PCI functions under a sysfs-style directory of `dddd:bb:dd.f` entries
pub fn enumerate_devices_in(root: &Path) -> Result<Vec<PciDevice>> {
    let entries = fs::read_dir(root).map_err(|e| {
        DimmError::PciError(format!("Failed to list {}: {e}", root.display()))
    })?;

    let mut devices = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Ok(address) = name.to_string_lossy().parse::<PciAddress>() else {
            tracing::debug!("Skipping PCI entry {:?}", name);
            continue;
        };

        let path = entry.path();
        let vendor_id = read_id(&path.join("vendor"))?;
        let device_id = read_id(&path.join("device"))?;
        devices.push(PciDevice {
            address,
            vendor_id,
            device_id,
        });
    }

    devices.sort_unstable_by_key(|d| d.address);
    Ok(devices)
}

fn read_id(path: &Path) -> Result<u16> {
    let content = fs::read_to_string(path)
        .map_err(|e| DimmError::PciError(format!("Failed to read {}: {e}", path.display())))?;
    let value = content.trim();
    let hex = value.strip_prefix("0x").unwrap_or(value);
    u16::from_str_radix(hex, 16).map_err(|_| {
        DimmError::PciError(format!("Malformed id {value:?} in {}", path.display()))
    })
}

/// Length of the configuration space an unprivileged reader can see
pub const UNPRIVILEGED_CONFIG_LEN: u8 = 0x40;

/// Check that registers past the standard header are readable
///
/// Without CAP_SYS_ADMIN the kernel truncates every read of
/// `/proc/bus/pci` to the first 64 bytes, which hides all DIMM registers.
pub fn check_config_access<C: ConfigSpace + ?Sized>(config: &C) -> Result<()> {
    config
        .read_config_byte(UNPRIVILEGED_CONFIG_LEN)
        .map(|_| ())
        .map_err(|e| DimmError::PermissionDenied(e.to_string()))
}

/// Keep the Intel PCU functions that carry DIMM temperatures
///
/// An empty `filter` selects every supported function.
pub fn select_pcu_devices(devices: &[PciDevice], filter: &[PciAddress]) -> Vec<PciDevice> {
    devices
        .iter()
        .filter(|d| d.vendor_id == PCI_VENDOR_ID_INTEL)
        .filter(|d| intel_dimm_raw::is_supported(d.device_id))
        .filter(|d| filter.is_empty() || filter.contains(&d.address))
        .copied()
        .collect()
}
