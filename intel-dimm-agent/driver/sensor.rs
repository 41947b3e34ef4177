// Sensor exposition seam
// Mirrors the hwmon chip ops: visibility, numeric read, string read

use std::sync::Arc;

use crate::common::PciAddress;
use crate::error::{DimmError, Result};

/// Chip name every PCU instance registers under
pub const CHIP_NAME: &str = "intel_dimm";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Hidden,
    ReadOnly,
}

impl Visibility {
    /// File mode the attribute would be created with, 0 means not created
    pub fn mode(&self) -> u32 {
        match self {
            Visibility::Hidden => 0,
            Visibility::ReadOnly => 0o444,
        }
    }
}

/// Per-channel temperature queries answered by an attached chip
pub trait SensorOps: Send + Sync {
    fn channel_count(&self) -> usize;

    fn is_visible(&self, channel: usize) -> Visibility;

    /// Current temperature in milli-degrees Celsius, always read from hardware
    fn read_temperature(&self, channel: usize) -> Result<i64>;

    fn label(&self, channel: usize) -> Option<&'static str>;
}

/// A sensor set registered for one PCU function
#[derive(Clone)]
pub struct RegisteredChip {
    pub address: PciAddress,
    pub ops: Arc<dyn SensorOps>,
}

impl RegisteredChip {
    pub fn new(address: PciAddress, ops: Arc<dyn SensorOps>) -> Self {
        Self { address, ops }
    }

    /// lm-sensors style chip name, e.g. `intel_dimm-pci-fff0`
    pub fn name(&self) -> String {
        format!(
            "{}-pci-{:02x}{:02x}",
            CHIP_NAME,
            self.address.bus,
            self.address.devfn()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorAttribute {
    Input,
    Label,
}

impl SensorAttribute {
    pub fn suffix(&self) -> &'static str {
        match self {
            SensorAttribute::Input => "input",
            SensorAttribute::Label => "label",
        }
    }

    pub fn all() -> Vec<SensorAttribute> {
        vec![SensorAttribute::Input, SensorAttribute::Label]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeEntry {
    pub channel: usize,
    pub attribute: SensorAttribute,
    pub mode: u32,
}

impl AttributeEntry {
    /// hwmon attribute name, channels are numbered from 1
    pub fn name(&self) -> String {
        format!("temp{}_{}", self.channel + 1, self.attribute.suffix())
    }
}

/// Attributes a chip exposes. Hidden channels get none.
pub fn attributes(chip: &dyn SensorOps) -> Vec<AttributeEntry> {
    let mut entries = Vec::new();
    for channel in 0..chip.channel_count() {
        let visibility = chip.is_visible(channel);
        if visibility == Visibility::Hidden {
            continue;
        }
        for attribute in SensorAttribute::all() {
            entries.push(AttributeEntry {
                channel,
                attribute,
                mode: visibility.mode(),
            });
        }
    }
    entries
}

/// Render an attribute the way its file would read
pub fn show_attribute(
    chip: &dyn SensorOps,
    channel: usize,
    attribute: SensorAttribute,
) -> Result<String> {
    if chip.is_visible(channel) == Visibility::Hidden {
        return Err(DimmError::ChannelNotExposed(channel));
    }

    match attribute {
        SensorAttribute::Input => Ok(chip.read_temperature(channel)?.to_string()),
        SensorAttribute::Label => chip
            .label(channel)
            .map(str::to_string)
            .ok_or(DimmError::ChannelNotExposed(channel)),
    }
}

/// Every attribute file of a chip with its contents, in creation order
pub fn read_attributes(chip: &dyn SensorOps) -> Vec<(String, Result<String>)> {
    attributes(chip)
        .into_iter()
        .map(|entry| {
            (
                entry.name(),
                show_attribute(chip, entry.channel, entry.attribute),
            )
        })
        .collect()
}
