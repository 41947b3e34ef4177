// DIMM channel presence detection
// Runs once per PCU at attach time, the resulting mask is never refreshed

use std::fmt;

use intel_dimm_raw::{CapabilityEntry, TemperatureRegister, MAX_CHANNELS};

use crate::common::ConfigSpace;
use crate::error::{DimmError, Result};

/// Set of populated channel indices for one layout
///
/// Bits at or above `channel_count` are never set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelMask {
    bits: u8,
    channel_count: u8,
}

impl ChannelMask {
    pub fn empty(channel_count: usize) -> Self {
        Self {
            bits: 0,
            channel_count: channel_count.min(MAX_CHANNELS) as u8,
        }
    }

    pub fn from_bits(channel_count: usize, bits: u8) -> Self {
        let mut mask = Self::empty(channel_count);
        mask.bits = bits & mask.valid_bits();
        mask
    }

    fn valid_bits(&self) -> u8 {
        ((1u16 << self.channel_count) - 1) as u8
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count as usize
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn insert(&mut self, index: usize) {
        if index < self.channel_count() {
            self.bits |= 1 << index;
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.channel_count() && self.bits & (1 << index) != 0
    }

    pub fn none(&self) -> bool {
        self.bits == 0
    }

    pub fn count(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.channel_count()).filter(move |&i| self.contains(i))
    }
}

impl fmt::Display for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indices: Vec<String> = self.iter().map(|i| i.to_string()).collect();
        write!(f, "{{{}}}", indices.join(","))
    }
}

/// Read every channel of `entry` once and record which ones are populated.
///
/// # Errors
///
/// `NoChannelsFound` when every channel reads zero, or the transport error
/// of the first failing read.
pub fn probe<C: ConfigSpace + ?Sized>(entry: &CapabilityEntry, config: &C) -> Result<ChannelMask> {
    let mut mask = ChannelMask::empty(entry.channel_count());

    for (index, channel) in entry.channels.iter().enumerate() {
        let reg = TemperatureRegister::from_config_byte(
            config.read_config_byte(channel.register_offset)?,
        );

        if reg.is_populated() {
            mask.insert(index);
        } else {
            tracing::debug!(
                "Channel {} ({}) reads zero, treating as unpopulated",
                index,
                channel.label
            );
        }
    }

    if mask.none() {
        return Err(DimmError::NoChannelsFound);
    }

    Ok(mask)
}
