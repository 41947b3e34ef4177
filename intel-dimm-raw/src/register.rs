//! DIMM temperature register decoding

/// Scale applied to the raw byte, readings are reported in milli-degrees Celsius
pub const MILLIDEGREES_PER_DEGREE: i64 = 1000;

/// One byte-wide DIMM temperature register
///
/// ## Register Format
///
/// | Bits | Field       | Description                        |
/// |------|-------------|------------------------------------|
/// | 0-7  | temperature | Hottest DIMM on the channel, in °C |
///
/// The PCU has no presence bit. An unpopulated channel reads back zero, so
/// a zero byte is treated as "no DIMM" rather than as a 0 °C reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemperatureRegister {
    pub raw: u8,
}

impl TemperatureRegister {
    pub const fn from_config_byte(raw: u8) -> Self {
        Self { raw }
    }

    pub const fn is_populated(&self) -> bool {
        self.raw != 0
    }

    pub const fn millidegrees(&self) -> i64 {
        self.raw as i64 * MILLIDEGREES_PER_DEGREE
    }

    pub fn celsius(&self) -> f64 {
        f64::from(self.raw)
    }
}

impl From<u8> for TemperatureRegister {
    fn from(raw: u8) -> Self {
        Self::from_config_byte(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millidegree_scale() {
        assert_eq!(TemperatureRegister::from_config_byte(37).millidegrees(), 37_000);
        assert_eq!(TemperatureRegister::from_config_byte(255).millidegrees(), 255_000);
        assert_eq!(TemperatureRegister::from_config_byte(1).celsius(), 1.0);
    }

    #[test]
    fn test_zero_means_unpopulated() {
        assert!(!TemperatureRegister::from_config_byte(0).is_populated());
        for raw in 1..=u8::MAX {
            assert!(TemperatureRegister::from(raw).is_populated());
        }
    }
}
