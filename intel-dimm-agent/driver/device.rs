// Per-PCU driver state
// Resolved once, probed once, read-only afterwards

use intel_dimm_raw::{CapabilityEntry, TemperatureRegister};

use crate::common::ConfigSpace;
use crate::driver::probe::{probe, ChannelMask};
use crate::driver::sensor::{SensorOps, Visibility};
use crate::error::{AttachFailure, DimmError, Result};

/// Lifecycle of one PCU instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachState {
    Uninitialized,
    CapabilityResolved,
    ChannelsProbed,
    Ready,
    Failed(AttachFailure),
}

impl AttachState {
    pub fn is_ready(&self) -> bool {
        matches!(self, AttachState::Ready)
    }

    /// Terminal state of an attach that stopped on `err`
    pub fn from_error(err: &DimmError) -> Self {
        AttachState::Failed(err.kind())
    }
}

/// An attached PCU function
///
/// `C` is a handle to the configuration space, e.g. `&PciHandle` or
/// `Arc<PciHandle>`. The device never owns the underlying transport.
pub struct DimmDevice<C> {
    config: C,
    capability: &'static CapabilityEntry,
    enabled: ChannelMask,
    state: AttachState,
}

impl<C: ConfigSpace> DimmDevice<C> {
    /// Resolve the layout of `device_id` and probe which channels are populated.
    ///
    /// No register is read when the device id is unknown.
    pub fn attach(config: C, device_id: u16) -> Result<Self> {
        let mut state = AttachState::Uninitialized;

        let capability = intel_dimm_raw::resolve(device_id).map_err(DimmError::from);
        let capability = advance(&mut state, capability, AttachState::CapabilityResolved)?;

        let enabled = advance(
            &mut state,
            probe(capability, &config),
            AttachState::ChannelsProbed,
        )?;

        advance(&mut state, Ok(()), AttachState::Ready)?;
        tracing::debug!(
            "PCU 0x{:04x} ({}): channels {} of {} populated",
            device_id,
            capability.generation.name(),
            enabled,
            capability.channel_count()
        );

        Ok(Self {
            config,
            capability,
            enabled,
            state,
        })
    }

    /// State reached by `attach`, always `Ready` for a constructed device
    pub fn state(&self) -> AttachState {
        self.state
    }

    pub fn capability(&self) -> &'static CapabilityEntry {
        self.capability
    }

    pub fn enabled_mask(&self) -> ChannelMask {
        self.enabled
    }

    pub fn config(&self) -> &C {
        &self.config
    }
}

fn advance<T>(state: &mut AttachState, step: Result<T>, next: AttachState) -> Result<T> {
    let next = match &step {
        Ok(_) => next,
        Err(e) => AttachState::from_error(e),
    };
    tracing::trace!("Attach: {:?} -> {:?}", state, next);
    *state = next;
    step
}

impl<C: ConfigSpace + Send + Sync> SensorOps for DimmDevice<C> {
    fn channel_count(&self) -> usize {
        self.capability.channel_count()
    }

    fn is_visible(&self, channel: usize) -> Visibility {
        if self.enabled.contains(channel) {
            Visibility::ReadOnly
        } else {
            Visibility::Hidden
        }
    }

    fn read_temperature(&self, channel: usize) -> Result<i64> {
        if !self.enabled.contains(channel) {
            return Err(DimmError::ChannelNotExposed(channel));
        }
        let dimm = self
            .capability
            .channel(channel)
            .ok_or(DimmError::ChannelNotExposed(channel))?;

        let raw = self.config.read_config_byte(dimm.register_offset)?;
        Ok(TemperatureRegister::from_config_byte(raw).millidegrees())
    }

    fn label(&self, channel: usize) -> Option<&'static str> {
        self.capability.channel(channel).map(|dimm| dimm.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::pci::fake::FakeConfigSpace;
    use crate::driver::sensor::{attributes, read_attributes, show_attribute, SensorAttribute};
    use intel_dimm_raw::resolve;
    use std::sync::Arc;

    fn fake(device_id: u16, raw: &[u8]) -> FakeConfigSpace {
        FakeConfigSpace::with_channels(resolve(device_id).unwrap(), raw)
    }

    #[test]
    fn test_skylake_scenario() {
        let config = fake(0x2080, &[10, 0, 20, 0, 5, 30]);
        let dev = DimmDevice::attach(&config, 0x2080).unwrap();

        let visible: Vec<usize> = (0..dev.channel_count())
            .filter(|&i| dev.is_visible(i) == Visibility::ReadOnly)
            .collect();
        assert_eq!(visible, vec![0, 2, 4, 5]);
        assert_eq!(dev.state(), AttachState::Ready);
        assert_eq!(dev.read_temperature(0).unwrap(), 10_000);
        assert_eq!(dev.read_temperature(5).unwrap(), 30_000);
        assert_eq!(dev.label(0), Some("MC_0_CH_A"));
        assert_eq!(dev.is_visible(1), Visibility::Hidden);
        assert_eq!(dev.is_visible(1).mode(), 0);
        assert!(matches!(
            dev.read_temperature(1),
            Err(DimmError::ChannelNotExposed(1))
        ));
    }

    #[test]
    fn test_icelake_without_dimms_fails() {
        let config = fake(0x345a, &[0; 8]);
        assert!(matches!(
            DimmDevice::attach(&config, 0x345a),
            Err(DimmError::NoChannelsFound)
        ));
    }

    #[test]
    fn test_unknown_device_reads_nothing() {
        let config = FakeConfigSpace::default();
        let err = DimmDevice::attach(&config, 0x9999).err().unwrap();
        assert!(matches!(err, DimmError::NotSupportedDevice(0x9999)));
        assert_eq!(err.kind(), AttachFailure::NotSupportedDevice);
        assert_eq!(
            AttachState::from_error(&err),
            AttachState::Failed(AttachFailure::NotSupportedDevice)
        );
        assert_eq!(config.reads(), 0);
    }

    #[test]
    fn test_haswell_second_imc() {
        let config = fake(0x2f9c, &[5, 0]);
        let dev = DimmDevice::attach(&config, 0x2f9c).unwrap();

        assert_eq!(dev.enabled_mask().iter().collect::<Vec<_>>(), vec![0]);
        assert_eq!(dev.label(0), Some("MC_1_CH_C"));
        assert_eq!(dev.is_visible(1), Visibility::Hidden);

        let names: Vec<String> = attributes(&dev).iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["temp1_input", "temp1_label"]);
    }

    #[test]
    fn test_reads_are_not_cached() {
        let entry = resolve(0x2080).unwrap();
        let config = Arc::new(fake(0x2080, &[37, 0, 0, 0, 0, 0]));
        let dev = DimmDevice::attach(Arc::clone(&config), 0x2080).unwrap();
        assert_eq!(dev.read_temperature(0).unwrap(), 37_000);

        config.set(entry.channels[0].register_offset, 52);
        assert_eq!(dev.read_temperature(0).unwrap(), 52_000);

        // Mask is a snapshot, a channel appearing later stays hidden
        config.set(entry.channels[1].register_offset, 40);
        assert_eq!(dev.is_visible(1), Visibility::Hidden);
    }

    #[test]
    fn test_show_attribute_gates_hidden_channels() {
        let config = fake(0x3cc0, &[44, 0, 0, 0]);
        let dev = DimmDevice::attach(&config, 0x3cc0).unwrap();

        assert_eq!(
            show_attribute(&dev, 0, SensorAttribute::Input).unwrap(),
            "44000"
        );
        assert_eq!(
            show_attribute(&dev, 0, SensorAttribute::Label).unwrap(),
            "MC_0_CH_A"
        );
        assert!(show_attribute(&dev, 2, SensorAttribute::Label).is_err());
        assert!(show_attribute(&dev, 9, SensorAttribute::Input).is_err());

        let entries = attributes(&dev);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.mode == 0o444));
    }

    #[test]
    fn test_read_attributes_lists_visible_files() {
        let config = fake(0x2080, &[0, 33, 0, 0, 0, 41]);
        let dev = DimmDevice::attach(&config, 0x2080).unwrap();

        let files: Vec<(String, String)> = read_attributes(&dev)
            .into_iter()
            .map(|(name, value)| (name, value.unwrap()))
            .collect();
        assert_eq!(
            files,
            vec![
                ("temp2_input".to_string(), "33000".to_string()),
                ("temp2_label".to_string(), "MC_0_CH_B".to_string()),
                ("temp6_input".to_string(), "41000".to_string()),
                ("temp6_label".to_string(), "MC_1_CH_F".to_string()),
            ]
        );
    }
}
