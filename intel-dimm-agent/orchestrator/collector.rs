// Device discovery and the periodic collection loop
// Every PCU function is attached on its own, one failure never stops the others

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::common::pci::{self, ConfigSpace, PciAddress, PciDevice, PciHandle};
use crate::config::ExportConfig;
use crate::driver::{AttachState, DimmDevice, RegisteredChip};
use crate::error::{DimmError, Result};
use crate::prom::DimmMetricExporter;

/// Outcome of attaching one PCU function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachReport {
    pub address: PciAddress,
    pub device_id: u16,
    pub state: AttachState,
}

/// Attach every candidate with the transport returned by `open`
pub fn attach_all<C, F>(
    candidates: &[PciDevice],
    open: F,
) -> (Vec<RegisteredChip>, Vec<AttachReport>)
where
    C: ConfigSpace + Send + Sync + 'static,
    F: Fn(&PciDevice) -> Result<C>,
{
    let mut chips = Vec::new();
    let mut reports = Vec::new();

    for candidate in candidates {
        let attached =
            open(candidate).and_then(|config| DimmDevice::attach(config, candidate.device_id));

        let state = match attached {
            Ok(dev) => {
                tracing::info!(
                    "Attached {} PCU at {} (0x{:04x}), channels {}",
                    dev.capability().generation.name(),
                    candidate.address,
                    candidate.device_id,
                    dev.enabled_mask()
                );
                let state = dev.state();
                chips.push(RegisteredChip::new(candidate.address, Arc::new(dev)));
                state
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to attach PCU at {} (0x{:04x}): {}",
                    candidate.address,
                    candidate.device_id,
                    e
                );
                AttachState::from_error(&e)
            }
        };

        reports.push(AttachReport {
            address: candidate.address,
            device_id: candidate.device_id,
            state,
        });
    }

    (chips, reports)
}

pub struct MetricCollector {
    config: ExportConfig,
    exporter: Arc<DimmMetricExporter>,
    reports: Vec<AttachReport>,
}

impl MetricCollector {
    /// Discover the PCU functions on the host and attach them
    pub fn new(config: ExportConfig) -> Result<Self> {
        let devices = pci::enumerate_devices()?;
        let candidates = pci::select_pcu_devices(&devices, &config.devices);
        tracing::info!("Found {} candidate PCU functions", candidates.len());

        let (chips, reports) =
            attach_all(&candidates, |d| PciHandle::new(d.address).map(Arc::new));
        Self::with_chips(config, chips, reports)
    }

    pub fn with_chips(
        config: ExportConfig,
        chips: Vec<RegisteredChip>,
        reports: Vec<AttachReport>,
    ) -> Result<Self> {
        if chips.is_empty() {
            return Err(DimmError::NoDevices);
        }

        let exporter = Arc::new(DimmMetricExporter::new(&config, chips)?);

        Ok(Self {
            config,
            exporter,
            reports,
        })
    }

    pub fn exporter(&self) -> Arc<DimmMetricExporter> {
        Arc::clone(&self.exporter)
    }

    pub fn reports(&self) -> &[AttachReport] {
        &self.reports
    }

    /// Start the collection loop, it stops when `cancel` fires
    pub fn start(self, cancel: CancellationToken) -> JoinHandle<()> {
        tracing::info!(
            "Starting DIMM collection loop every {:?}",
            self.config.interval
        );

        tokio::spawn(async move {
            self.collection_loop(cancel).await;
        })
    }

    async fn collection_loop(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Collection loop cancelled");
                    break;
                }
                _ = interval.tick() => {}
            }

            let exporter = Arc::clone(&self.exporter);
            if let Err(e) = tokio::task::spawn_blocking(move || exporter.collect()).await {
                tracing::error!("Collection task failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::pci::fake::FakeConfigSpace;
    use crate::error::AttachFailure;
    use intel_dimm_raw::resolve;

    fn candidate(device_id: u16, function: u8) -> PciDevice {
        PciDevice {
            address: PciAddress::new(0, 0xff, 0x1e, function),
            vendor_id: pci::PCI_VENDOR_ID_INTEL,
            device_id,
        }
    }

    #[test]
    fn test_single_imc_haswell_keeps_f0_only() {
        // One IMC: F0 reports all four channels, F4 reads zero
        let candidates = vec![candidate(0x2f98, 0), candidate(0x2f9c, 4)];
        let (chips, reports) = attach_all(&candidates, |d| {
            let raw: &[u8] = if d.device_id == 0x2f98 {
                &[40, 41, 42, 43]
            } else {
                &[0, 0]
            };
            Ok(FakeConfigSpace::with_channels(resolve(d.device_id)?, raw))
        });

        assert_eq!(chips.len(), 1);
        assert_eq!(chips[0].address.function, 0);
        assert_eq!(reports[0].state, AttachState::Ready);
        assert_eq!(
            reports[1].state,
            AttachState::Failed(AttachFailure::NoChannelsFound)
        );
    }

    #[test]
    fn test_open_failure_is_isolated() {
        let candidates = vec![candidate(0x2080, 0), candidate(0x2080, 1)];
        let (chips, reports) = attach_all(&candidates, |d| {
            if d.address.function == 0 {
                Err(DimmError::PciError("permission denied".to_string()))
            } else {
                Ok(FakeConfigSpace::with_channels(
                    resolve(0x2080)?,
                    &[30, 0, 0, 0, 0, 0],
                ))
            }
        });

        assert_eq!(chips.len(), 1);
        assert!(!reports[0].state.is_ready());
        assert!(reports[1].state.is_ready());
    }

    #[test]
    fn test_collector_requires_a_device() {
        let result = MetricCollector::with_chips(ExportConfig::default(), Vec::new(), Vec::new());
        assert!(matches!(result, Err(DimmError::NoDevices)));
    }

    #[tokio::test]
    async fn test_collection_loop_stops_on_cancel() {
        let config = Arc::new(FakeConfigSpace::with_channels(
            resolve(0x2080).unwrap(),
            &[30, 0, 0, 0, 0, 0],
        ));
        let dev = DimmDevice::attach(Arc::clone(&config), 0x2080).unwrap();
        let chip = RegisteredChip::new(PciAddress::new(0, 0xff, 0x1e, 0), Arc::new(dev));

        let collector =
            MetricCollector::with_chips(ExportConfig::default(), vec![chip], Vec::new()).unwrap();
        let cancel = CancellationToken::new();
        let handle = collector.start(cancel.clone());

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        cancel.cancel();
        handle.await.unwrap();

        // attach read 6 channels, each tick re-read channel 0
        assert!(config.reads() > 6);
    }
}
