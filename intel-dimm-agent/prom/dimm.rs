use prometheus::{Gauge, Opts, Registry};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ExportConfig;
use crate::driver::{RegisteredChip, Visibility};
use crate::error::Result;
use crate::metrics::dimm::{DimmMetric, DimmReading};

pub struct DimmMetricExporter {
    registry: Arc<Registry>,
    chips: Vec<RegisteredChip>,
    // (chip index, channel) -> gauge, visible channels only
    temperature_gauges: HashMap<(usize, usize), Gauge>,
}

impl DimmMetricExporter {
    pub fn new(config: &ExportConfig, chips: Vec<RegisteredChip>) -> Result<Self> {
        let mut exporter = Self {
            registry: Arc::new(Registry::new()),
            chips,
            temperature_gauges: HashMap::new(),
        };

        exporter.register_metrics(&config.instance_label)?;

        Ok(exporter)
    }

    fn register_metrics(&mut self, instance_label: &str) -> Result<()> {
        for (chip_idx, chip) in self.chips.iter().enumerate() {
            let chip_name = chip.name();
            let device = chip.address.to_string();
            let chip_opts = |metric: DimmMetric| {
                Opts::new(metric.name(), metric.help())
                    .const_label("chip", chip_name.as_str())
                    .const_label("device", device.as_str())
                    .const_label("instance", instance_label)
            };

            // Hidden channels publish nothing, not even their label
            let visible: Vec<usize> = (0..chip.ops.channel_count())
                .filter(|&channel| chip.ops.is_visible(channel) == Visibility::ReadOnly)
                .collect();

            let populated = Gauge::with_opts(chip_opts(DimmMetric::ChannelsPopulated))?;
            populated.set(visible.len() as f64);
            self.registry.register(Box::new(populated))?;

            for &channel in &visible {
                let label = chip.ops.label(channel).unwrap_or("unknown");
                let opts = chip_opts(DimmMetric::Temperature).const_label("channel", label);
                let gauge = Gauge::with_opts(opts)?;
                self.registry.register(Box::new(gauge.clone()))?;
                self.temperature_gauges.insert((chip_idx, channel), gauge);
            }

            tracing::info!(
                "Registered {} ({}) with {} DIMM sensors",
                chip_name,
                device,
                visible.len()
            );
        }

        Ok(())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn chips(&self) -> &[RegisteredChip] {
        &self.chips
    }

    /// Re-read every visible channel and update its gauge
    pub fn collect(&self) {
        for (&(chip_idx, channel), gauge) in &self.temperature_gauges {
            let chip = &self.chips[chip_idx];
            match chip.ops.read_temperature(channel) {
                Ok(millidegrees) => gauge.set(millidegrees as f64 / 1000.0),
                Err(e) => {
                    tracing::warn!(
                        "Failed to read channel {} of {}: {}",
                        channel,
                        chip.address,
                        e
                    );
                }
            }
        }
    }
}

/// Read all visible channels of one chip
pub fn read_chip(chip: &RegisteredChip) -> Vec<Result<DimmReading>> {
    (0..chip.ops.channel_count())
        .filter(|&channel| chip.ops.is_visible(channel) == Visibility::ReadOnly)
        .map(|channel| {
            Ok(DimmReading {
                channel,
                label: chip.ops.label(channel).unwrap_or("unknown"),
                millidegrees: chip.ops.read_temperature(channel)?,
            })
        })
        .collect()
}
