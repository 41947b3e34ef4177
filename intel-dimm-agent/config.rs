use std::net::SocketAddr;
use std::time::Duration;

use crate::common::PciAddress;
use crate::error::{DimmError, Result};

pub const DEFAULT_LISTEN: &str = "0.0.0.0:9101";

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub listen: SocketAddr,
    pub interval: Duration,
    /// PCU functions to attach, empty means every supported one
    pub devices: Vec<PciAddress>,
    pub instance_label: String,
}

impl ExportConfig {
    pub fn new(listen: SocketAddr, interval: Duration, devices: Vec<PciAddress>) -> Result<Self> {
        if interval.is_zero() {
            return Err(DimmError::ConfigError(
                "Collection interval must be greater than zero".to_string(),
            ));
        }

        let instance_label = std::env::var("INSTANCE_LABEL").unwrap_or_else(|_| "none".to_string());

        Ok(Self {
            listen,
            interval,
            devices,
            instance_label,
        })
    }

    /// Parse device filters like ["0000:ff:1e.0", "ff:1e.4,7f:1e.0"]
    pub fn parse_device_list(inputs: &[String]) -> Result<Vec<PciAddress>> {
        let mut devices = Vec::new();

        for input in inputs {
            for part in input.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                devices.push(part.parse::<PciAddress>()?);
            }
        }

        devices.sort_unstable();
        devices.dedup();
        Ok(devices)
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 9101)),
            interval: Duration::from_secs(1),
            devices: Vec::new(),
            instance_label: "none".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_list() {
        let inputs = vec![
            "ff:1e.4, 0000:7f:1e.0".to_string(),
            "0000:ff:1e.4".to_string(),
            "".to_string(),
        ];
        let devices = ExportConfig::parse_device_list(&inputs).unwrap();
        let names: Vec<String> = devices.iter().map(|d| d.to_string()).collect();
        assert_eq!(names, vec!["0000:7f:1e.0", "0000:ff:1e.4"]);
    }

    #[test]
    fn test_parse_device_list_rejects_garbage() {
        let inputs = vec!["ff:1e.0,socket0".to_string()];
        assert!(matches!(
            ExportConfig::parse_device_list(&inputs),
            Err(DimmError::ConfigError(_))
        ));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let listen: SocketAddr = DEFAULT_LISTEN.parse().unwrap();
        assert!(ExportConfig::new(listen, Duration::ZERO, Vec::new()).is_err());

        let config = ExportConfig::new(listen, Duration::from_secs(5), Vec::new()).unwrap();
        assert_eq!(config.interval, Duration::from_secs(5));
        assert!(config.devices.is_empty());
    }
}
