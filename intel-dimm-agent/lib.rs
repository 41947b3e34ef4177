// Macros (must be first for visibility)
#[macro_use]
pub mod macros;

pub mod common;
pub mod config;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod prom;

pub use config::ExportConfig;
pub use driver::{DimmDevice, SensorOps, CHIP_NAME};
pub use error::{AttachFailure, DimmError, Result};
pub use orchestrator::MetricCollector;
pub use prom::DimmMetricExporter;
