mod types;

pub use types::{DimmMetric, DimmReading};
