pub mod collector;

pub use collector::{attach_all, AttachReport, MetricCollector};
