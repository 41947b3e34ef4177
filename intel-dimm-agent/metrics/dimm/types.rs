// DIMM thermal metrics

crate::metric_enum! {
    pub enum DimmMetric {
        Temperature => "DimmTemperature",
        ChannelsPopulated => "DimmChannelsPopulated",
    }
}

impl DimmMetric {
    pub fn help(&self) -> &'static str {
        match self {
            DimmMetric::Temperature => "DIMM channel temperature in degrees Celsius",
            DimmMetric::ChannelsPopulated => {
                "Number of channels with a DIMM detected at attach time"
            }
        }
    }
}

/// One temperature sample of a visible channel
#[derive(Debug, Clone, PartialEq)]
pub struct DimmReading {
    pub channel: usize,
    pub label: &'static str,
    pub millidegrees: i64,
}

impl DimmReading {
    pub fn celsius(&self) -> f64 {
        self.millidegrees as f64 / 1000.0
    }
}
