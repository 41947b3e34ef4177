pub mod device;
pub mod probe;
pub mod sensor;

pub use device::{AttachState, DimmDevice};
pub use probe::{probe, ChannelMask};
pub use sensor::{
    attributes, read_attributes, show_attribute, RegisteredChip, SensorAttribute, SensorOps,
    Visibility, CHIP_NAME,
};
