//! Type definitions for tuyalink

pub mod device;
pub mod discovered;
pub mod error;

pub use device::{DeviceKind, ProtocolVersion};
pub use discovered::DiscoveredDevice;
pub use error::{Error, Result};
