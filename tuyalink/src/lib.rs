//! # tuyalink
//!
//! Local network client for Tuya based smart devices.
//!
//! ## Features
//!
//! - Protocol 3.1 (plain and signed) and 3.3 (encrypted) dialects
//! - Async/await API using Tokio
//! - Retrying request/response sessions over TCP
//! - Discovery of devices through their UDP broadcasts
//!
//! ## Quick Start
//!
//! ```no_run
//! use tuyalink::{Device, ProtocolVersion};
//!
//! #[tokio::main]
//! async fn main() -> tuyalink::Result<()> {
//!     // Find devices on the LAN
//!     for (ip, found) in tuyalink::scan().await? {
//!         println!("{}: {}", ip, found);
//!     }
//!     
//!     // Talk to one of them
//!     let mut device = Device::new("01234567891234567890", "192.168.1.50", "0123456789abcdef")
//!         .with_version(ProtocolVersion::V3_3);
//!     
//!     let status = device.query_status().await?;
//!     println!("{:?}", status.dps());
//!     
//!     device.turn_off(1).await?;
//!     
//!     Ok(())
//! }
//! ```

pub mod device;
pub mod error;
pub mod scanner;

// Re-exports
pub use device::Device;
pub use error::{Error, Result};
pub use scanner::{Scan, Scanner, scan};

// Re-export types
pub use tuyalink_core::{Command, CommandCatalog, CrcCheck, Response, Session};
pub use tuyalink_types::{DeviceKind, DiscoveredDevice, ProtocolVersion};
