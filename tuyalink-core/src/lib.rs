//! # tuyalink-core
//!
//! Core protocol implementation for Tuya LAN devices.
//!
//! This crate provides the low-level protocol primitives:
//! - Frame structure and encoding/decoding
//! - CRC-32 calculation
//! - AES payload encryption and v3.1 signatures
//! - Command catalog and protocol constants
//! - Request/response codec

pub mod catalog;
pub mod checksum;
pub mod codec;
pub mod command;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod packet;
pub mod session;

pub use catalog::{CatalogEntry, CommandCatalog, SystemField};
pub use codec::{PacketCodec, Response};
pub use command::Command;
pub use error::{Error, ErrorCategory, Result};
pub use packet::{CrcCheck, Frame};
pub use session::Session;

/// Default device port
pub const DEFAULT_PORT: u16 = constants::DEFAULT_PORT;
