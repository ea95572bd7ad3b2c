//! Command catalog
//!
//! Maps `(Command, DeviceKind)` to the wire opcode and the system fields
//! injected into the JSON body. Built once and shared read-only between
//! sessions.

use std::collections::HashMap;

use tuyalink_types::DeviceKind;

use crate::{
    command::Command,
    constants::opcodes,
    error::{Error, Result},
};

/// Identity and timing fields a request body carries
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SystemField {
    /// `gwId`, the device id
    GatewayId,

    /// `devId`, the device id
    DeviceId,

    /// `uid`, the device id
    Uid,

    /// `t`, Unix seconds as a decimal string
    Timestamp,
}

impl SystemField {
    /// JSON key
    pub fn key(self) -> &'static str {
        match self {
            Self::GatewayId => "gwId",
            Self::DeviceId => "devId",
            Self::Uid => "uid",
            Self::Timestamp => "t",
        }
    }
}

/// One catalog row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Wire opcode
    pub opcode: u8,

    /// Fields injected in this order
    pub fields: Vec<SystemField>,
}

impl CatalogEntry {
    pub fn new(opcode: u8, fields: &[SystemField]) -> Self {
        Self {
            opcode,
            fields: fields.to_vec(),
        }
    }

    /// `0x0d` requests carry the session's data point mask instead of caller data
    pub fn requests_dps_mask(&self) -> bool {
        self.opcode == opcodes::CONTROL_NEW
    }
}

/// Immutable command table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCatalog {
    entries: HashMap<(Command, DeviceKind), CatalogEntry>,
}

impl CommandCatalog {
    /// Catalog without entries
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Table understood by current firmware
    pub fn standard() -> Self {
        use SystemField::*;

        const ID_UID_T: &[SystemField] = &[DeviceId, Uid, Timestamp];

        Self::empty()
            .with_entry(
                Command::Control,
                DeviceKind::Standard,
                CatalogEntry::new(opcodes::CONTROL, ID_UID_T),
            )
            .with_entry(
                Command::Status,
                DeviceKind::Standard,
                CatalogEntry::new(opcodes::STATUS, &[GatewayId, DeviceId]),
            )
            .with_entry(
                Command::Heartbeat,
                DeviceKind::Standard,
                CatalogEntry::new(opcodes::HEART_BEAT, &[]),
            )
            .with_entry(
                Command::DataPointQuery,
                DeviceKind::Standard,
                CatalogEntry::new(opcodes::DP_QUERY, &[GatewayId, DeviceId, Uid, Timestamp]),
            )
            .with_entry(
                Command::ControlNew,
                DeviceKind::Standard,
                CatalogEntry::new(opcodes::CONTROL_NEW, ID_UID_T),
            )
            .with_entry(
                Command::DataPointQueryNew,
                DeviceKind::Standard,
                CatalogEntry::new(opcodes::DP_QUERY_NEW_REQUEST, ID_UID_T),
            )
            // 22 character ids query data points with the CONTROL_NEW opcode
            .with_entry(
                Command::DataPointQuery,
                DeviceKind::LegacyLongId,
                CatalogEntry::new(opcodes::CONTROL_NEW, ID_UID_T),
            )
            .with_entry(
                Command::Control,
                DeviceKind::LegacyLongId,
                CatalogEntry::new(opcodes::CONTROL, ID_UID_T),
            )
            .with_entry(
                Command::Heartbeat,
                DeviceKind::LegacyLongId,
                CatalogEntry::new(opcodes::HEART_BEAT, &[]),
            )
    }

    /// Add or replace an entry
    pub fn with_entry(mut self, command: Command, kind: DeviceKind, entry: CatalogEntry) -> Self {
        self.entries.insert((command, kind), entry);
        self
    }

    /// Find the entry for a command on a device kind
    pub fn lookup(&self, command: Command, kind: DeviceKind) -> Result<&CatalogEntry> {
        self.entries
            .get(&(command, kind))
            .ok_or(Error::UnsupportedCommand { command, kind })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CommandCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
