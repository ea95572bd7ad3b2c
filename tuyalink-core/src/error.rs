//! Error types for tuyalink-core

use bytes::Bytes;
use tuyalink_types::DeviceKind;

use crate::command::Command;

/// Result type alias for tuyalink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad error classes surfaced to callers
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Key, padding or ciphertext problems
    Crypto,

    /// Unparseable, oversized or corrupted frames and payloads
    Protocol,

    /// Command not available for the device kind
    Configuration,
}

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// AES-128 needs a 16 byte key
    #[error("Invalid key length: {0} bytes (expected 16)")]
    InvalidKeyLength(usize),

    /// Ciphertext is empty or not block aligned
    #[error("Invalid ciphertext length: {0} bytes is not a non-zero multiple of 16")]
    InvalidCiphertextLength(usize),

    /// Padding byte out of range
    #[error("Invalid padding byte 0x{0:02X}")]
    InvalidPadding(u8),

    /// Base64 text payload could not be decoded
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Frame is too short to be valid
    #[error("Frame too short: expected at least {expected} bytes, got {actual} bytes")]
    FrameTooShort {
        expected: usize,
        actual: usize,
    },

    /// Prefix or suffix magic is wrong
    #[error("Bad frame magic: expected 0x{expected:08X}, found 0x{found:08X}")]
    BadMagic {
        expected: u32,
        found: u32,
    },

    /// CRC verification failed
    #[error("Checksum mismatch: expected 0x{expected:08X}, received 0x{received:08X}")]
    ChecksumMismatch {
        expected: u32,
        received: u32,
    },

    /// Length word would overflow its single populated byte
    #[error("Payload too large: length field {size} (max: {max})")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },

    /// Payload is neither JSON nor a known encrypted form
    #[error("Unexpected payload: {raw:?}")]
    UnexpectedPayload {
        raw: Bytes,
    },

    /// Payload decoded but is not valid JSON
    #[error("Malformed JSON payload {raw:?}: {source}")]
    MalformedJson {
        #[source]
        source: serde_json::Error,
        raw: Bytes,
    },

    /// Outgoing body could not be serialized
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Command catalog has no entry for this pair
    #[error("Command {command} is not supported by {kind} devices")]
    UnsupportedCommand {
        command: Command,
        kind: DeviceKind,
    },
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidKeyLength(_)
            | Self::InvalidCiphertextLength(_)
            | Self::InvalidPadding(_)
            | Self::Base64(_) => ErrorCategory::Crypto,
            Self::UnsupportedCommand { .. } => ErrorCategory::Configuration,
            _ => ErrorCategory::Protocol,
        }
    }

    /// Check if error is recoverable (retry might succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FrameTooShort { .. } | Self::ChecksumMismatch { .. }
        )
    }
}
