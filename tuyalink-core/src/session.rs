//! Codec parameters for one device
//!
//! A session carries what the codec needs to build and read frames:
//! - Device id (injected into request bodies)
//! - Local key (AES key)
//! - Protocol version and device kind
//! - Data point mask for `0x0d` requests

use serde_json::{Value, json};
use tuyalink_types::{DeviceKind, ProtocolVersion};

/// Per-device codec parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    device_id: String,
    local_key: Vec<u8>,
    version: ProtocolVersion,
    kind: DeviceKind,
    dps_mask: Value,
}

impl Session {
    /// Create a session, classifying the device from its id
    ///
    /// # Examples
    ///
    /// ```
    /// use tuyalink_core::Session;
    /// use tuyalink_types::{DeviceKind, ProtocolVersion};
    ///
    /// let session = Session::new("abc123", "0123456789abcdef");
    /// assert_eq!(session.kind(), DeviceKind::Standard);
    /// assert_eq!(session.version(), ProtocolVersion::V3_1);
    /// ```
    pub fn new(device_id: impl Into<String>, local_key: impl AsRef<[u8]>) -> Self {
        let device_id = device_id.into();
        let kind = DeviceKind::from_device_id(&device_id);

        Self {
            device_id,
            local_key: local_key.as_ref().to_vec(),
            version: ProtocolVersion::default(),
            kind,
            dps_mask: json!({ "1": null }),
        }
    }

    pub fn with_version(mut self, version: ProtocolVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_kind(mut self, kind: DeviceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn local_key(&self) -> &[u8] {
        &self.local_key
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Data points requested by `0x0d` requests
    pub fn dps_mask(&self) -> &Value {
        &self.dps_mask
    }

    pub fn set_version(&mut self, version: ProtocolVersion) {
        self.version = version;
    }

    pub fn set_kind(&mut self, kind: DeviceKind) {
        self.kind = kind;
    }

    pub fn set_dps_mask(&mut self, dps_mask: Value) {
        self.dps_mask = dps_mask;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_session_new() {
        let session = Session::new("abc123", "0123456789abcdef");
        assert_eq!(session.device_id(), "abc123");
        assert_eq!(session.local_key(), b"0123456789abcdef");
        assert_eq!(session.dps_mask(), &json!({ "1": null }));
    }

    #[test]
    fn test_session_legacy_id() {
        let session = Session::new("bf0123456789abcdefghij", "");
        assert_eq!(session.kind(), DeviceKind::LegacyLongId);

        let session = session.with_kind(DeviceKind::Standard);
        assert_eq!(session.kind(), DeviceKind::Standard);
    }

    #[test]
    fn test_session_setters() {
        let mut session = Session::new("abc123", "");
        session.set_version(ProtocolVersion::V3_3);
        session.set_dps_mask(json!({ "1": null, "20": null }));

        assert_eq!(session.version(), ProtocolVersion::V3_3);
        assert_eq!(session.dps_mask()["20"], Value::Null);
    }
}
