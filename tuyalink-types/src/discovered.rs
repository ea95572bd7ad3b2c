//! Devices found by listening to LAN broadcasts

use std::fmt;

use serde_json::Value;

use crate::device::ProtocolVersion;
use crate::error::{Error, Result};

/// Device announced through a discovery broadcast
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredDevice {
    /// Network address the device advertises
    pub ip: String,

    /// Device id (`gwId`)
    pub gw_id: String,

    /// Product key
    pub product_key: String,

    /// Advertised protocol version string (e.g. "3.3")
    pub version: String,

    /// Whether the broadcast payload was encrypted with the UDP key
    pub encrypted: bool,

    /// Data point snapshot from the follow-up status query
    pub dps: Option<Value>,

    /// Reason the follow-up status query failed
    pub poll_error: Option<String>,

    /// Complete broadcast body
    pub raw: Value,
}

impl DiscoveredDevice {
    /// Build from a decoded broadcast body
    ///
    /// `ip`, `gwId`, `productKey` and `version` must all be strings.
    pub fn from_broadcast(body: Value, encrypted: bool) -> Result<Self> {
        let field = |name: &str| -> Result<String> {
            body.get(name)
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| Error::Validation(format!("broadcast is missing `{name}`")))
        };

        Ok(Self {
            ip: field("ip")?,
            gw_id: field("gwId")?,
            product_key: field("productKey")?,
            version: field("version")?,
            encrypted,
            dps: None,
            poll_error: None,
            raw: body,
        })
    }

    /// Parsed protocol version
    pub fn protocol_version(&self) -> Result<ProtocolVersion> {
        self.version.parse()
    }
}

impl fmt::Display for DiscoveredDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device[{}](id: {}, product: {}, version: {})",
            self.ip, self.gw_id, self.product_key, self.version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_broadcast() {
        let body = json!({
            "ip": "10.0.1.99",
            "gwId": "01234567891234567890",
            "active": 2,
            "productKey": "keyabc",
            "version": "3.3"
        });

        let device = DiscoveredDevice::from_broadcast(body.clone(), true).unwrap();
        assert_eq!(device.ip, "10.0.1.99");
        assert_eq!(device.gw_id, "01234567891234567890");
        assert_eq!(device.protocol_version().unwrap(), ProtocolVersion::V3_3);
        assert_eq!(device.raw, body);
        assert!(device.encrypted);
        assert!(device.dps.is_none());
    }

    #[test]
    fn test_from_broadcast_missing_field() {
        let body = json!({ "ip": "10.0.1.99", "gwId": "x" });
        let result = DiscoveredDevice::from_broadcast(body, false);
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
