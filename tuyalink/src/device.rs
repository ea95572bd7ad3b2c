//! High-level device interface

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use tuyalink_core::{Command, CommandCatalog, CrcCheck, PacketCodec, Response, Session};
use tuyalink_transport::{TcpTransport, TransportSession};
use tuyalink_types::{DeviceKind, ProtocolVersion};

use crate::error::Result;

/// Tuya device on the local network
///
/// Every call is one request/response exchange: the request is encoded for the
/// session's protocol version, sent over TCP and the reply decoded to JSON.
/// The socket is closed after each exchange unless it is made persistent.
///
/// # Examples
///
/// ```no_run
/// use serde_json::json;
/// use tuyalink::{Device, ProtocolVersion};
///
/// #[tokio::main]
/// async fn main() -> tuyalink::Result<()> {
///     let mut device = Device::new("01234567891234567890", "192.168.1.50", "0123456789abcdef")
///         .with_version(ProtocolVersion::V3_3);
///
///     let status = device.query_status().await?;
///     println!("dps: {:?}", status.dps());
///
///     device.send_control(&json!({"1": true})).await?;
///     Ok(())
/// }
/// ```
pub struct Device {
    address: String,
    session: Session,
    codec: PacketCodec,
    transport: TransportSession<TcpTransport>,
}

impl Device {
    /// Create a device on the default port (6668), speaking protocol 3.1
    pub fn new(
        device_id: impl Into<String>,
        address: impl Into<String>,
        local_key: impl AsRef<[u8]>,
    ) -> Self {
        let address = address.into();
        let transport = TcpTransport::to_device(address.clone());

        Self {
            session: Session::new(device_id, local_key),
            codec: PacketCodec::default(),
            transport: TransportSession::new(transport),
            address,
        }
    }

    pub fn with_version(mut self, version: ProtocolVersion) -> Self {
        self.set_version(version);
        self
    }

    /// Override the id-length based device kind
    pub fn with_kind(mut self, kind: DeviceKind) -> Self {
        self.set_kind(kind);
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.transport.transport_mut().set_port(port);
        self
    }

    /// Set connect and read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport.transport_mut().set_connect_timeout(timeout);
        self.transport.set_read_timeout(timeout);
        self
    }

    /// Use a custom command catalog
    pub fn with_catalog(mut self, catalog: Arc<CommandCatalog>) -> Self {
        self.codec = PacketCodec::new(catalog).with_crc_check(self.codec.crc_check());
        self
    }

    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.set_socket_persistent(persistent);
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.set_socket_nodelay(nodelay);
        self
    }

    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.set_socket_retry_limit(retry_limit);
        self
    }

    /// Data point mask sent with legacy status queries
    pub fn with_dps_used(mut self, dps: Value) -> Self {
        self.set_dps_used(dps);
        self
    }

    pub fn with_retry(mut self, retry: bool) -> Self {
        self.set_retry(retry);
        self
    }

    pub fn with_crc_check(mut self, enabled: bool) -> Self {
        self.set_crc_check(enabled);
        self
    }

    pub fn set_version(&mut self, version: ProtocolVersion) {
        self.session.set_version(version);
    }

    pub fn set_kind(&mut self, kind: DeviceKind) {
        self.session.set_kind(kind);
    }

    /// Keep the TCP connection open between calls
    pub fn set_socket_persistent(&mut self, persistent: bool) {
        self.transport.set_persistent(persistent);
    }

    /// Takes effect on the next connection
    pub fn set_socket_nodelay(&mut self, nodelay: bool) {
        self.transport.transport_mut().set_nodelay(nodelay);
    }

    pub fn set_socket_retry_limit(&mut self, retry_limit: u32) {
        self.transport.set_retry_limit(retry_limit);
    }

    pub fn set_dps_used(&mut self, dps: Value) {
        self.session.set_dps_mask(dps);
    }

    /// Read once more when a reply is shorter than 40 bytes
    pub fn set_retry(&mut self, retry: bool) {
        self.transport.set_short_read_retry(retry);
    }

    /// Validate the CRC of device replies (default: on)
    pub fn set_crc_check(&mut self, enabled: bool) {
        let check = if enabled { CrcCheck::Strict } else { CrcCheck::Lenient };
        self.codec.set_crc_check(check);
    }

    pub fn device_id(&self) -> &str {
        self.session.device_id()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn version(&self) -> ProtocolVersion {
        self.session.version()
    }

    pub fn kind(&self) -> DeviceKind {
        self.session.kind()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Query the current data point values
    pub async fn query_status(&mut self) -> Result<Response> {
        debug!("Querying status of {}", self.device_id());
        self.exchange(Command::DataPointQuery, None).await
    }

    /// Set data points, e.g. `{"1": true, "2": 50}`
    pub async fn send_control(&mut self, data_points: &Value) -> Result<Response> {
        debug!("Sending control to {}: {}", self.device_id(), data_points);
        self.exchange(Command::Control, Some(data_points)).await
    }

    /// Send any catalog command
    pub async fn send_raw(
        &mut self,
        command: Command,
        data_points: Option<&Value>,
    ) -> Result<Response> {
        self.exchange(command, data_points).await
    }

    pub async fn heartbeat(&mut self) -> Result<Response> {
        self.exchange(Command::Heartbeat, None).await
    }

    /// Set a single data point
    pub async fn set_value(
        &mut self,
        index: impl fmt::Display,
        value: impl Into<Value>,
    ) -> Result<Response> {
        let mut dps = Map::new();
        dps.insert(index.to_string(), value.into());
        self.send_control(&Value::Object(dps)).await
    }

    /// Switch `switch` on or off
    pub async fn set_status(&mut self, on: bool, switch: u32) -> Result<Response> {
        self.set_value(switch, on).await
    }

    pub async fn turn_on(&mut self, switch: u32) -> Result<Response> {
        self.set_status(true, switch).await
    }

    pub async fn turn_off(&mut self, switch: u32) -> Result<Response> {
        self.set_status(false, switch).await
    }

    /// Close a persistent connection
    pub async fn close(&mut self) -> Result<()> {
        self.transport.close().await?;
        Ok(())
    }

    // Helper methods

    async fn exchange(
        &mut self,
        command: Command,
        data_points: Option<&Value>,
    ) -> Result<Response> {
        let frame = self.codec.encode(&self.session, command, data_points)?;
        trace!("Sending: {:?}", frame);

        let request = frame.encode()?;
        let reply = self.transport.send_receive(&request).await?;

        let response = self.codec.decode(&self.session, &reply)?;
        debug!(
            "{} reply from {}: return code {:?}",
            command, self.address, response.return_code
        );

        Ok(response)
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("device_id", &self.session.device_id())
            .field("address", &self.address)
            .field("version", &self.session.version())
            .field("kind", &self.session.kind())
            .finish()
    }
}
