//! LAN discovery
//!
//! Listens for the periodic broadcasts devices send on UDP 6666 (v3.1) and
//! 6667 (v3.3) and collects one entry per advertised address.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::BytesMut;
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use tuyalink_core::constants::{
    DEFAULT_PORT, DISCOVERY_MAX_RETRIES, DISCOVERY_PORT, DISCOVERY_TIMEOUT, LEGACY_DISCOVERY_PORT,
};
use tuyalink_core::{CrcCheck, Frame, crypto};
use tuyalink_transport::{Error as TransportError, UdpListener};
use tuyalink_types::{DiscoveredDevice, ProtocolVersion};

use crate::device::Device;
use crate::error::Result;

/// Recorded when the follow-up status query of a v3.1 device fails
pub const POLL_ERROR: &str = "Unable to poll";

/// Discovery settings
#[derive(Debug, Clone)]
pub struct Scanner {
    legacy_port: u16,
    modern_port: u16,
    max_retries: u32,
    timeout: Duration,
    status_poll: bool,
    poll_port: u16,
    max_devices: Option<usize>,
    crc_check: CrcCheck,
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            legacy_port: LEGACY_DISCOVERY_PORT,
            modern_port: DISCOVERY_PORT,
            max_retries: DISCOVERY_MAX_RETRIES,
            timeout: Duration::from_secs(DISCOVERY_TIMEOUT),
            status_poll: true,
            poll_port: DEFAULT_PORT,
            max_devices: None,
            crc_check: CrcCheck::default(),
        }
    }

    /// Ports for v3.1 and v3.3 broadcasts (0 picks an ephemeral port)
    pub fn with_ports(mut self, legacy: u16, modern: u16) -> Self {
        self.legacy_port = legacy;
        self.modern_port = modern;
        self
    }

    /// Empty reads tolerated across both sockets (default: 15)
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Wait per read (default: 3 s)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Query the status of newly found v3.1 devices (default: on)
    pub fn with_status_poll(mut self, enabled: bool) -> Self {
        self.status_poll = enabled;
        self
    }

    /// TCP port used for the status query (default: 6668)
    pub fn with_poll_port(mut self, port: u16) -> Self {
        self.poll_port = port;
        self
    }

    /// Stop as soon as this many devices are known
    pub fn with_max_devices(mut self, max_devices: usize) -> Self {
        self.max_devices = Some(max_devices);
        self
    }

    pub fn with_crc_check(mut self, check: CrcCheck) -> Self {
        self.crc_check = check;
        self
    }

    /// Bind both listeners. Must be called from within a tokio runtime.
    pub fn bind(self) -> Result<Scan> {
        let legacy = UdpListener::bind(self.legacy_port)?;
        let modern = UdpListener::bind(self.modern_port)?;

        Ok(Scan {
            config: self,
            legacy,
            modern,
        })
    }

    /// Bind and run in one step
    pub async fn scan(self) -> Result<HashMap<String, DiscoveredDevice>> {
        self.bind()?.run().await
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan with both listeners bound
pub struct Scan {
    config: Scanner,
    legacy: UdpListener,
    modern: UdpListener,
}

impl Scan {
    /// Bound addresses of the v3.1 and v3.3 listeners
    pub fn local_addrs(&self) -> Result<(SocketAddr, SocketAddr)> {
        Ok((self.legacy.local_addr()?, self.modern.local_addr()?))
    }

    /// Listen until the retry budget is spent
    ///
    /// Each empty read, duplicate broadcast or unreadable datagram counts
    /// against the socket it arrived on; a new device gives one back. The
    /// socket with fewer failures is read next, v3.1 first on a tie.
    pub async fn run(self) -> Result<HashMap<String, DiscoveredDevice>> {
        let mut devices: HashMap<String, DiscoveredDevice> = HashMap::new();
        let mut budget = Budget::default();

        debug!(
            "Scanning for devices (max retries {}, timeout {:?})",
            self.config.max_retries, self.config.timeout
        );

        while budget.spent() <= self.config.max_retries {
            let port = budget.next_port();
            let listener = match port {
                BroadcastPort::Legacy => &self.legacy,
                BroadcastPort::Modern => &self.modern,
            };

            let received = listener.recv_from(self.config.timeout).await;
            let Some((datagram, from)) = budget.take_datagram(port, received) else {
                continue;
            };

            let mut device = match parse_broadcast(&datagram, self.config.crc_check) {
                Ok(device) => device,
                Err(e) => {
                    warn!("Ignoring datagram from {}: {}", from, e);
                    budget.miss(port);
                    continue;
                }
            };

            if devices.contains_key(&device.ip) {
                trace!("Already known: {}", device.ip);
                budget.miss(port);
                continue;
            }

            budget.found(port);

            let is_v31 = device.protocol_version().ok() == Some(ProtocolVersion::V3_1);
            if self.config.status_poll && is_v31 {
                self.poll(&mut device).await;
            }

            info!("Found {}", device);
            devices.insert(device.ip.clone(), device);

            if self.config.max_devices.is_some_and(|max| devices.len() >= max) {
                debug!("Device limit reached");
                break;
            }
        }

        debug!("Scan finished with {} devices", devices.len());
        Ok(devices)
    }

    /// One status round trip without a key; v3.1 queries are plain JSON
    async fn poll(&self, device: &mut DiscoveredDevice) {
        let mut client = Device::new(device.gw_id.clone(), device.ip.clone(), b"")
            .with_port(self.config.poll_port)
            .with_timeout(self.config.timeout)
            .with_retry_limit(0);

        match client.query_status().await {
            Ok(response) => device.dps = response.dps().cloned(),
            Err(e) => {
                debug!("Status query of {} failed: {}", device.ip, e);
                device.poll_error = Some(POLL_ERROR.to_string());
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BroadcastPort {
    Legacy,
    Modern,
}

/// Failed reads per listener
#[derive(Debug, Default, PartialEq, Eq)]
struct Budget {
    legacy: u32,
    modern: u32,
}

impl Budget {
    fn spent(&self) -> u32 {
        self.legacy + self.modern
    }

    /// v3.1 on a tie
    fn next_port(&self) -> BroadcastPort {
        if self.legacy <= self.modern {
            BroadcastPort::Legacy
        } else {
            BroadcastPort::Modern
        }
    }

    fn counter(&mut self, port: BroadcastPort) -> &mut u32 {
        match port {
            BroadcastPort::Legacy => &mut self.legacy,
            BroadcastPort::Modern => &mut self.modern,
        }
    }

    fn miss(&mut self, port: BroadcastPort) {
        *self.counter(port) += 1;
    }

    fn found(&mut self, port: BroadcastPort) {
        let counter = self.counter(port);
        *counter = counter.saturating_sub(1);
    }

    /// Any receive failure is a missed read, never the end of the scan
    fn take_datagram(
        &mut self,
        port: BroadcastPort,
        received: std::result::Result<(BytesMut, SocketAddr), TransportError>,
    ) -> Option<(BytesMut, SocketAddr)> {
        match received {
            Ok(received) => Some(received),
            Err(TransportError::ReadTimeout) => {
                self.miss(port);
                None
            }
            Err(e) => {
                warn!("Receive on {:?} listener failed: {}", port, e);
                self.miss(port);
                None
            }
        }
    }
}

/// Discover devices with default settings
pub async fn scan() -> Result<HashMap<String, DiscoveredDevice>> {
    Scanner::new().scan().await
}

/// Decode one broadcast datagram
fn parse_broadcast(datagram: &[u8], check: CrcCheck) -> Result<DiscoveredDevice> {
    let frame = Frame::decode_response(datagram, check)?;

    let decrypted = crypto::decrypt_udp(&frame.payload)
        .ok()
        .and_then(|plain| serde_json::from_slice::<Value>(&plain).ok());

    let (body, encrypted) = match decrypted {
        Some(body) => (body, true),
        None => {
            let text = String::from_utf8_lossy(&frame.payload);
            let body = serde_json::from_str::<Value>(&text).map_err(tuyalink_core::Error::from)?;
            (body, false)
        }
    };

    Ok(DiscoveredDevice::from_broadcast(body, encrypted)?)
}
