//! TCP transport
//!
//! Devices accept one command per connection on port 6668; the session layer
//! decides when a connection is reused.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, lookup_host};
use tracing::{debug, trace, warn};
use tuyalink_core::constants::{DEFAULT_PORT, DEFAULT_TIMEOUT, RECV_BUFFER_SIZE};

use crate::{Transport, error::*};

/// Socket options applied on every new connection
#[derive(Debug, Clone, Copy)]
pub struct TcpOptions {
    pub connect_timeout: Duration,
    pub nodelay: bool,
}

impl Default for TcpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_TIMEOUT),
            nodelay: true,
        }
    }
}

/// Stream connection to one device
pub struct TcpTransport {
    host: String,
    port: u16,
    resolved: Option<SocketAddr>,
    options: TcpOptions,
    conn: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            resolved: None,
            options: TcpOptions::default(),
            conn: None,
        }
    }

    /// Transport to the standard device port
    pub fn to_device(host: impl Into<String>) -> Self {
        Self::new(host, DEFAULT_PORT)
    }

    pub fn with_options(mut self, options: TcpOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.options.connect_timeout = connect_timeout;
        self
    }

    /// Disable Nagle's algorithm (default: on)
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.options.nodelay = nodelay;
        self
    }

    // Setters below take effect on the next connection

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
        self.resolved = None;
    }

    pub fn set_connect_timeout(&mut self, connect_timeout: Duration) {
        self.options.connect_timeout = connect_timeout;
    }

    pub fn set_nodelay(&mut self, nodelay: bool) {
        self.options.nodelay = nodelay;
    }

    pub fn options(&self) -> TcpOptions {
        self.options
    }

    async fn target(&mut self) -> Result<SocketAddr> {
        match self.resolved {
            Some(addr) => Ok(addr),
            None => {
                let addr = resolve_ipv4(&self.host, self.port).await?;
                self.resolved = Some(addr);
                Ok(addr)
            }
        }
    }
}

/// First IPv4 address of `host:port`
async fn resolve_ipv4(host: &str, port: u16) -> Result<SocketAddr> {
    let target = format!("{host}:{port}");

    lookup_host(target.as_str())
        .await
        .map_err(|e| Error::InvalidAddress(format!("{target}: {e}")))?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| Error::InvalidAddress(format!("{target}: no IPv4 address")))
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Err(Error::AlreadyConnected);
        }

        let target = self.target().await?;
        trace!("Opening TCP connection to {}", target);

        let conn = tokio::time::timeout(self.options.connect_timeout, TcpStream::connect(target))
            .await
            .map_err(|_| Error::ConnectionTimeout)??;
        conn.set_nodelay(self.options.nodelay)?;

        debug!(nodelay = self.options.nodelay, "TCP connection to {} open", target);
        self.conn = Some(conn);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };

        debug!("Closing TCP connection to {}", self.remote_addr());
        if let Err(e) = conn.shutdown().await {
            trace!("Shutdown of {} failed: {}", self.remote_addr(), e);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(Error::NotConnected);
        };

        trace!("TX {} bytes: {:02X?}", data.len(), &data[..data.len().min(32)]);
        conn.write_all(data).await?;
        conn.flush().await?;
        Ok(())
    }

    async fn receive(&mut self, read_timeout: Duration) -> Result<BytesMut> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(Error::NotConnected);
        };

        let mut buf = BytesMut::with_capacity(RECV_BUFFER_SIZE);
        let read = tokio::time::timeout(read_timeout, conn.read_buf(&mut buf))
            .await
            .map_err(|_| Error::ReadTimeout)??;

        if read == 0 {
            return Err(Error::ConnectionClosed);
        }

        trace!("RX {} bytes: {:02X?}", read, &buf[..read.min(32)]);
        Ok(buf)
    }

    fn remote_addr(&self) -> String {
        match self.resolved {
            Some(addr) => addr.to_string(),
            None => format!("{}:{}", self.host, self.port),
        }
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.conn.is_some() {
            warn!("Dropping open TCP connection to {}", self.remote_addr());
        }
    }
}
