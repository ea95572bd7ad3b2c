//! Transport layer for the Tuya LAN protocol
//!
//! Provides TCP sessions with devices and UDP broadcast reception.

pub mod error;
pub mod retry;
pub mod session;
pub mod tcp;
pub mod udp;

pub use error::{Error, Result};
pub use retry::RetryState;
pub use session::{ConnectionState, TransportSession};
pub use tcp::{TcpOptions, TcpTransport};
pub use udp::UdpListener;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Transport trait for stream connections to a device
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the connection
    async fn connect(&mut self) -> Result<()>;

    /// Close the connection; a no-op when already closed
    async fn disconnect(&mut self) -> Result<()>;

    /// Whether a connection is open
    fn is_connected(&self) -> bool;

    /// Write one encoded frame
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive one read worth of bytes (with timeout)
    async fn receive(&mut self, timeout: Duration) -> Result<BytesMut>;

    /// Peer address for logging
    fn remote_addr(&self) -> String;
}
