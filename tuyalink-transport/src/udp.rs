//! UDP broadcast reception
//!
//! Devices announce themselves with periodic broadcasts on ports 6666
//! (v3.1, plain or obfuscated) and 6667 (v3.3, encrypted).

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use bytes::BytesMut;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, trace};
use tuyalink_core::constants::DISCOVERY_BUFFER_SIZE;

use crate::error::*;

/// Broadcast listener bound on all interfaces
pub struct UdpListener {
    socket: UdpSocket,
}

impl UdpListener {
    /// Bind on `0.0.0.0:port` with address reuse and broadcast enabled.
    /// Must be called from within a tokio runtime.
    pub fn bind(port: u16) -> Result<Self> {
        let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));

        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        #[cfg(unix)]
        socket.set_reuse_port(true)?;
        socket.set_broadcast(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&bind_addr.into())?;

        let socket = UdpSocket::from_std(socket.into())?;

        debug!("Listening for broadcasts on {}", socket.local_addr()?);

        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive one datagram (with timeout)
    pub async fn recv_from(&self, read_timeout: Duration) -> Result<(BytesMut, SocketAddr)> {
        let mut buf = BytesMut::zeroed(DISCOVERY_BUFFER_SIZE);

        let (n, from) = timeout(read_timeout, self.socket.recv_from(&mut buf))
            .await
            .map_err(|_| Error::ReadTimeout)?
            .map_err(Error::Io)?;

        buf.truncate(n);

        trace!("Received {} bytes from {}: {:02X?}", n, from, &buf[..n.min(32)]);

        Ok((buf, from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_udp_listener_receives_datagram() {
        let listener = UdpListener::bind(0).unwrap();
        let port = listener.local_addr().unwrap().port();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"announce", ("127.0.0.1", port)).await.unwrap();

        let (data, from) = listener.recv_from(Duration::from_secs(2)).await.unwrap();
        assert_eq!(&data[..], b"announce");
        assert_eq!(from, sender.local_addr().unwrap());
    }

    #[tokio::test]
    async fn test_udp_listener_timeout() {
        let listener = UdpListener::bind(0).unwrap();

        let result = listener.recv_from(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(Error::ReadTimeout)));
    }

    #[tokio::test]
    async fn test_udp_listener_shared_port() {
        let first = UdpListener::bind(0).unwrap();
        let port = first.local_addr().unwrap().port();

        // Address reuse lets a second scanner bind alongside
        #[cfg(unix)]
        assert!(UdpListener::bind(port).is_ok());
    }
}
