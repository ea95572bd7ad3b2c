//! Request/response sessions over a transport
//!
//! A session owns one transport and performs the connect, write, read and
//! close sequence of a single exchange, retrying failed attempts.

use std::time::Duration;

use bytes::BytesMut;
use tokio::time::sleep;
use tracing::{debug, trace, warn};
use tuyalink_core::constants::{
    DEFAULT_TIMEOUT, MAX_RETRIES, RETRY_BACKOFF_MS, SHORT_READ_THRESHOLD,
};

use crate::{Transport, TcpTransport, error::*, retry::RetryState};

/// Connection state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Retrying exchange of frames with one device
pub struct TransportSession<T: Transport = TcpTransport> {
    transport: T,
    retry_limit: u32,
    persistent: bool,
    retry_short_reads: bool,
    backoff: Duration,
    read_timeout: Duration,
}

impl<T: Transport> TransportSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            retry_limit: MAX_RETRIES,
            persistent: false,
            retry_short_reads: true,
            backoff: Duration::from_millis(RETRY_BACKOFF_MS),
            read_timeout: Duration::from_secs(DEFAULT_TIMEOUT),
        }
    }

    /// Retries after the first failed attempt (default: 5)
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Keep the socket open between exchanges (default: off)
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Read once more when a reply is suspiciously short (default: on)
    pub fn with_short_read_retry(mut self, enabled: bool) -> Self {
        self.retry_short_reads = enabled;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn set_retry_limit(&mut self, retry_limit: u32) {
        self.retry_limit = retry_limit;
    }

    pub fn set_persistent(&mut self, persistent: bool) {
        self.persistent = persistent;
    }

    pub fn set_short_read_retry(&mut self, enabled: bool) {
        self.retry_short_reads = enabled;
    }

    pub fn set_backoff(&mut self, backoff: Duration) {
        self.backoff = backoff;
    }

    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn state(&self) -> ConnectionState {
        if self.transport.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Connect unless already connected; `force_renew` drops the current
    /// connection first
    pub async fn ensure_connected(&mut self, force_renew: bool) -> Result<()> {
        if force_renew && self.transport.is_connected() {
            debug!("Renewing connection to {}", self.transport.remote_addr());
            self.transport.disconnect().await?;
        }

        if !self.transport.is_connected() {
            self.transport.connect().await?;
        }

        Ok(())
    }

    /// Send one frame and return the raw reply
    pub async fn send_receive(&mut self, frame: &[u8]) -> Result<BytesMut> {
        let mut state = RetryState::new();
        let mut force_renew = false;

        loop {
            match self.attempt(frame, force_renew).await {
                Ok(data) => {
                    if !self.persistent {
                        self.close().await?;
                    }
                    return Ok(data);
                }
                Err(e) => {
                    debug!(
                        "Exchange with {} failed: {} (attempt {}, retry limit {})",
                        self.transport.remote_addr(),
                        e,
                        state.attempt_count() + 1,
                        self.retry_limit
                    );
                    state.record_failure(e);

                    if state.is_exhausted(self.retry_limit) {
                        let _ = self.close().await;
                        warn!(
                            "Giving up on {} after {} retries",
                            self.transport.remote_addr(),
                            state.retries()
                        );
                        return Err(state.into_error());
                    }

                    force_renew = true;
                    sleep(self.backoff).await;
                }
            }
        }
    }

    /// Close the connection if open
    pub async fn close(&mut self) -> Result<()> {
        if self.transport.is_connected() {
            self.transport.disconnect().await?;
        }
        Ok(())
    }

    async fn attempt(&mut self, frame: &[u8], force_renew: bool) -> Result<BytesMut> {
        self.ensure_connected(force_renew).await?;
        self.transport.send(frame).await?;

        let mut data = self.transport.receive(self.read_timeout).await?;

        if self.retry_short_reads && data.len() < SHORT_READ_THRESHOLD {
            trace!("Short read of {} bytes, reading again", data.len());
            sleep(self.backoff).await;

            match self.transport.receive(self.read_timeout).await {
                Ok(more) => data = more,
                Err(Error::ReadTimeout | Error::ConnectionClosed) => {
                    trace!("No supplementary data, keeping first read");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(data)
    }
}
