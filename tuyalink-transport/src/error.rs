//! Transport errors

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Read timeout")]
    ReadTimeout,

    #[error("Connection closed by remote")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Retry limit exceeded after {retries} retries: {last_error}")]
    RetryLimitExceeded {
        retries: u32,
        #[source]
        last_error: Box<Error>,
    },
}

impl Error {
    /// Check if the error ends the call chain (no caller retries it)
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RetryLimitExceeded { .. } | Self::ConnectionTimeout)
    }
}
