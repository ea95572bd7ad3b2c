//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] tuyalink_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] tuyalink_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] tuyalink_types::Error),
}

impl Error {
    /// The transport gave up: retry budget spent or connect timed out
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_fatal(),
            _ => false,
        }
    }
}
