use thiserror::Error;

/// Failures talking to the authority
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server address did not resolve")]
    NoAddress,
    #[error("not connected")]
    NotConnected,
    #[error("failed to encode message: {0}")]
    Encode(#[from] bincode::Error),
}
