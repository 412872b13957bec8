/// Errors that can occur in the transport layer.
///
/// Everything except [`TransportError::LineTooLong`] is fatal to the session
/// that owns the connection; see [`TransportError::is_fatal`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The peer sent a line longer than the connection accepts. The rest
    /// of the line was discarded and the connection is still usable.
    #[error("line longer than {limit} bytes: {prefix:?}...")]
    LineTooLong { limit: usize, prefix: String },
}

impl TransportError {
    /// Whether the connection is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::LineTooLong { .. })
    }
}
