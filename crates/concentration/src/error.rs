//! Unified error type for the Concentration client.

use concentration_model::ModelError;
use concentration_notify::NotifyError;
use concentration_protocol::ProtocolError;
use concentration_transport::TransportError;

use crate::GatewayError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `concentration` crate you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates the `From` impls, so `?` converts
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ConcentrationError {
    /// A transport-level error (connect, send, receive, closed stream).
    /// Fatal to the session.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A line that could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The announced board could not be set up.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A notification could not be delivered.
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// A reveal request was rejected or could not be sent.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The server's first line was not a board announcement.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The listener task panicked or was cancelled.
    #[error("listener task failed: {0}")]
    Listener(#[from] tokio::task::JoinError),
}

impl ConcentrationError {
    /// `true` if the error came from the connection itself.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Gateway(GatewayError::Transport(_))
        )
    }
}
