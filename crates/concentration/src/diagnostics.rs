//! The diagnostic channel: things the user may want to hear about that are
//! not state changes.
//!
//! Notifications describe the board. Diagnostics describe everything else:
//! server `ERROR` lines, reveal requests rejected locally, lines that could
//! not be decoded. They go to a [`DiagnosticSink`], separate from the
//! subscriber fan-out.

use std::fmt;

use concentration_protocol::ProtocolError;
use tokio::sync::mpsc;

/// Something worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The server sent `ERROR <message>`.
    ServerError { message: String },
    /// A reveal request fell outside the board and was not sent.
    OutOfBounds { row: i64, col: i64, dimension: u32 },
    /// An inbound line could not be decoded and was skipped.
    Malformed(ProtocolError),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerError { message } => write!(f, "server error: {message}"),
            Self::OutOfBounds {
                row,
                col,
                dimension,
            } => write!(
                f,
                "({row}, {col}) is outside the {dimension}x{dimension} board"
            ),
            Self::Malformed(e) => write!(f, "{e}"),
        }
    }
}

/// Receives diagnostics. Called from the listener task or from whichever
/// task issued a reveal request, so implementations must not block.
pub trait DiagnosticSink: Send + Sync + 'static {
    /// Handles one diagnostic.
    fn report(&self, diagnostic: Diagnostic);
}

/// Logs every diagnostic as a `tracing` warning. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::ServerError { message } => {
                tracing::warn!(%message, "server reported an error");
            }
            Diagnostic::OutOfBounds {
                row,
                col,
                dimension,
            } => {
                tracing::warn!(row, col, dimension, "reveal request out of bounds");
            }
            Diagnostic::Malformed(error) => {
                tracing::warn!(%error, "malformed line skipped");
            }
        }
    }
}

/// Forwards diagnostics over an unbounded channel, for front-ends that
/// want to show them.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<Diagnostic>,
}

impl ChannelSink {
    /// Creates a sink and the receiver its diagnostics arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Diagnostic>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl DiagnosticSink for ChannelSink {
    fn report(&self, diagnostic: Diagnostic) {
        if self.sender.send(diagnostic).is_err() {
            tracing::debug!("diagnostic receiver dropped");
        }
    }
}
