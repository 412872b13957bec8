//! Transport abstraction layer for the Concentration client.
//!
//! Provides the [`Connection`] trait: a duplex, line-oriented channel to the
//! game server. The client core only needs line-buffered reads and
//! flush-on-write; how the lines travel is up to the implementation.
//!
//! - [`StreamConnection`]: newline-delimited text over any
//!   `AsyncRead`/`AsyncWrite` pair ([`TcpConnection`] for TCP sockets).
//! - [`WebSocketConnection`]: text frames, each holding one or more lines.
//!
//! Bytes that are not valid UTF-8 are replaced with U+FFFD, so a garbled
//! line still arrives and can be rejected by the protocol layer.
//!
//! The read half and the write half of every connection are locked
//! independently, so one task can block in [`Connection::recv_line`] while
//! another sends.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

mod error;
mod stream;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use stream::{StreamConnection, TcpConnection};
#[cfg(feature = "websocket")]
pub use websocket::WebSocketConnection;

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default longest accepted line, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-unique id.
    pub(crate) fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A single duplex connection that carries lines of text.
///
/// The returned futures are `Send` so a connection can be driven from a
/// spawned Tokio task.
pub trait Connection: Send + Sync + 'static {
    /// Sends one line to the remote peer and flushes it.
    ///
    /// `line` must not contain a line terminator; the transport adds its
    /// own framing.
    fn send_line(
        &self,
        line: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next line from the remote peer, without its
    /// terminator.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed. A
    /// non-fatal error (see [`TransportError::is_fatal`]) leaves the
    /// connection ready for the next call.
    fn recv_line(
        &self,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;

    /// Closes the sending side of the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

/// Turns raw line bytes into text, replacing invalid UTF-8 and dropping
/// the terminator.
pub(crate) fn decode_line(bytes: &[u8]) -> String {
    let mut line = String::from_utf8_lossy(bytes).into_owned();
    strip_terminator(&mut line);
    line
}

/// Strips any trailing `\r`/`\n` left by line readers or CRLF peers.
pub(crate) fn strip_terminator(line: &mut String) {
    while line.ends_with(['\n', '\r']) {
        line.pop();
    }
}
