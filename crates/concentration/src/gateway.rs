//! Outbound reveal requests.

use std::sync::Arc;

use concentration_protocol::{Cell, ClientMessage, Codec, TextCodec};
use concentration_transport::{Connection, TransportError};

use crate::{Diagnostic, DiagnosticSink};

/// Errors returned by [`RevealGateway::request_reveal`].
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The coordinates are not on the board. Nothing was sent.
    #[error("({row}, {col}) is out of bounds for a {dimension}x{dimension} board")]
    OutOfBounds { row: i64, col: i64, dimension: u32 },

    /// The request could not be written to the connection.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Validates reveal requests and writes them to the server.
///
/// Cheap to clone; every clone writes to the same connection. Requests are
/// advisory: the server decides what a reveal of an already face-up card
/// means.
pub struct RevealGateway<C: Connection> {
    conn: Arc<C>,
    dimension: u32,
    codec: TextCodec,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl<C: Connection> Clone for RevealGateway<C> {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            dimension: self.dimension,
            codec: self.codec,
            diagnostics: Arc::clone(&self.diagnostics),
        }
    }
}

impl<C: Connection> RevealGateway<C> {
    pub(crate) fn new(
        conn: Arc<C>,
        dimension: u32,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            conn,
            dimension,
            codec: TextCodec,
            diagnostics,
        }
    }

    /// Board side length the gateway validates against.
    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    /// Asks the server to turn over the card at `(row, col)`.
    ///
    /// Coordinates are signed so raw user input can be passed in; anything
    /// outside `0..dimension` is rejected locally, reported to the
    /// diagnostic sink, and never reaches the connection.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::OutOfBounds`] for coordinates off the board
    /// - [`GatewayError::Transport`] if the write fails
    pub async fn request_reveal(&self, row: i64, col: i64) -> Result<(), GatewayError> {
        let Some(cell) = self.cell(row, col) else {
            self.diagnostics.report(Diagnostic::OutOfBounds {
                row,
                col,
                dimension: self.dimension,
            });
            return Err(GatewayError::OutOfBounds {
                row,
                col,
                dimension: self.dimension,
            });
        };

        let line = self.codec.encode(&ClientMessage::Reveal { cell });
        self.conn.send_line(&line).await?;
        tracing::debug!(conn_id = %self.conn.id(), %cell, "reveal requested");
        Ok(())
    }

    fn cell(&self, row: i64, col: i64) -> Option<Cell> {
        let row = u32::try_from(row).ok().filter(|r| *r < self.dimension)?;
        let col = u32::try_from(col).ok().filter(|c| *c < self.dimension)?;
        Some(Cell::new(row, col))
    }
}

impl<C: Connection> std::fmt::Debug for RevealGateway<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealGateway")
            .field("conn_id", &self.conn.id())
            .field("dimension", &self.dimension)
            .finish()
    }
}
