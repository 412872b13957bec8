//! Codec trait and the text implementation used on the wire.
//!
//! A codec converts between typed messages and the text that travels on
//! the connection. The rest of the client only depends on the [`Codec`]
//! trait, so a test double or a different framing can be swapped in
//! without touching the listener or the gateway.
//!
//! Message types carry their own wire shape through `Display` (encode) and
//! `FromStr` (decode). The codec is the seam that calls them.

use std::fmt::Display;
use std::str::FromStr;

use crate::ProtocolError;

/// A codec that can encode messages to a single line of text and decode a
/// line back into a message.
///
/// `Send + Sync + 'static` because a codec is shared between the listener
/// task and whichever task issues reveal requests.
pub trait Codec: Send + Sync + 'static {
    /// Formats a message as one protocol line, without a line terminator.
    fn encode<T: Display>(&self, value: &T) -> String;

    /// Parses one protocol line into a message.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the line doesn't match any shape the
    /// target type accepts.
    fn decode<T>(&self, line: &str) -> Result<T, ProtocolError>
    where
        T: FromStr<Err = ProtocolError>;
}

// ---------------------------------------------------------------------------
// TextCodec
// ---------------------------------------------------------------------------

/// The [`Codec`] for the space-separated text protocol.
///
/// ## Example
///
/// ```rust
/// use concentration_protocol::{Cell, ClientMessage, Codec, TextCodec};
///
/// let codec = TextCodec;
///
/// let line = codec.encode(&ClientMessage::Reveal { cell: Cell::new(2, 3) });
/// assert_eq!(line, "REVEAL 2 3");
///
/// let decoded: ClientMessage = codec.decode(&line).unwrap();
/// assert_eq!(decoded, ClientMessage::Reveal { cell: Cell::new(2, 3) });
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Codec for TextCodec {
    fn encode<T: Display>(&self, value: &T) -> String {
        value.to_string()
    }

    fn decode<T>(&self, line: &str) -> Result<T, ProtocolError>
    where
        T: FromStr<Err = ProtocolError>,
    {
        // Peers may terminate lines with CRLF. Neither byte is part of the
        // message.
        line.trim_end_matches(['\r', '\n']).parse()
    }
}
