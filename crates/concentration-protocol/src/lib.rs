//! Wire protocol for the Concentration client.
//!
//! This crate defines the "language" spoken between a Concentration game
//! server and its clients:
//!
//! - **Types** ([`ServerMessage`], [`ClientMessage`], [`Cell`]): the
//!   messages that travel on the wire, one per line.
//! - **Codec** ([`Codec`] trait, [`TextCodec`]): how those messages are
//!   turned into text and back.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (lines of text) and the
//! game model. It knows nothing about connections or game rules.
//!
//! ```text
//! Transport (lines) → Protocol (ServerMessage) → Model (GameState)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, TextCodec};
pub use error::ProtocolError;
pub use types::{Cell, ClientMessage, ServerMessage, opcode};
