//! Message types for the Concentration wire protocol.
//!
//! Every message is a single line of space-separated fields. The first
//! field is the opcode; the rest are its arguments:
//!
//! ```text
//! server → client            client → server
//! BOARD_DIM <n>              REVEAL <row> <col>
//! CARD <row> <col> <letter>
//! MATCH <r1> <c1> <r2> <c2>
//! MISMATCH <r1> <c1> <r2> <c2>
//! ERROR <free text>
//! GAME_OVER
//! ```
//!
//! Each type implements `Display` to produce its line and `FromStr` to
//! parse one, so both ends of a connection can share the same code.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Opcode tokens, exactly as they appear on the wire.
pub mod opcode {
    /// Server announces the board side length.
    pub const BOARD_DIM: &str = "BOARD_DIM";
    /// Server reveals the letter under a card.
    pub const CARD: &str = "CARD";
    /// Server confirms two revealed cards match.
    pub const MATCH: &str = "MATCH";
    /// Server reports two revealed cards don't match.
    pub const MISMATCH: &str = "MISMATCH";
    /// Server reports an application-level error.
    pub const ERROR: &str = "ERROR";
    /// Server ends the game.
    pub const GAME_OVER: &str = "GAME_OVER";
    /// Client asks to turn a card over.
    pub const REVEAL: &str = "REVEAL";
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A board coordinate. Rows and columns are zero-based.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Cell {
    /// Zero-based row.
    pub row: u32,
    /// Zero-based column.
    pub col: u32,
}

impl Cell {
    /// Creates a cell at `(row, col)`.
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

// ---------------------------------------------------------------------------
// ServerMessage
// ---------------------------------------------------------------------------

/// A message sent by the game server.
///
/// `#[serde(tag = "type")]` gives the internally tagged JSON shape, e.g.
/// `{ "type": "CardRevealed", "cell": { "row": 0, "col": 1 }, "letter": "A" }`,
/// for presentation layers that want to forward events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// `BOARD_DIM <n>`: the board is `n` × `n` cards.
    BoardAnnounced { dimension: u32 },

    /// `CARD <row> <col> <letter>`: the card at `cell` shows `letter`.
    CardRevealed { cell: Cell, letter: char },

    /// `MATCH <r1> <c1> <r2> <c2>`: the two cells are a confirmed pair.
    Matched { first: Cell, second: Cell },

    /// `MISMATCH <r1> <c1> <r2> <c2>`: the two cells turn face-down again.
    Mismatched { first: Cell, second: Cell },

    /// `ERROR <text>`: the server rejected something. The text is the rest
    /// of the line and may be empty.
    ServerError { message: String },

    /// `GAME_OVER`: no further moves will be accepted.
    GameEnded,
}

impl ServerMessage {
    /// The opcode this message is sent with.
    pub fn opcode(&self) -> &'static str {
        match self {
            Self::BoardAnnounced { .. } => opcode::BOARD_DIM,
            Self::CardRevealed { .. } => opcode::CARD,
            Self::Matched { .. } => opcode::MATCH,
            Self::Mismatched { .. } => opcode::MISMATCH,
            Self::ServerError { .. } => opcode::ERROR,
            Self::GameEnded => opcode::GAME_OVER,
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.opcode();
        match self {
            Self::BoardAnnounced { dimension } => write!(f, "{op} {dimension}"),
            Self::CardRevealed { cell, letter } => {
                write!(f, "{op} {} {} {letter}", cell.row, cell.col)
            }
            Self::Matched { first, second } | Self::Mismatched { first, second } => {
                write!(
                    f,
                    "{op} {} {} {} {}",
                    first.row, first.col, second.row, second.col
                )
            }
            Self::ServerError { message } if message.is_empty() => f.write_str(op),
            Self::ServerError { message } => write!(f, "{op} {message}"),
            Self::GameEnded => f.write_str(op),
        }
    }
}

impl FromStr for ServerMessage {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (op, rest) = split_opcode(line)?;

        match op {
            opcode::BOARD_DIM => {
                let args = arguments(line, rest, 1)?;
                Ok(Self::BoardAnnounced {
                    dimension: number(line, args[0], "dimension")?,
                })
            }
            opcode::CARD => {
                let args = arguments(line, rest, 3)?;
                Ok(Self::CardRevealed {
                    cell: cell(line, args[0], args[1])?,
                    letter: letter(line, args[2])?,
                })
            }
            opcode::MATCH => {
                let args = arguments(line, rest, 4)?;
                Ok(Self::Matched {
                    first: cell(line, args[0], args[1])?,
                    second: cell(line, args[2], args[3])?,
                })
            }
            opcode::MISMATCH => {
                let args = arguments(line, rest, 4)?;
                Ok(Self::Mismatched {
                    first: cell(line, args[0], args[1])?,
                    second: cell(line, args[2], args[3])?,
                })
            }
            // Everything after the opcode is free text, spaces included.
            opcode::ERROR => Ok(Self::ServerError {
                message: rest.unwrap_or_default().to_string(),
            }),
            opcode::GAME_OVER => {
                arguments(line, rest, 0)?;
                Ok(Self::GameEnded)
            }
            other => Err(ProtocolError::UnknownOpcode(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ClientMessage
// ---------------------------------------------------------------------------

/// A message sent by this client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// `REVEAL <row> <col>`: turn the card at `cell` face-up.
    Reveal { cell: Cell },
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reveal { cell } => {
                write!(f, "{} {} {}", opcode::REVEAL, cell.row, cell.col)
            }
        }
    }
}

impl FromStr for ClientMessage {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (op, rest) = split_opcode(line)?;

        match op {
            opcode::REVEAL => {
                let args = arguments(line, rest, 2)?;
                Ok(Self::Reveal {
                    cell: cell(line, args[0], args[1])?,
                })
            }
            other => Err(ProtocolError::UnknownOpcode(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tokenizing helpers
// ---------------------------------------------------------------------------

/// Splits a line into its opcode and the (optional) remainder after the
/// first space.
fn split_opcode(line: &str) -> Result<(&str, Option<&str>), ProtocolError> {
    if line.is_empty() {
        return Err(ProtocolError::malformed(line, "empty line"));
    }
    Ok(match line.split_once(' ') {
        Some((op, rest)) => (op, Some(rest)),
        None => (line, None),
    })
}

/// Splits the remainder on single spaces and checks the argument count.
///
/// Runs of spaces produce empty tokens, which then fail numeric parsing;
/// the protocol uses exactly one space between fields.
fn arguments<'a>(
    line: &str,
    rest: Option<&'a str>,
    expected: usize,
) -> Result<Vec<&'a str>, ProtocolError> {
    let args: Vec<&str> = rest.map(|r| r.split(' ').collect()).unwrap_or_default();
    if args.len() != expected {
        return Err(ProtocolError::malformed(
            line,
            format!("expected {expected} argument(s), got {}", args.len()),
        ));
    }
    Ok(args)
}

fn number(line: &str, token: &str, what: &str) -> Result<u32, ProtocolError> {
    token
        .parse()
        .map_err(|_| ProtocolError::malformed(line, format!("{what} {token:?} is not a number")))
}

fn cell(line: &str, row: &str, col: &str) -> Result<Cell, ProtocolError> {
    Ok(Cell::new(number(line, row, "row")?, number(line, col, "column")?))
}

fn letter(line: &str, token: &str) -> Result<char, ProtocolError> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        // U+FFFD stands in for bytes that were not UTF-8.
        (Some(char::REPLACEMENT_CHARACTER), None) => Err(ProtocolError::malformed(
            line,
            "letter was not valid UTF-8",
        )),
        (Some(c), None) => Ok(c),
        _ => Err(ProtocolError::malformed(
            line,
            format!("letter {token:?} must be a single character"),
        )),
    }
}

// =========================================================================
// Tests
// =========================================================================
