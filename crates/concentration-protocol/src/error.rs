//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. A
//! `ProtocolError` always means "this line of text is not a message we
//! understand", never a networking or game-state problem.

/// Errors that can occur while decoding a protocol line.
///
/// Both variants count as a malformed message: the listener logs them and
/// moves on to the next line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The opcode was recognised but the arguments don't fit its shape:
    /// wrong arity, a number that doesn't parse, a multi-character letter,
    /// or an empty line.
    #[error("malformed message {line:?}: {reason}")]
    MalformedMessage {
        /// The offending line, without its line terminator.
        line: String,
        /// Human-readable description of what was wrong.
        reason: String,
    },

    /// The first token of the line is not an opcode of this protocol.
    #[error("unknown opcode {0:?}")]
    UnknownOpcode(String),
}

impl ProtocolError {
    /// Shorthand for building a [`ProtocolError::MalformedMessage`].
    pub fn malformed(line: &str, reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            line: line.to_string(),
            reason: reason.into(),
        }
    }

    /// Every protocol error is a malformed line as far as the listener is
    /// concerned. Kept as a method so callers don't match on variants.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedMessage { .. } | Self::UnknownOpcode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_variants_are_malformed() {
        assert!(ProtocolError::malformed("CARD", "missing arguments").is_malformed());
        assert!(ProtocolError::UnknownOpcode("HELLO".into()).is_malformed());
    }

    #[test]
    fn test_display_includes_line_and_reason() {
        let err = ProtocolError::malformed("BOARD_DIM x", "dimension is not a number");
        assert_eq!(
            err.to_string(),
            "malformed message \"BOARD_DIM x\": dimension is not a number"
        );
    }
}
