//! Error types for the model layer.

/// Errors that can occur while building a [`GameState`](crate::GameState).
///
/// All of them come from the board announcement: once a state exists,
/// applying events never fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// The announced dimension is zero or odd, so the cards can't be
    /// split into pairs.
    #[error("board dimension {0} must be even and positive")]
    InvalidDimension(u32),

    /// The asset resolver supplied fewer assets than there are pairs.
    #[error("board needs {needed} assets but only {available} are available")]
    InsufficientAssets { needed: usize, available: usize },
}
