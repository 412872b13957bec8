//! State-change notifications and read-only snapshots.
//!
//! Presentation layers never touch [`GameState`](crate::GameState)
//! directly. They get a [`Notification`] for every visible change, each
//! carrying a [`StateSnapshot`] of the counters at that moment.

use std::fmt;

use concentration_protocol::Cell;
use serde::{Deserialize, Serialize};

use crate::AssetId;

/// What happened to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// The board was announced; lay out a `dimension` × `dimension` grid.
    BoardCreate { dimension: u32 },
    /// A card turned face-up.
    Revealed,
    /// A card is part of a confirmed pair and stays face-up.
    Matched,
    /// A card returns to face-down after a mismatch.
    NotMatched,
    /// The game ended.
    GameOver,
}

/// One state change, ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// The affected card. `None` for board-wide changes
    /// ([`NotificationKind::BoardCreate`], [`NotificationKind::GameOver`]).
    pub cell: Option<Cell>,
    /// What happened.
    pub kind: NotificationKind,
    /// The asset to show on `cell`. For [`NotificationKind::NotMatched`]
    /// this is the face-down asset; `None` when the revealed letter has no
    /// assigned asset or the change is board-wide.
    pub asset: Option<AssetId>,
    /// Counters after the event that produced this notification.
    pub snapshot: StateSnapshot,
}

/// An immutable view of the game counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Board side length. Zero before the board is announced.
    pub dimension: u32,
    /// Single-card reveals so far.
    pub moves: u64,
    /// Confirmed pairs so far.
    pub matches: u64,
    /// `true` once the server has ended the game.
    pub terminal: bool,
    /// The most recently revealed asset (the face-down asset after a
    /// mismatch).
    pub revealed_asset: Option<AssetId>,
}

impl StateSnapshot {
    /// Pairs on the board that are not yet matched.
    pub fn pairs_remaining(&self) -> u64 {
        let pairs = u64::from(self.dimension) * u64::from(self.dimension) / 2;
        pairs.saturating_sub(self.matches)
    }
}

impl fmt::Display for StateSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.terminal { "GAME_OVER" } else { "OK" };
        write!(f, "Moves: {}  Matches: {}  {status}", self.moves, self.matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_is_empty() {
        let snap = StateSnapshot::default();
        assert_eq!(snap.dimension, 0);
        assert_eq!(snap.moves, 0);
        assert_eq!(snap.matches, 0);
        assert!(!snap.terminal);
        assert!(snap.revealed_asset.is_none());
    }

    #[test]
    fn test_pairs_remaining() {
        let snap = StateSnapshot {
            dimension: 4,
            matches: 3,
            ..StateSnapshot::default()
        };
        assert_eq!(snap.pairs_remaining(), 5);
    }

    #[test]
    fn test_snapshot_display() {
        let mut snap = StateSnapshot {
            dimension: 2,
            moves: 4,
            matches: 1,
            ..StateSnapshot::default()
        };
        assert_eq!(snap.to_string(), "Moves: 4  Matches: 1  OK");
        snap.terminal = true;
        assert_eq!(snap.to_string(), "Moves: 4  Matches: 1  GAME_OVER");
    }

    #[test]
    fn test_notification_json_shape() {
        let n = Notification {
            cell: Some(Cell::new(1, 2)),
            kind: NotificationKind::Revealed,
            asset: Some(AssetId::new("cat.png")),
            snapshot: StateSnapshot::default(),
        };
        let json: serde_json::Value = serde_json::to_value(&n).unwrap();
        assert_eq!(json["cell"]["row"], 1);
        assert_eq!(json["kind"], "Revealed");
        assert_eq!(json["asset"], "cat.png");
    }
}
