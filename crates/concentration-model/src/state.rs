//! The local mirror of the server's game.
//!
//! [`GameState`] is a plain synchronous value: [`GameState::apply`] takes one
//! decoded [`ServerMessage`] and returns what changed. It does no I/O and
//! never delivers anything itself, so the listener loop stays its only
//! writer and tests can drive it line by line.

use std::collections::HashMap;

use concentration_protocol::{Cell, ServerMessage};

use crate::assets::{AssetId, AssetResolver, LetterAssignment};
use crate::notification::{Notification, NotificationKind, StateSnapshot};
use crate::ModelError;

/// The outcome of applying one server message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// State changed; deliver these notifications in order.
    Changed(Vec<Notification>),
    /// An `ERROR` line. Nothing changed; the text goes to the diagnostic
    /// sink.
    Diagnostic(String),
    /// The message had no effect.
    Ignored(&'static str),
}

/// Game state for one session.
///
/// Created from the board announcement, mutated only through
/// [`apply`](Self::apply).
#[derive(Debug, Clone)]
pub struct GameState {
    dimension: u32,
    letters: LetterAssignment,
    face_down: AssetId,
    face_up: HashMap<Cell, AssetId>,
    revealed_asset: Option<AssetId>,
    moves: u64,
    matches: u64,
    terminal: bool,
}

impl GameState {
    /// Builds the state for a `dimension` × `dimension` board and assigns
    /// one asset per letter from `resolver`.
    ///
    /// `face_down` is the asset shown on hidden cards; it is never handed
    /// to a letter.
    ///
    /// # Errors
    ///
    /// - [`ModelError::InvalidDimension`] for zero or odd dimensions
    /// - [`ModelError::InsufficientAssets`] if the resolver runs short
    pub fn new<R>(dimension: u32, resolver: &R, face_down: AssetId) -> Result<Self, ModelError>
    where
        R: AssetResolver + ?Sized,
    {
        if dimension == 0 || dimension % 2 != 0 {
            return Err(ModelError::InvalidDimension(dimension));
        }
        // In u64 so that n * n can't overflow.
        let pairs = u64::from(dimension) * u64::from(dimension) / 2;
        let pairs = usize::try_from(pairs).unwrap_or(usize::MAX);
        let letters = LetterAssignment::build(pairs, resolver.assets(), &face_down)?;
        tracing::debug!(dimension, pairs, "letter assignment built");

        Ok(Self {
            dimension,
            letters,
            face_down,
            face_up: HashMap::new(),
            revealed_asset: None,
            moves: 0,
            matches: 0,
            terminal: false,
        })
    }

    /// The board-creation notification for this state. Emitted once, before
    /// any message is applied.
    pub fn board_created(&self) -> Notification {
        Notification {
            cell: None,
            kind: NotificationKind::BoardCreate {
                dimension: self.dimension,
            },
            asset: None,
            snapshot: self.snapshot(),
        }
    }

    /// Applies one server message.
    ///
    /// Never fails: anything that cannot be applied comes back as
    /// [`Applied::Ignored`] and is logged.
    pub fn apply(&mut self, message: &ServerMessage) -> Applied {
        if self.terminal {
            tracing::warn!(opcode = message.opcode(), "message after game over ignored");
            return Applied::Ignored("game is over");
        }

        match message {
            ServerMessage::BoardAnnounced { dimension } => {
                tracing::warn!(
                    dimension,
                    current = self.dimension,
                    "repeated board announcement ignored"
                );
                Applied::Ignored("board already announced")
            }
            ServerMessage::CardRevealed { cell, letter } => self.reveal(*cell, *letter),
            ServerMessage::Matched { first, second } => {
                self.matches += 1;
                tracing::debug!(%first, %second, matches = self.matches, "pair matched");
                Applied::Changed(vec![
                    self.cell_notification(*first, NotificationKind::Matched),
                    self.cell_notification(*second, NotificationKind::Matched),
                ])
            }
            ServerMessage::Mismatched { first, second } => {
                self.face_up.remove(first);
                self.face_up.remove(second);
                self.revealed_asset = Some(self.face_down.clone());
                tracing::debug!(%first, %second, "pair mismatched");
                Applied::Changed(vec![
                    self.hidden_notification(*first),
                    self.hidden_notification(*second),
                ])
            }
            ServerMessage::ServerError { message } => Applied::Diagnostic(message.clone()),
            ServerMessage::GameEnded => {
                self.terminal = true;
                tracing::debug!(moves = self.moves, matches = self.matches, "game ended");
                Applied::Changed(vec![Notification {
                    cell: None,
                    kind: NotificationKind::GameOver,
                    asset: None,
                    snapshot: self.snapshot(),
                }])
            }
        }
    }

    fn reveal(&mut self, cell: Cell, letter: char) -> Applied {
        match self.letters.get(letter).cloned() {
            Some(asset) => {
                self.face_up.insert(cell, asset.clone());
                self.revealed_asset = Some(asset);
            }
            // The move still counts; the server saw a reveal even if we
            // can't draw it.
            None => tracing::warn!(%cell, %letter, "revealed letter has no assigned asset"),
        }
        self.moves += 1;
        tracing::debug!(%cell, %letter, moves = self.moves, "card revealed");
        Applied::Changed(vec![self.cell_notification(cell, NotificationKind::Revealed)])
    }

    fn cell_notification(&self, cell: Cell, kind: NotificationKind) -> Notification {
        Notification {
            cell: Some(cell),
            kind,
            asset: self.face_up.get(&cell).cloned(),
            snapshot: self.snapshot(),
        }
    }

    fn hidden_notification(&self, cell: Cell) -> Notification {
        Notification {
            cell: Some(cell),
            kind: NotificationKind::NotMatched,
            asset: Some(self.face_down.clone()),
            snapshot: self.snapshot(),
        }
    }

    /// A read-only copy of the counters.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            dimension: self.dimension,
            moves: self.moves,
            matches: self.matches,
            terminal: self.terminal,
            revealed_asset: self.revealed_asset.clone(),
        }
    }

    /// Board side length.
    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    /// `true` if `(row, col)` lies on the board. Takes signed values so
    /// unchecked user input can be passed straight in.
    pub fn contains(&self, row: i64, col: i64) -> bool {
        let dim = i64::from(self.dimension);
        (0..dim).contains(&row) && (0..dim).contains(&col)
    }

    /// The letter-to-asset mapping for this game.
    pub fn letters(&self) -> &LetterAssignment {
        &self.letters
    }

    /// The asset shown on hidden cards.
    pub fn face_down(&self) -> &AssetId {
        &self.face_down
    }

    /// The asset currently shown face-up on `cell`, if any.
    pub fn face_up(&self, cell: Cell) -> Option<&AssetId> {
        self.face_up.get(&cell)
    }

    /// Number of single-card reveals applied.
    pub fn moves(&self) -> u64 {
        self.moves
    }

    /// Number of confirmed pairs.
    pub fn matches(&self) -> u64 {
        self.matches
    }

    /// `true` once `GAME_OVER` has been applied.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{DEFAULT_FACE_DOWN, StaticAssets};

    fn face_down() -> AssetId {
        AssetId::new(DEFAULT_FACE_DOWN)
    }

    fn state(dimension: u32) -> GameState {
        let assets = StaticAssets::numbered(200);
        GameState::new(dimension, &assets, face_down()).unwrap()
    }

    fn apply_line(state: &mut GameState, line: &str) -> Applied {
        state.apply(&line.parse().unwrap())
    }

    fn changed(applied: Applied) -> Vec<Notification> {
        match applied {
            Applied::Changed(notes) => notes,
            other => panic!("expected Changed, got {other:?}"),
        }
    }

    // =========================================================================
    // Construction
    // =========================================================================

    #[test]
    fn test_new_rejects_zero_and_odd_dimensions() {
        let assets = StaticAssets::numbered(10);
        for dim in [0, 1, 3, 5] {
            let err = GameState::new(dim, &assets, face_down()).unwrap_err();
            assert_eq!(err, ModelError::InvalidDimension(dim));
        }
    }

    #[test]
    fn test_large_boards_are_limited_only_by_assets() {
        let s = GameState::new(12, &StaticAssets::numbered(72), face_down()).unwrap();
        assert_eq!(s.letters().len(), 72);

        let err = GameState::new(40, &StaticAssets::numbered(200), face_down()).unwrap_err();
        assert_eq!(
            err,
            ModelError::InsufficientAssets {
                needed: 800,
                available: 200
            }
        );
    }

    #[test]
    fn test_huge_dimension_does_not_overflow() {
        let err = GameState::new(u32::MAX - 1, &StaticAssets::numbered(4), face_down()).unwrap_err();
        assert!(matches!(err, ModelError::InsufficientAssets { available: 4, .. }));
    }

    #[test]
    fn test_new_rejects_short_asset_list() {
        let assets = StaticAssets::numbered(7);
        let err = GameState::new(4, &assets, face_down()).unwrap_err();
        assert_eq!(
            err,
            ModelError::InsufficientAssets {
                needed: 8,
                available: 7
            }
        );
    }

    #[test]
    fn test_every_supported_dimension_gets_half_as_many_letters() {
        for dim in (2..=20).step_by(2) {
            let s = state(dim);
            assert_eq!(s.dimension(), dim);
            assert_eq!(s.letters().len(), (dim * dim / 2) as usize);
            assert_eq!(s.snapshot(), StateSnapshot { dimension: dim, ..Default::default() });
        }
    }

    #[test]
    fn test_board_created_carries_dimension() {
        let note = state(4).board_created();
        assert_eq!(note.kind, NotificationKind::BoardCreate { dimension: 4 });
        assert!(note.cell.is_none());
        assert_eq!(note.snapshot.dimension, 4);
    }

    #[test]
    fn test_works_with_dyn_resolver() {
        let assets: Box<dyn AssetResolver> = Box::new(StaticAssets::numbered(2));
        let s = GameState::new(2, assets.as_ref(), face_down()).unwrap();
        assert_eq!(s.letters().len(), 2);
    }

    // =========================================================================
    // Applying messages
    // =========================================================================

    #[test]
    fn test_full_turn_scenario() {
        let mut s = state(4);
        let asset_a = s.letters().get('A').cloned();

        let notes = changed(apply_line(&mut s, "CARD 0 0 A"));
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].cell, Some(Cell::new(0, 0)));
        assert_eq!(notes[0].kind, NotificationKind::Revealed);
        assert_eq!(notes[0].asset, asset_a);
        assert_eq!(s.moves(), 1);

        changed(apply_line(&mut s, "CARD 1 1 A"));
        assert_eq!(s.moves(), 2);

        let notes = changed(apply_line(&mut s, "MATCH 0 0 1 1"));
        assert_eq!(s.matches(), 1);
        let cells: Vec<_> = notes.iter().map(|n| n.cell).collect();
        assert_eq!(cells, vec![Some(Cell::new(0, 0)), Some(Cell::new(1, 1))]);
        assert!(notes.iter().all(|n| n.kind == NotificationKind::Matched));
        assert!(notes.iter().all(|n| n.asset == asset_a));
        assert!(notes.iter().all(|n| n.snapshot.matches == 1));

        let notes = changed(apply_line(&mut s, "GAME_OVER"));
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::GameOver);
        assert!(notes[0].snapshot.terminal);

        assert!(s.is_terminal());
        assert_eq!(s.moves(), 2);
        assert_eq!(s.matches(), 1);
    }

    #[test]
    fn test_move_count_tracks_every_card_event() {
        let mut s = state(4);
        let lines = ["CARD 0 0 A", "CARD 0 1 B", "CARD 2 2 C", "CARD 3 3 D", "CARD 1 0 E"];
        for (i, line) in lines.iter().enumerate() {
            apply_line(&mut s, line);
            assert_eq!(s.moves(), i as u64 + 1);
        }
        assert_eq!(s.matches(), 0);
    }

    #[test]
    fn test_each_match_adds_exactly_one() {
        let mut s = state(4);
        for i in 1..=3 {
            apply_line(&mut s, "MATCH 0 0 0 1");
            assert_eq!(s.matches(), i);
        }
    }

    #[test]
    fn test_mismatch_hides_both_cells() {
        let mut s = state(4);
        apply_line(&mut s, "CARD 0 0 A");
        apply_line(&mut s, "CARD 0 1 B");
        assert!(s.face_up(Cell::new(0, 0)).is_some());

        let notes = changed(apply_line(&mut s, "MISMATCH 0 0 0 1"));
        assert_eq!(notes.len(), 2);
        for note in &notes {
            assert_eq!(note.kind, NotificationKind::NotMatched);
            assert_eq!(note.asset, Some(face_down()));
        }
        assert_eq!(s.snapshot().revealed_asset, Some(face_down()));
        assert!(s.face_up(Cell::new(0, 0)).is_none());
        assert!(s.face_up(Cell::new(0, 1)).is_none());
        assert_eq!(s.matches(), 0);
        assert_eq!(s.moves(), 2);
    }

    #[test]
    fn test_matched_notifications_carry_each_cells_own_asset() {
        let mut s = state(4);
        apply_line(&mut s, "CARD 2 3 C");
        apply_line(&mut s, "CARD 3 0 C");
        let expected = s.letters().get('C').cloned();

        let notes = changed(apply_line(&mut s, "MATCH 2 3 3 0"));
        assert_eq!(notes[0].asset, expected);
        assert_eq!(notes[1].asset, expected);
        // Matched cards stay face-up.
        assert_eq!(s.face_up(Cell::new(2, 3)).cloned(), expected);
    }

    #[test]
    fn test_unknown_letter_still_counts_as_a_move() {
        // Lenient on purpose: the server saw a reveal, so the counter moves,
        // but there is nothing to draw.
        let mut s = state(2);
        apply_line(&mut s, "CARD 0 0 A");
        let before = s.snapshot().revealed_asset;

        let notes = changed(apply_line(&mut s, "CARD 1 1 Z"));
        assert_eq!(s.moves(), 2);
        assert_eq!(s.snapshot().revealed_asset, before);
        assert!(notes[0].asset.is_none());
        assert!(s.face_up(Cell::new(1, 1)).is_none());
    }

    #[test]
    fn test_server_error_is_a_diagnostic_only() {
        let mut s = state(2);
        let applied = apply_line(&mut s, "ERROR not your turn");
        assert_eq!(applied, Applied::Diagnostic("not your turn".into()));
        assert_eq!(s.snapshot(), StateSnapshot { dimension: 2, ..Default::default() });
    }

    #[test]
    fn test_repeated_board_announcement_is_ignored() {
        let mut s = state(4);
        let applied = apply_line(&mut s, "BOARD_DIM 6");
        assert!(matches!(applied, Applied::Ignored(_)));
        assert_eq!(s.dimension(), 4);
        assert_eq!(s.letters().len(), 8);
    }

    #[test]
    fn test_nothing_changes_after_game_over() {
        let mut s = state(2);
        apply_line(&mut s, "CARD 0 0 A");
        apply_line(&mut s, "GAME_OVER");
        let frozen = s.snapshot();

        for line in ["CARD 0 1 A", "MATCH 0 0 0 1", "MISMATCH 0 0 0 1", "GAME_OVER", "ERROR x"] {
            assert!(matches!(apply_line(&mut s, line), Applied::Ignored(_)));
        }
        assert_eq!(s.snapshot(), frozen);
        assert_eq!(s.letters().len(), 2);
    }

    #[test]
    fn test_counters_never_decrease() {
        let mut s = state(4);
        let lines = [
            "CARD 0 0 A",
            "CARD 0 1 B",
            "MISMATCH 0 0 0 1",
            "CARD 0 0 A",
            "CARD 1 0 A",
            "MATCH 0 0 1 0",
            "ERROR slow down",
            "BOARD_DIM 2",
        ];
        let mut last = s.snapshot();
        for line in lines {
            apply_line(&mut s, line);
            let now = s.snapshot();
            assert!(now.moves >= last.moves);
            assert!(now.matches >= last.matches);
            last = now;
        }
    }

    #[test]
    fn test_contains_checks_both_bounds() {
        let s = state(4);
        assert!(s.contains(0, 0));
        assert!(s.contains(3, 3));
        assert!(!s.contains(4, 0));
        assert!(!s.contains(0, 4));
        assert!(!s.contains(-1, 0));
        assert!(!s.contains(0, -1));
    }
}
