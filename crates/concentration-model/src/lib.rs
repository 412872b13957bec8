//! Game-state model for the Concentration client.
//!
//! The server is the authority; this crate keeps a local mirror of what it
//! has said so far:
//!
//! - [`GameState`]: dimension, letter assignment, counters, terminal flag
//! - [`LetterAssignment`] / [`AssetResolver`]: which picture each letter
//!   shows
//! - [`Notification`] / [`StateSnapshot`]: what presentation layers see
//!
//! # Example
//!
//! ```
//! use concentration_model::{Applied, AssetId, GameState, StaticAssets};
//!
//! let assets = StaticAssets::numbered(8);
//! let mut state = GameState::new(4, &assets, AssetId::new("pokeball.png")).unwrap();
//!
//! let applied = state.apply(&"CARD 0 0 A".parse().unwrap());
//! assert!(matches!(applied, Applied::Changed(_)));
//! assert_eq!(state.moves(), 1);
//! ```

mod assets;
mod error;
mod notification;
mod state;

pub use assets::{
    AssetId, AssetResolver, DEFAULT_FACE_DOWN, FIRST_LETTER, LetterAssignment, StaticAssets,
    letter_codes,
};
pub use error::ModelError;
pub use notification::{Notification, NotificationKind, StateSnapshot};
pub use state::{Applied, GameState};
