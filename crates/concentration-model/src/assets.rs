//! Asset identifiers and the per-letter asset assignment.
//!
//! The server only ever talks about letters (`CARD 0 0 A`). What a letter
//! looks like is decided on the client: the first asset goes to `'A'`,
//! the second to `'B'`, and so on. The assignment is built once per game
//! and never changes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// The face-down asset used when nothing else is configured.
pub const DEFAULT_FACE_DOWN: &str = "pokeball.png";

/// First letter code handed out.
pub const FIRST_LETTER: char = 'A';

/// Letter codes in assignment order: code points upward from
/// [`FIRST_LETTER`], leaving out anything that can't travel as a single
/// protocol token (whitespace, control characters, U+FFFD).
pub fn letter_codes() -> impl Iterator<Item = char> {
    (u32::from(FIRST_LETTER)..=u32::from(char::MAX))
        .filter_map(char::from_u32)
        .filter(|c| !c.is_whitespace() && !c.is_control() && *c != char::REPLACEMENT_CHARACTER)
}

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// An opaque token naming the picture shown for a card (usually a file
/// name). The core never interprets it.
///
/// Serialized as a plain string thanks to `#[serde(transparent)]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Wraps an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AssetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// AssetResolver
// ---------------------------------------------------------------------------

/// Supplies the ordered list of assets a game may use.
///
/// Called once per session, when the board is announced. The order must
/// be stable: it decides which letter gets which asset.
pub trait AssetResolver: Send + Sync {
    /// Returns every available asset, in assignment order.
    fn assets(&self) -> Vec<AssetId>;
}

impl AssetResolver for [AssetId] {
    fn assets(&self) -> Vec<AssetId> {
        self.to_vec()
    }
}

impl AssetResolver for Vec<AssetId> {
    fn assets(&self) -> Vec<AssetId> {
        self.clone()
    }
}

impl<T: AssetResolver + ?Sized> AssetResolver for &T {
    fn assets(&self) -> Vec<AssetId> {
        (**self).assets()
    }
}

/// A fixed, in-memory asset list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticAssets {
    assets: Vec<AssetId>,
}

impl StaticAssets {
    /// Builds the list from anything that yields asset ids, keeping order.
    pub fn new<I>(assets: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<AssetId>,
    {
        Self {
            assets: assets.into_iter().map(Into::into).collect(),
        }
    }

    /// `count` generated names: `card-01.png`, `card-02.png`, ...
    pub fn numbered(count: usize) -> Self {
        Self::new((1..=count).map(|i| format!("card-{i:02}.png")))
    }
}

impl AssetResolver for StaticAssets {
    fn assets(&self) -> Vec<AssetId> {
        self.assets.clone()
    }
}

// ---------------------------------------------------------------------------
// LetterAssignment
// ---------------------------------------------------------------------------

/// The fixed mapping from letter code to asset for one game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LetterAssignment {
    letters: BTreeMap<char, AssetId>,
}

impl LetterAssignment {
    /// Assigns `pairs` assets to the first `pairs` [`letter_codes`], in the
    /// order the assets are given.
    ///
    /// The face-down asset is skipped wherever it appears in the list: it
    /// can never be the face of a card.
    ///
    /// # Errors
    /// [`ModelError::InsufficientAssets`] if fewer than `pairs` usable
    /// assets remain, or in the unlikely case that the letter codes run
    /// out first.
    pub fn build(
        pairs: usize,
        assets: Vec<AssetId>,
        face_down: &AssetId,
    ) -> Result<Self, ModelError> {
        let usable: Vec<AssetId> = assets.into_iter().filter(|a| a != face_down).collect();
        if usable.len() < pairs {
            return Err(ModelError::InsufficientAssets {
                needed: pairs,
                available: usable.len(),
            });
        }

        let letters: BTreeMap<char, AssetId> = letter_codes().zip(usable).take(pairs).collect();
        if letters.len() < pairs {
            return Err(ModelError::InsufficientAssets {
                needed: pairs,
                available: letters.len(),
            });
        }
        Ok(Self { letters })
    }

    /// The asset assigned to `letter`, if any.
    pub fn get(&self, letter: char) -> Option<&AssetId> {
        self.letters.get(&letter)
    }

    /// Number of letters assigned (equal to the number of pairs).
    pub fn len(&self) -> usize {
        self.letters.len()
    }

    /// `true` if no letters are assigned.
    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    /// Iterates in ascending letter order.
    pub fn iter(&self) -> impl Iterator<Item = (char, &AssetId)> {
        self.letters.iter().map(|(letter, asset)| (*letter, asset))
    }
}
