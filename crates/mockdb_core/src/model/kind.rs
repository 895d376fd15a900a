//! Record type tags and identifiers.
//!
//! # Responsibility
//! - Define the closed set of record kinds that partition the store.
//! - Provide stable text tags used by the persisted layout and logs.
//!
//! # Invariants
//! - The kind set is fixed at compile time; namespaces are never added or
//!   removed at runtime.
//! - `RecordId` values are unique across every kind, not per kind.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Store-wide record identifier.
pub type RecordId = u64;

/// Number of record kinds, and therefore of store namespaces.
pub const KIND_COUNT: usize = 5;

/// Type tag selecting the namespace a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Definition,
    Theorem,
    Proof,
    Question,
    /// Text carrier referenced by items (and by other notes).
    Note,
}

impl RecordKind {
    /// Every kind, in namespace order.
    pub const ALL: [RecordKind; KIND_COUNT] = [
        RecordKind::Definition,
        RecordKind::Theorem,
        RecordKind::Proof,
        RecordKind::Question,
        RecordKind::Note,
    ];

    /// Position of this kind's namespace inside the store.
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Definition => 0,
            Self::Theorem => 1,
            Self::Proof => 2,
            Self::Question => 3,
            Self::Note => 4,
        }
    }

    /// Stable lowercase tag used in dumps and log events.
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::Definition => "definition",
            Self::Theorem => "theorem",
            Self::Proof => "proof",
            Self::Question => "question",
            Self::Note => "note",
        }
    }

    /// Parses a tag produced by [`RecordKind::as_tag`]. Case-insensitive.
    pub fn parse_tag(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "definition" => Some(Self::Definition),
            "theorem" => Some(Self::Theorem),
            "proof" => Some(Self::Proof),
            "question" => Some(Self::Question),
            "note" => Some(Self::Note),
            _ => None,
        }
    }

    /// Returns the item kind for every kind except `Note`.
    pub fn as_item_kind(self) -> Option<ItemKind> {
        match self {
            Self::Definition => Some(ItemKind::Definition),
            Self::Theorem => Some(ItemKind::Theorem),
            Self::Proof => Some(ItemKind::Proof),
            Self::Question => Some(ItemKind::Question),
            Self::Note => None,
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Kinds whose records carry `name`/`content` note references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Definition,
    Theorem,
    Proof,
    Question,
}

impl ItemKind {
    pub const ALL: [ItemKind; 4] = [
        ItemKind::Definition,
        ItemKind::Theorem,
        ItemKind::Proof,
        ItemKind::Question,
    ];
}

impl From<ItemKind> for RecordKind {
    fn from(value: ItemKind) -> Self {
        match value {
            ItemKind::Definition => Self::Definition,
            ItemKind::Theorem => Self::Theorem,
            ItemKind::Proof => Self::Proof,
            ItemKind::Question => Self::Question,
        }
    }
}

impl Display for ItemKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&RecordKind::from(*self), f)
    }
}

#[cfg(test)]
mod tests {
    use super::{ItemKind, RecordKind};

    #[test]
    fn tags_roundtrip_for_every_kind() {
        for kind in RecordKind::ALL {
            assert_eq!(RecordKind::parse_tag(kind.as_tag()), Some(kind));
        }
        assert_eq!(RecordKind::parse_tag(" Proof "), Some(RecordKind::Proof));
        assert_eq!(RecordKind::parse_tag("lemma"), None);
    }

    #[test]
    fn namespace_indexes_are_dense_and_unique() {
        let mut seen = [false; super::KIND_COUNT];
        for kind in RecordKind::ALL {
            assert!(!seen[kind.index()]);
            seen[kind.index()] = true;
        }
        assert!(seen.iter().all(|slot| *slot));
    }

    #[test]
    fn only_note_is_not_an_item_kind() {
        for kind in ItemKind::ALL {
            assert_eq!(RecordKind::from(kind).as_item_kind(), Some(kind));
        }
        assert_eq!(RecordKind::Note.as_item_kind(), None);
    }
}
