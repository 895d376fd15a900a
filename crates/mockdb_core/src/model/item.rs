//! Item domain model.
//!
//! # Responsibility
//! - Define the shared shape of every non-note record kind.
//! - Describe how `name`/`content` inputs map onto note references.
//!
//! # Invariants
//! - `name` and `content` hold note ids, never raw text.
//! - A saved item always has both fields set to existing note ids.

use crate::model::kind::{ItemKind, RecordId, RecordKind};
use crate::model::RecordFields;
use crate::repo::record_repo::{Record, RepoError, RepoResult};
use serde::Deserialize;
use serde_json::{json, Value};

/// Input for an item's `name` or `content` at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteSource {
    /// Reuse an existing note.
    Note(RecordId),
    /// Wrap literal text into a new, immediately saved note.
    Text(String),
    /// Create a new, immediately saved empty note.
    Empty,
}

impl From<RecordId> for NoteSource {
    fn from(value: RecordId) -> Self {
        Self::Note(value)
    }
}

impl From<&str> for NoteSource {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for NoteSource {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<NoteSource>> From<Option<T>> for NoteSource {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

/// Selects one of the note-valued item fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Name,
    Content,
}

impl ItemField {
    pub const ALL: [ItemField; 2] = [ItemField::Name, ItemField::Content];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Content => "content",
        }
    }
}

/// Definition, theorem, proof or question record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Fixed for the lifetime of the value.
    pub kind: ItemKind,
    /// `None` until the first save.
    pub id: Option<RecordId>,
    /// Note id; `None` only before save backfills it.
    pub name: Option<RecordId>,
    /// Note id; `None` only before save backfills it.
    pub content: Option<RecordId>,
}

impl Item {
    /// Reads the note id held by `field`.
    pub fn field(&self, field: ItemField) -> Option<RecordId> {
        match field {
            ItemField::Name => self.name,
            ItemField::Content => self.content,
        }
    }

    pub(crate) fn field_mut(&mut self, field: ItemField) -> &mut Option<RecordId> {
        match field {
            ItemField::Name => &mut self.name,
            ItemField::Content => &mut self.content,
        }
    }

    /// Note ids currently referenced by this item.
    pub fn note_ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        ItemField::ALL
            .into_iter()
            .filter_map(move |field| self.field(field))
    }
}

#[derive(Deserialize)]
struct StoredItem {
    id: Option<RecordId>,
    name: Option<RecordId>,
    content: Option<RecordId>,
}

impl Record for Item {
    fn kind(&self) -> RecordKind {
        self.kind.into()
    }

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: Option<RecordId>) {
        self.id = id;
    }

    fn to_fields(&self) -> RecordFields {
        let mut fields = RecordFields::new();
        fields.insert("id".to_string(), json!(self.id));
        fields.insert("name".to_string(), json!(self.name));
        fields.insert("content".to_string(), json!(self.content));
        fields
    }

    fn from_fields(kind: RecordKind, fields: &RecordFields) -> RepoResult<Self> {
        let item_kind = kind.as_item_kind().ok_or_else(|| {
            RepoError::InvalidData(format!("item cannot be decoded from `{kind}` namespace"))
        })?;
        let stored: StoredItem = serde_json::from_value(Value::Object(fields.clone()))
            .map_err(|err| RepoError::InvalidData(format!("invalid {kind} fields: {err}")))?;
        Ok(Self {
            kind: item_kind,
            id: stored.id,
            name: stored.name,
            content: stored.content,
        })
    }
}
