//! Shared record lifecycle over the in-memory store.
//!
//! # Responsibility
//! - Provide save/load/delete/list for any record kind.
//! - Keep mention back-references consistent when records disappear.
//!
//! # Invariants
//! - Save never moves an id between namespaces.
//! - Load always yields a record whose id equals the requested key.
//! - Delete clears the in-memory id and strips the id from every note's
//!   `mentions`.

use crate::model::item::ItemField;
use crate::model::kind::{RecordId, RecordKind};
use crate::model::note::Note;
use crate::model::RecordFields;
use crate::store::Store;
use log::{debug, warn};
use std::collections::btree_map;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors raised by record lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    /// Save targeted an id owned by another kind.
    TypeConflict {
        id: RecordId,
        existing: RecordKind,
        attempted: RecordKind,
    },
    /// A new record was constructed with an id already in use.
    DuplicateIdOnConstruction { id: RecordId, existing: RecordKind },
    /// Note content references a nested note that has no id yet.
    UnsavedNestedReference { position: usize },
    NotFound { kind: RecordKind, id: RecordId },
    /// Item field holds no note id yet.
    UnsetField(ItemField),
    /// Note is still the name or content of the listed items.
    NoteInUse { id: RecordId, mentions: Vec<RecordId> },
    /// Stored fields cannot be decoded into a record.
    InvalidData(String),
    /// `RecordId::MAX` is in use, so no further id can be allocated.
    IdSpaceExhausted,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TypeConflict {
                id,
                existing,
                attempted,
            } => write!(
                f,
                "id {id} already belongs to `{existing}`; refusing to save it as `{attempted}`"
            ),
            Self::DuplicateIdOnConstruction { id, existing } => {
                write!(f, "id {id} is already used by a `{existing}` record")
            }
            Self::UnsavedNestedReference { position } => write!(
                f,
                "nested note at content position {position} must be saved before flattening"
            ),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::UnsetField(field) => write!(f, "item field `{}` is unset", field.as_str()),
            Self::NoteInUse { id, mentions } => {
                write!(f, "note {id} is still referenced by {mentions:?}")
            }
            Self::InvalidData(message) => write!(f, "invalid stored record: {message}"),
            Self::IdSpaceExhausted => write!(f, "no record id left above {}", RecordId::MAX),
        }
    }
}

impl Error for RepoError {}

/// A value that can be persisted into one store namespace.
pub trait Record: Sized {
    /// Namespace this record is stored in.
    fn kind(&self) -> RecordKind;
    fn id(&self) -> Option<RecordId>;
    fn set_id(&mut self, id: Option<RecordId>);
    /// Flat field map, including `id`.
    fn to_fields(&self) -> RecordFields;
    /// Rebuilds a record from fields stored under `kind`.
    fn from_fields(kind: RecordKind, fields: &RecordFields) -> RepoResult<Self>;
}

/// Rejects an explicit id on a newly constructed record when it is in use.
pub fn ensure_unused_id(store: &Store, id: RecordId) -> RepoResult<()> {
    match store.kind_of(id) {
        Some(existing) => {
            warn!(
                "event=record_new module=repo status=rejected error_code=duplicate_id id={} existing={}",
                id, existing
            );
            Err(RepoError::DuplicateIdOnConstruction { id, existing })
        }
        None => Ok(()),
    }
}

/// Saves `record`, allocating an id when it has none.
///
/// # Errors
/// - `TypeConflict` when the record's id belongs to another kind; neither the
///   store nor the record is modified.
pub fn save_record<R: Record>(store: &mut Store, record: &mut R) -> RepoResult<RecordId> {
    let kind = record.kind();
    let previous = record.id();
    let id = match previous {
        Some(id) => {
            store.check_owner(kind, id)?;
            id
        }
        None => store.next_id()?,
    };

    record.set_id(Some(id));
    if let Err(err) = store.upsert(kind, id, record.to_fields()) {
        record.set_id(previous);
        return Err(err);
    }

    debug!(
        "event=record_save module=repo status=ok kind={} id={} allocated={}",
        kind,
        id,
        previous.is_none()
    );
    Ok(id)
}

/// Loads the record stored under `id` in `kind`.
pub fn load_record<R: Record>(store: &Store, kind: RecordKind, id: RecordId) -> RepoResult<R> {
    let fields = store
        .get(kind, id)
        .ok_or(RepoError::NotFound { kind, id })?;
    decode_record(kind, id, fields)
}

/// Removes `record` from its namespace and from every note's mentions.
///
/// Returns `false` without touching the store when the record is unsaved.
pub fn delete_record<R: Record>(store: &mut Store, record: &mut R) -> RepoResult<bool> {
    let Some(id) = record.id() else {
        return Ok(false);
    };
    let kind = record.kind();
    let removed = store.remove(kind, id).is_some();
    record.set_id(None);
    let cleared = remove_mentions(store, id)?;

    debug!(
        "event=record_delete module=repo status=ok kind={} id={} removed={} mentions_cleared={}",
        kind, id, removed, cleared
    );
    Ok(removed)
}

/// Strips `id` from the mentions of every stored note.
///
/// Returns the number of notes rewritten.
pub fn remove_mentions(store: &mut Store, id: RecordId) -> RepoResult<usize> {
    let mut touched = Vec::new();
    for (note_id, fields) in store.namespace(RecordKind::Note) {
        let mut note: Note = decode_record(RecordKind::Note, *note_id, fields)?;
        if note.mentions.remove(&id) {
            touched.push(note);
        }
    }

    let count = touched.len();
    for note in touched {
        if let Some(note_id) = note.id {
            store.upsert(RecordKind::Note, note_id, note.to_fields())?;
        }
    }
    Ok(count)
}

/// Lazily decodes every record of one kind, in ascending id order.
///
/// The iterator is `Clone`, so a listing can be restarted from any point.
pub fn list_records<R: Record>(store: &Store, kind: RecordKind) -> RecordIter<'_, R> {
    RecordIter {
        kind,
        inner: store.namespace(kind).iter(),
        _record: PhantomData,
    }
}

/// Iterator returned by [`list_records`].
pub struct RecordIter<'a, R> {
    kind: RecordKind,
    inner: btree_map::Iter<'a, RecordId, RecordFields>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for RecordIter<'_, R> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            inner: self.inner.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> Iterator for RecordIter<'_, R> {
    type Item = RepoResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, fields) = self.inner.next()?;
        Some(decode_record(self.kind, *id, fields))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

fn decode_record<R: Record>(kind: RecordKind, id: RecordId, fields: &RecordFields) -> RepoResult<R> {
    let mut record = R::from_fields(kind, fields)?;
    match record.id() {
        Some(stored) if stored != id => Err(RepoError::InvalidData(format!(
            "{kind} stored under {id} carries id {stored}"
        ))),
        Some(_) => Ok(record),
        None => {
            record.set_id(Some(id));
            Ok(record)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{delete_record, ensure_unused_id, list_records, load_record, save_record, RepoError};
    use crate::model::note::Note;
    use crate::store::Store;
    use crate::RecordKind;

    #[test]
    fn save_allocates_sequential_ids_and_overrides_in_place() {
        let mut store = Store::new();
        let mut first = Note::from_strings(["a"]);
        let mut second = Note::from_strings(["b"]);

        assert_eq!(save_record(&mut store, &mut first).unwrap(), 0);
        assert_eq!(save_record(&mut store, &mut second).unwrap(), 1);

        first.flat_content = vec!["changed".to_string()];
        assert_eq!(save_record(&mut store, &mut first).unwrap(), 0);
        assert_eq!(store.len(RecordKind::Note), 2);

        let loaded: Note = load_record(&store, RecordKind::Note, 0).unwrap();
        assert_eq!(loaded.flat_content, vec!["changed".to_string()]);
    }

    #[test]
    fn load_missing_id_is_not_found() {
        let store = Store::new();
        let err = load_record::<Note>(&store, RecordKind::Note, 3).unwrap_err();
        assert_eq!(err, RepoError::NotFound { kind: RecordKind::Note, id: 3 });
    }

    #[test]
    fn delete_unsaved_is_noop_and_saved_clears_id() {
        let mut store = Store::new();
        let mut unsaved = Note::new();
        assert!(!delete_record(&mut store, &mut unsaved).unwrap());

        let mut note = Note::new();
        save_record(&mut store, &mut note).unwrap();
        assert!(delete_record(&mut store, &mut note).unwrap());
        assert_eq!(note.id, None);
        assert_eq!(store.len(RecordKind::Note), 0);
    }

    #[test]
    fn delete_strips_id_from_note_mentions() {
        let mut store = Store::new();
        let mut mentioner = Note::new();
        save_record(&mut store, &mut mentioner).unwrap();

        let mut mentioned = Note::new();
        mentioned.mentions.insert(0);
        save_record(&mut store, &mut mentioned).unwrap();

        delete_record(&mut store, &mut mentioner).unwrap();
        let reloaded: Note = load_record(&store, RecordKind::Note, 1).unwrap();
        assert!(reloaded.mentions.is_empty());
    }

    #[test]
    fn listing_is_restartable() {
        let mut store = Store::new();
        for _ in 0..3 {
            save_record(&mut store, &mut Note::new()).unwrap();
        }
        let listing = list_records::<Note>(&store, RecordKind::Note);
        let first_pass: Vec<_> = listing.clone().map(Result::unwrap).collect();
        let second_pass: Vec<_> = listing.map(Result::unwrap).collect();
        assert_eq!(first_pass.len(), 3);
        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn construction_guard_reports_owner() {
        let mut store = Store::new();
        save_record(&mut store, &mut Note::new()).unwrap();
        assert_eq!(
            ensure_unused_id(&store, 0).unwrap_err(),
            RepoError::DuplicateIdOnConstruction {
                id: 0,
                existing: RecordKind::Note
            }
        );
        assert!(ensure_unused_id(&store, 1).is_ok());
    }
}
