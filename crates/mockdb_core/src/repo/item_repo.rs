//! Item lifecycle over the in-memory store.
//!
//! # Responsibility
//! - Build items whose `name`/`content` are note references.
//! - Persist items together with the notes they depend on.
//! - Cascade item deletion to notes no other item mentions.
//!
//! # Invariants
//! - Literal text and missing values are wrapped into saved notes at
//!   construction time; unset fields are backfilled with empty notes on save.
//! - Every failure in `save` happens before the first store mutation.
//! - After `save`, exactly the item's name/content notes list it in
//!   `mentions`.

use crate::model::convert::{core_id, core_note_source, CoreObject};
use crate::model::item::{Item, ItemField, NoteSource};
use crate::model::kind::{ItemKind, RecordId, RecordKind};
use crate::model::note::Note;
use crate::repo::record_repo::{
    delete_record, ensure_unused_id, list_records, load_record, save_record, Record, RecordIter,
    RepoError, RepoResult,
};
use crate::search::query::{build_search_query, filter_items, SearchResult};
use crate::store::Store;
use log::debug;

impl Item {
    /// Constructs an unsaved item, saving any notes needed for its fields.
    ///
    /// # Errors
    /// - `NotFound` when a [`NoteSource::Note`] id is not a stored note.
    pub fn new(
        store: &mut Store,
        kind: ItemKind,
        name: impl Into<NoteSource>,
        content: impl Into<NoteSource>,
    ) -> RepoResult<Self> {
        Self::build(store, kind, None, name.into(), content.into())
    }

    /// Constructs an unsaved item that will be saved under `id`.
    ///
    /// # Errors
    /// - `DuplicateIdOnConstruction` when `id` is in use; nothing is saved.
    /// - `NotFound` when a [`NoteSource::Note`] id is not a stored note.
    pub fn with_id(
        store: &mut Store,
        kind: ItemKind,
        id: RecordId,
        name: impl Into<NoteSource>,
        content: impl Into<NoteSource>,
    ) -> RepoResult<Self> {
        ensure_unused_id(store, id)?;
        Self::build(store, kind, Some(id), name.into(), content.into())
    }

    /// Constructs an unsaved item from an external object's field map.
    ///
    /// An `id` field goes through the same guard as [`Item::with_id`].
    pub fn from_core(store: &mut Store, kind: ItemKind, object: &impl CoreObject) -> RepoResult<Self> {
        let fields = object.to_fields();
        let name = core_note_source(&fields, ItemField::Name.as_str())?;
        let content = core_note_source(&fields, ItemField::Content.as_str())?;
        match core_id(&fields)? {
            Some(id) => Self::with_id(store, kind, id, name, content),
            None => Self::new(store, kind, name, content),
        }
    }

    fn build(
        store: &mut Store,
        kind: ItemKind,
        id: Option<RecordId>,
        name: NoteSource,
        content: NoteSource,
    ) -> RepoResult<Self> {
        for source in [&name, &content] {
            if let NoteSource::Note(note_id) = source {
                ensure_note_exists(store, *note_id)?;
            }
        }

        let name = resolve_source(store, name, id)?;
        let content = resolve_source(store, content, id)?;
        Ok(Self {
            kind,
            id,
            name: Some(name),
            content: Some(content),
        })
    }

    /// Loads a stored item of `kind`.
    pub fn load(store: &Store, kind: ItemKind, id: RecordId) -> RepoResult<Self> {
        load_record(store, kind.into(), id)
    }

    /// Lists every stored item of `kind` in ascending id order.
    pub fn list_all(store: &Store, kind: ItemKind) -> RecordIter<'_, Self> {
        list_records(store, kind.into())
    }

    /// Items of `kind` whose name or content text matches any query term.
    pub fn str_filter(store: &Store, kind: ItemKind, query: &str) -> SearchResult<Vec<Self>> {
        let query = build_search_query(query)?;
        filter_items(store, kind, &query)
    }

    /// Saves the item, backfills unset fields and refreshes note mentions.
    ///
    /// # Errors
    /// - `TypeConflict` when the id belongs to another kind.
    /// - `NotFound` when `name` or `content` points at a missing note.
    ///
    /// Both are raised before the store is modified.
    pub fn save(&mut self, store: &mut Store) -> RepoResult<RecordId> {
        if let Some(id) = self.id {
            store.check_owner(self.kind.into(), id)?;
        }
        for note_id in self.note_ids() {
            ensure_note_exists(store, note_id)?;
        }

        let id = save_record(store, self)?;
        let mut backfilled = false;
        for field in ItemField::ALL {
            if self.field(field).is_none() {
                let note_id = Note::new().save(store)?;
                *self.field_mut(field) = Some(note_id);
                backfilled = true;
            }
        }
        if backfilled {
            save_record(store, self)?;
        }
        sync_mentions(store, self)?;
        Ok(id)
    }

    /// Overwrites id and note references with the stored version.
    ///
    /// Unsaved items are left untouched.
    pub fn reload(&mut self, store: &Store) -> RepoResult<()> {
        if let Some(id) = self.id {
            let stored = Self::load(store, self.kind, id)?;
            self.id = stored.id;
            self.name = stored.name;
            self.content = stored.content;
        }
        Ok(())
    }

    /// Loads the note referenced by `field`.
    ///
    /// # Errors
    /// - `UnsetField` when the field has no note id.
    /// - `NotFound` when the referenced note is not stored.
    pub fn load_note(&self, store: &Store, field: ItemField) -> RepoResult<Note> {
        let note_id = self.field(field).ok_or(RepoError::UnsetField(field))?;
        Note::load(store, note_id)
    }

    /// Deletes the item and every name/content note left unmentioned.
    ///
    /// Fields whose note was deleted are reset to `None`, so saving the item
    /// again backfills fresh notes. Shared notes are kept and stay referenced.
    pub fn delete(&mut self, store: &mut Store) -> RepoResult<bool> {
        let Some(id) = self.id else {
            return Ok(false);
        };
        let removed = delete_record(store, self)?;

        let mut cascaded = 0;
        for field in ItemField::ALL {
            let Some(note_id) = self.field(field) else {
                continue;
            };
            match Note::load(store, note_id) {
                Ok(mut note) if note.mentions.is_empty() => {
                    note.delete(store)?;
                    *self.field_mut(field) = None;
                    cascaded += 1;
                }
                Ok(_) => {}
                Err(RepoError::NotFound { .. }) => *self.field_mut(field) = None,
                Err(err) => return Err(err),
            }
        }

        debug!(
            "event=item_cascade module=item status=ok kind={} id={} notes_deleted={}",
            self.kind, id, cascaded
        );
        Ok(removed)
    }
}

fn ensure_note_exists(store: &Store, note_id: RecordId) -> RepoResult<()> {
    if store.get(RecordKind::Note, note_id).is_some() {
        Ok(())
    } else {
        Err(RepoError::NotFound {
            kind: RecordKind::Note,
            id: note_id,
        })
    }
}

/// Turns a note source into a stored note id.
///
/// `reserved` is an id promised to the item under construction; wrapped
/// notes skip it so the later item save cannot collide with them.
fn resolve_source(
    store: &mut Store,
    source: NoteSource,
    reserved: Option<RecordId>,
) -> RepoResult<RecordId> {
    let mut note = match source {
        NoteSource::Note(note_id) => return Ok(note_id),
        NoteSource::Text(text) => Note::from_strings([text]),
        NoteSource::Empty => Note::new(),
    };

    let next = store.next_id()?;
    if reserved == Some(next) {
        note.id = Some(next.checked_add(1).ok_or(RepoError::IdSpaceExhausted)?);
    }
    note.save(store)
}

/// Makes `item` the only item-side mention on exactly its name/content notes.
fn sync_mentions(store: &mut Store, item: &Item) -> RepoResult<()> {
    let Some(item_id) = item.id else {
        return Ok(());
    };
    let referenced: Vec<RecordId> = item.note_ids().collect();

    let mut changed = Vec::new();
    for note in Note::list_all(store) {
        let mut note = note?;
        let should_mention = note.id.is_some_and(|note_id| referenced.contains(&note_id));
        let updated = if should_mention {
            note.mentions.insert(item_id)
        } else {
            note.mentions.remove(&item_id)
        };
        if updated {
            changed.push(note);
        }
    }

    for note in changed {
        if let Some(note_id) = note.id {
            store.upsert(RecordKind::Note, note_id, note.to_fields())?;
        }
    }
    Ok(())
}
