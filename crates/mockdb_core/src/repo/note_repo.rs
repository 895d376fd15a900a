//! Note lifecycle over the in-memory store.
//!
//! # Responsibility
//! - Persist, reload and delete notes.
//! - Provide the empty/from-strings factories used by item construction.
//!
//! # Invariants
//! - A saved note's nested markers all point at saved notes.
//! - `children` is recomputed from markers on every save.
//! - A note still mentioned by an item cannot be deleted directly.
//! - Note save never changes the stored `mentions`.

use crate::model::kind::{RecordId, RecordKind};
use crate::model::note::{is_note_marker, Note};
use crate::repo::record_repo::{
    delete_record, ensure_unused_id, list_records, load_record, save_record, RecordIter, RepoError,
    RepoResult,
};
use crate::store::Store;
use log::warn;
use std::collections::BTreeSet;

impl Note {
    /// Unsaved root note carrying an explicit id.
    ///
    /// # Errors
    /// - `DuplicateIdOnConstruction` when `id` is already in use.
    pub fn with_id(store: &Store, id: RecordId) -> RepoResult<Self> {
        ensure_unused_id(store, id)?;
        Ok(Self {
            id: Some(id),
            ..Self::default()
        })
    }

    /// Empty root note, saved right away when `persist` is set.
    pub fn create_empty(store: &mut Store, persist: bool) -> RepoResult<Self> {
        let mut note = Self::new();
        if persist {
            note.save(store)?;
        }
        Ok(note)
    }

    /// Root note holding literal fragments, saved right away when `persist` is set.
    pub fn create_from_strings<I, S>(store: &mut Store, fragments: I, persist: bool) -> RepoResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut note = Self::from_strings(fragments);
        if persist {
            note.save(store)?;
        }
        Ok(note)
    }

    /// Loads a stored note.
    pub fn load(store: &Store, id: RecordId) -> RepoResult<Self> {
        load_record(store, RecordKind::Note, id)
    }

    /// Lists every stored note in ascending id order.
    pub fn list_all(store: &Store) -> RecordIter<'_, Self> {
        list_records(store, RecordKind::Note)
    }

    /// Saves this note and returns its id.
    ///
    /// `mentions` is owned by item save/delete: the stored set is kept and the
    /// in-memory copy is refreshed from it.
    ///
    /// # Errors
    /// - `NotFound` when a nested marker points at a note that is not stored.
    /// - `TypeConflict` when the note id belongs to another kind.
    /// - `IdSpaceExhausted` when no id is left to allocate.
    pub fn save(&mut self, store: &mut Store) -> RepoResult<RecordId> {
        let children: BTreeSet<RecordId> = self
            .flat_content
            .iter()
            .filter_map(|entry| is_note_marker(entry))
            .collect();
        for child in &children {
            if store.get(RecordKind::Note, *child).is_none() {
                warn!(
                    "event=record_save module=note status=rejected error_code=missing_child child={}",
                    child
                );
                return Err(RepoError::NotFound {
                    kind: RecordKind::Note,
                    id: *child,
                });
            }
        }
        let mentions = stored_mentions(store, self.id)?;

        self.children = children;
        self.mentions = mentions;
        save_record(store, self)
    }

    /// Overwrites in-memory fields with the stored version.
    ///
    /// Unsaved notes are left untouched.
    pub fn reload(&mut self, store: &Store) -> RepoResult<()> {
        if let Some(id) = self.id {
            *self = Self::load(store, id)?;
        }
        Ok(())
    }

    /// Deletes this note and clears its id.
    ///
    /// # Errors
    /// - `NoteInUse` when the stored note is still mentioned by an item.
    pub fn delete(&mut self, store: &mut Store) -> RepoResult<bool> {
        if let Some(id) = self.id {
            if store.get(RecordKind::Note, id).is_some() {
                let stored = Self::load(store, id)?;
                if !stored.mentions.is_empty() {
                    warn!(
                        "event=record_delete module=note status=rejected error_code=note_in_use id={} mentions={}",
                        id,
                        stored.mentions.len()
                    );
                    return Err(RepoError::NoteInUse {
                        id,
                        mentions: stored.mentions.into_iter().collect(),
                    });
                }
            }
        }
        delete_record(store, self)
    }
}

/// Mentions currently stored for `id`; empty for unsaved or unknown notes.
fn stored_mentions(store: &Store, id: Option<RecordId>) -> RepoResult<BTreeSet<RecordId>> {
    let Some(id) = id else {
        return Ok(BTreeSet::new());
    };
    store.check_owner(RecordKind::Note, id)?;
    if store.get(RecordKind::Note, id).is_none() {
        return Ok(BTreeSet::new());
    }
    Ok(Note::load(store, id)?.mentions)
}
