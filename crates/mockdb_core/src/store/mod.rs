//! Type-segregated in-memory record store.
//!
//! # Responsibility
//! - Own one namespace (id -> record fields) per record kind.
//! - Provide the single mutation entry point used by every repository.
//!
//! # Invariants
//! - The namespace set is fixed at construction and never grows or shrinks.
//! - An id lives in at most one namespace at a time.
//! - Writes targeting an id owned by another kind are rejected untouched.
//!
//! # Concurrency
//! - The store is a plain value with no internal locking. Hosts sharing it
//!   across threads must wrap the whole store in one mutex, because
//!   allocate-then-insert is not atomic on its own.

pub mod id_alloc;
pub mod persist;

use crate::model::kind::{RecordId, RecordKind, KIND_COUNT};
use crate::model::RecordFields;
use crate::repo::record_repo::{RepoError, RepoResult};
use log::warn;
use std::collections::BTreeMap;

pub use persist::{PersistError, PersistResult};

/// Records of one kind, keyed by id.
pub type Namespace = BTreeMap<RecordId, RecordFields>;

/// In-memory stand-in for a persistent database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    namespaces: [Namespace; KIND_COUNT],
}

impl Store {
    /// Creates a store with every namespace empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties every namespace.
    pub fn reset(&mut self) {
        for namespace in &mut self.namespaces {
            namespace.clear();
        }
    }

    /// Read-only view of one namespace.
    pub fn namespace(&self, kind: RecordKind) -> &Namespace {
        &self.namespaces[kind.index()]
    }

    /// Returns the kind owning `id`, if any.
    pub fn kind_of(&self, id: RecordId) -> Option<RecordKind> {
        RecordKind::ALL
            .into_iter()
            .find(|kind| self.namespace(*kind).contains_key(&id))
    }

    /// Whether `id` is in use by any kind.
    pub fn contains(&self, id: RecordId) -> bool {
        self.kind_of(id).is_some()
    }

    /// Every id in use, across all namespaces.
    pub fn ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.namespaces
            .iter()
            .flat_map(|namespace| namespace.keys().copied())
    }

    /// Next id the allocator would hand out.
    ///
    /// # Errors
    /// - `IdSpaceExhausted` when `RecordId::MAX` is in use.
    pub fn next_id(&self) -> RepoResult<RecordId> {
        id_alloc::next_id(self.ids())
    }

    pub fn get(&self, kind: RecordKind, id: RecordId) -> Option<&RecordFields> {
        self.namespace(kind).get(&id)
    }

    /// Number of records of one kind.
    pub fn len(&self, kind: RecordKind) -> usize {
        self.namespace(kind).len()
    }

    /// Whether every namespace is empty.
    pub fn is_empty(&self) -> bool {
        self.namespaces.iter().all(BTreeMap::is_empty)
    }

    /// Inserts or replaces the record stored under `id` in `kind`.
    ///
    /// # Errors
    /// - `TypeConflict` when `id` is owned by a different kind; the store is
    ///   left unchanged.
    pub fn upsert(&mut self, kind: RecordKind, id: RecordId, fields: RecordFields) -> RepoResult<()> {
        self.check_owner(kind, id)?;
        self.namespaces[kind.index()].insert(id, fields);
        Ok(())
    }

    /// Removes and returns the record stored under `id` in `kind`.
    pub fn remove(&mut self, kind: RecordKind, id: RecordId) -> Option<RecordFields> {
        self.namespaces[kind.index()].remove(&id)
    }

    /// Fails when `id` is owned by a kind other than `kind`.
    pub fn check_owner(&self, kind: RecordKind, id: RecordId) -> RepoResult<()> {
        match self.kind_of(id) {
            Some(existing) if existing != kind => {
                warn!(
                    "event=record_save module=store status=rejected error_code=type_conflict id={} existing={} attempted={}",
                    id, existing, kind
                );
                Err(RepoError::TypeConflict {
                    id,
                    existing,
                    attempted: kind,
                })
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn from_namespaces(namespaces: [Namespace; KIND_COUNT]) -> Self {
        Self { namespaces }
    }
}
