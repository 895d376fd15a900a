//! In-memory, type-segregated record store for note-based knowledge items.
//! This crate is the single source of truth for store invariants.

pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig};
pub use model::convert::CoreObject;
pub use model::item::{Item, ItemField, NoteSource};
pub use model::kind::{ItemKind, RecordId, RecordKind};
pub use model::note::{escape_literal, flatten, is_note_marker, note_marker, ContentEntry, Note};
pub use model::RecordFields;
pub use repo::record_repo::{
    delete_record, list_records, load_record, save_record, Record, RecordIter, RepoError,
    RepoResult,
};
pub use search::query::{build_search_query, filter_items, SearchError, SearchQuery, SearchResult};
pub use store::id_alloc::next_id;
pub use store::{PersistError, PersistResult, Store};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
