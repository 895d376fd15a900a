//! Record lifecycle on top of the in-memory store.
//!
//! # Responsibility
//! - Define the shared save/load/delete/list engine (`record_repo`).
//! - Layer note and item rules on top of it.
//!
//! # Invariants
//! - Every store mutation goes through `Store::upsert` / `Store::remove`.
//! - Lifecycle errors are surfaced to the caller, never logged and ignored.

pub mod item_repo;
pub mod note_repo;
pub mod record_repo;
