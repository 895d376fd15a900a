//! Record domain model for the mock store.
//!
//! # Responsibility
//! - Define items, notes and the type tags that partition the store.
//! - Define the flat field map every record serializes to.
//!
//! # Invariants
//! - Every record is identified by a store-wide unique `RecordId`.
//! - Item text lives in notes; items only hold note ids.

pub mod convert;
pub mod item;
pub mod kind;
pub mod note;

/// Flat field-name to primitive-value map persisted per record.
pub type RecordFields = serde_json::Map<String, serde_json::Value>;
