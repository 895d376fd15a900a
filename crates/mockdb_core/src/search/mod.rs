//! Search entry points.
//!
//! # Responsibility
//! - Expose the free-text query contract used by `Item::str_filter`.
//! - Keep matching rules inside core.

pub mod query;
