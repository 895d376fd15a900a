//! Conversion contract for externally defined domain objects.
//!
//! External objects only need to expose their fields in the same flat shape
//! this store persists; nothing else about them is assumed.

use crate::model::item::NoteSource;
use crate::model::kind::RecordId;
use crate::model::RecordFields;
use crate::repo::record_repo::{RepoError, RepoResult};
use serde_json::Value;

/// Object that can describe itself as a flat field map.
pub trait CoreObject {
    fn to_fields(&self) -> RecordFields;
}

impl CoreObject for RecordFields {
    fn to_fields(&self) -> RecordFields {
        self.clone()
    }
}

/// Reads the optional `id` field of an external object.
pub(crate) fn core_id(fields: &RecordFields) -> RepoResult<Option<RecordId>> {
    match fields.get("id") {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| RepoError::InvalidData(format!("invalid external id `{value}`"))),
    }
}

/// Interprets an external `name`/`content` value.
///
/// Integers are note ids, strings are literal text and missing or null
/// values request an empty note.
pub(crate) fn core_note_source(fields: &RecordFields, key: &str) -> RepoResult<NoteSource> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(NoteSource::Empty),
        Some(Value::String(text)) => Ok(NoteSource::Text(text.clone())),
        Some(value) => value.as_u64().map(NoteSource::Note).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid external `{key}` value `{value}`"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{core_id, core_note_source};
    use crate::model::item::NoteSource;
    use crate::model::RecordFields;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> RecordFields {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn note_sources_follow_value_type() {
        let external = fields(json!({"name": "proof sketch", "content": 3}));
        assert_eq!(
            core_note_source(&external, "name").unwrap(),
            NoteSource::Text("proof sketch".to_string())
        );
        assert_eq!(core_note_source(&external, "content").unwrap(), NoteSource::Note(3));
        assert_eq!(core_note_source(&external, "missing").unwrap(), NoteSource::Empty);
        assert!(core_note_source(&fields(json!({"name": [1]})), "name").is_err());
    }

    #[test]
    fn external_id_must_be_non_negative_integer() {
        assert_eq!(core_id(&fields(json!({"id": 8}))).unwrap(), Some(8));
        assert_eq!(core_id(&fields(json!({"id": null}))).unwrap(), None);
        assert!(core_id(&fields(json!({"id": -1}))).is_err());
    }
}
