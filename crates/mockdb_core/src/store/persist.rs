//! Whole-store JSON dump and reload.
//!
//! # Responsibility
//! - Encode every namespace as `{ tag: { id: fields } }`.
//! - Decode such a document back into a store, coercing id keys to integers.
//!
//! # Invariants
//! - Reload replaces store contents wholesale; a failed reload leaves the
//!   previous contents in place.
//! - A decoded document must satisfy the same id-ownership rules as a live
//!   store (one namespace per id, embedded `id` matching its key).

use super::{Namespace, Store};
use crate::model::kind::{RecordId, RecordKind, KIND_COUNT};
use log::{error, info};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Instant;

pub type PersistResult<T> = Result<T, PersistError>;

#[derive(Debug)]
pub enum PersistError {
    Io(std::io::Error),
    Json(serde_json::Error),
    /// Document parsed but breaks store invariants.
    InvalidData(String),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid store dump: {message}"),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<std::io::Error> for PersistError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl Store {
    /// Encodes every namespace, including empty ones, as pretty JSON.
    pub fn to_json(&self) -> PersistResult<String> {
        let document: BTreeMap<&'static str, &Namespace> = RecordKind::ALL
            .into_iter()
            .map(|kind| (kind.as_tag(), self.namespace(kind)))
            .collect();
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Decodes a document produced by [`Store::to_json`].
    ///
    /// Missing tags load as empty namespaces.
    ///
    /// # Errors
    /// - `Json` when the text is not a `{ tag: { id: object } }` document.
    /// - `InvalidData` for unknown tags, ids owned twice, or records whose
    ///   `id` field disagrees with their key.
    pub fn from_json(text: &str) -> PersistResult<Self> {
        let document: BTreeMap<String, Namespace> = serde_json::from_str(text)?;
        let mut namespaces: [Namespace; KIND_COUNT] = Default::default();
        let mut owners: HashMap<RecordId, RecordKind> = HashMap::new();

        for (tag, namespace) in document {
            let kind = RecordKind::parse_tag(&tag)
                .ok_or_else(|| PersistError::InvalidData(format!("unknown type tag `{tag}`")))?;

            for (id, fields) in &namespace {
                if let Some(previous) = owners.insert(*id, kind) {
                    return Err(PersistError::InvalidData(format!(
                        "id {id} is stored under both `{previous}` and `{kind}`"
                    )));
                }
                match fields.get("id") {
                    Some(Value::Number(embedded)) if embedded.as_u64() == Some(*id) => {}
                    None | Some(Value::Null) => {}
                    Some(other) => {
                        return Err(PersistError::InvalidData(format!(
                            "record {kind}/{id} carries mismatched id `{other}`"
                        )));
                    }
                }
            }

            namespaces[kind.index()].extend(namespace);
        }

        Ok(Self::from_namespaces(namespaces))
    }

    /// Writes the whole store to `path`.
    ///
    /// # Side effects
    /// - Creates or truncates the target file.
    /// - Emits `store_persist` logging events with duration and status.
    pub fn persist(&self, path: impl AsRef<Path>) -> PersistResult<()> {
        let started_at = Instant::now();
        let result = self
            .to_json()
            .and_then(|text| std::fs::write(path.as_ref(), text).map_err(PersistError::from));

        match &result {
            Ok(()) => info!(
                "event=store_persist module=store status=ok records={} duration_ms={}",
                self.ids().count(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=store_persist module=store status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    /// Replaces store contents with the dump stored at `path`.
    ///
    /// The store is left untouched when reading or decoding fails.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> PersistResult<()> {
        let started_at = Instant::now();
        let result = std::fs::read_to_string(path.as_ref())
            .map_err(PersistError::from)
            .and_then(|text| Self::from_json(&text));

        match result {
            Ok(loaded) => {
                *self = loaded;
                info!(
                    "event=store_load module=store status=ok records={} duration_ms={}",
                    self.ids().count(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_load module=store status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PersistError;
    use crate::store::Store;
    use crate::RecordKind;

    #[test]
    fn string_keys_are_coerced_to_integer_ids() {
        let store = Store::from_json(r#"{"proof": {"12": {"id": 12, "name": 0, "content": 1}}}"#)
            .unwrap();
        assert_eq!(store.kind_of(12), Some(RecordKind::Proof));
        assert_eq!(store.len(RecordKind::Note), 0);
    }

    #[test]
    fn empty_store_dumps_every_tag() {
        let text = Store::new().to_json().unwrap();
        for kind in RecordKind::ALL {
            assert!(text.contains(kind.as_tag()));
        }
    }

    #[test]
    fn rejects_unknown_tags_and_shared_ids() {
        let unknown = Store::from_json(r#"{"lemma": {}}"#).unwrap_err();
        assert!(matches!(unknown, PersistError::InvalidData(_)));

        let shared =
            Store::from_json(r#"{"proof": {"1": {"id": 1}}, "note": {"1": {"id": 1}}}"#)
                .unwrap_err();
        assert!(matches!(shared, PersistError::InvalidData(_)));

        let mismatched = Store::from_json(r#"{"note": {"1": {"id": 2}}}"#).unwrap_err();
        assert!(matches!(mismatched, PersistError::InvalidData(_)));
    }

    #[test]
    fn non_numeric_keys_are_rejected() {
        let err = Store::from_json(r#"{"note": {"abc": {}}}"#).unwrap_err();
        assert!(matches!(err, PersistError::Json(_)));
    }
}
