//! Note domain model.
//!
//! # Responsibility
//! - Hold flattened note text plus nesting and back-reference metadata.
//! - Convert mixed text/nested-note content into stable string entries.
//!
//! # Invariants
//! - `flat_content` never holds an in-memory reference; nested notes are
//!   embedded as id markers, so they must be saved before flattening.
//! - `children` mirrors the marker ids currently present in `flat_content`.
//! - Root notes start at depth 1.
//! - Only [`flatten`] emits markers. Literal text that would parse as a
//!   marker is stored with one extra leading [`LITERAL_ESCAPE`] and shown
//!   without it by [`Note::text`].

use crate::model::kind::{RecordId, RecordKind};
use crate::model::RecordFields;
use crate::repo::record_repo::{Record, RepoError, RepoResult};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;

/// Prefix that distinguishes a nested-note marker from literal text.
pub const NOTE_MARKER_PREFIX: &str = "@@note:";

/// Prefix added to stored literal fragments that would otherwise read as markers.
pub const LITERAL_ESCAPE: char = '\\';

/// Separator used when joining note fragments into searchable text.
pub const TEXT_SEPARATOR: &str = " ";

/// Depth assigned to notes that are not nested in another note.
pub const ROOT_DEPTH: u32 = 1;

/// One unflattened content entry.
#[derive(Debug, Clone, Copy)]
pub enum ContentEntry<'a> {
    Text(&'a str),
    Nested(&'a Note),
}

impl<'a> From<&'a str> for ContentEntry<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(value)
    }
}

impl<'a> From<&'a String> for ContentEntry<'a> {
    fn from(value: &'a String) -> Self {
        Self::Text(value.as_str())
    }
}

impl<'a> From<&'a Note> for ContentEntry<'a> {
    fn from(value: &'a Note) -> Self {
        Self::Nested(value)
    }
}

/// Text carrier referenced by items and, through markers, by other notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    /// `None` until the first save.
    pub id: Option<RecordId>,
    /// Literal fragments and nested-note markers, in order.
    pub flat_content: Vec<String>,
    /// Ids of items that use this note as their name or content.
    pub mentions: BTreeSet<RecordId>,
    pub depth: u32,
    /// Ids of notes nested in `flat_content`.
    pub children: BTreeSet<RecordId>,
}

impl Default for Note {
    fn default() -> Self {
        Self {
            id: None,
            flat_content: Vec::new(),
            mentions: BTreeSet::new(),
            depth: ROOT_DEPTH,
            children: BTreeSet::new(),
        }
    }
}

impl Note {
    /// Unsaved root note with no content.
    pub fn new() -> Self {
        Self::default()
    }

    /// Unsaved root note holding the given literal fragments.
    ///
    /// Fragments are always literal, even when they look like markers.
    pub fn from_strings<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flat_content: fragments
                .into_iter()
                .map(|fragment| escape_literal(&Into::<String>::into(fragment)))
                .collect(),
            ..Self::default()
        }
    }

    /// Unsaved empty note one level below `parent`.
    pub fn nested_under(parent: &Note) -> Self {
        Self {
            depth: parent.depth.saturating_add(1),
            ..Self::default()
        }
    }

    /// Replaces content with the flattened form of `entries`.
    ///
    /// Leaves the note untouched when any nested note is unsaved.
    pub fn set_content(&mut self, entries: &[ContentEntry<'_>]) -> RepoResult<()> {
        let flat = flatten(entries)?;
        self.children = flat.iter().filter_map(|entry| is_note_marker(entry)).collect();
        self.flat_content = flat;
        Ok(())
    }

    /// Fragments joined by [`TEXT_SEPARATOR`]; markers are left as raw strings.
    pub fn text(&self) -> String {
        self.flat_content
            .iter()
            .map(|entry| unescape_literal(entry))
            .collect::<Vec<_>>()
            .join(TEXT_SEPARATOR)
    }
}

/// Flattens content entries into stable strings.
///
/// # Errors
/// - `UnsavedNestedReference` when a nested note has no id yet.
pub fn flatten(entries: &[ContentEntry<'_>]) -> RepoResult<Vec<String>> {
    entries
        .iter()
        .enumerate()
        .map(|(position, entry)| match entry {
            ContentEntry::Text(text) => Ok(escape_literal(text)),
            ContentEntry::Nested(note) => note
                .id
                .map(note_marker)
                .ok_or(RepoError::UnsavedNestedReference { position }),
        })
        .collect()
}

/// Marker string embedding a nested note id.
pub fn note_marker(id: RecordId) -> String {
    format!("{NOTE_MARKER_PREFIX}{id}")
}

/// Returns the referenced id when `entry` is a nested-note marker.
pub fn is_note_marker(entry: &str) -> Option<RecordId> {
    entry.strip_prefix(NOTE_MARKER_PREFIX)?.parse().ok()
}

/// Stored form of a literal fragment.
///
/// Text that reads as a marker once its leading escapes are stripped gains
/// one more escape, so it can never be taken for a nested reference.
pub fn escape_literal(text: &str) -> String {
    if is_note_marker(text.trim_start_matches(LITERAL_ESCAPE)).is_some() {
        format!("{LITERAL_ESCAPE}{text}")
    } else {
        text.to_string()
    }
}

/// Display form of a stored entry; inverse of [`escape_literal`].
fn unescape_literal(entry: &str) -> &str {
    match entry.strip_prefix(LITERAL_ESCAPE) {
        Some(rest) if is_note_marker(rest.trim_start_matches(LITERAL_ESCAPE)).is_some() => rest,
        _ => entry,
    }
}

#[derive(Deserialize)]
struct StoredNote {
    id: Option<RecordId>,
    #[serde(default)]
    flat_content: Vec<String>,
    #[serde(default)]
    mentions: BTreeSet<RecordId>,
    #[serde(default = "root_depth")]
    depth: u32,
    #[serde(default)]
    children: BTreeSet<RecordId>,
}

fn root_depth() -> u32 {
    ROOT_DEPTH
}

impl Record for Note {
    fn kind(&self) -> RecordKind {
        RecordKind::Note
    }

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: Option<RecordId>) {
        self.id = id;
    }

    fn to_fields(&self) -> RecordFields {
        let mut fields = RecordFields::new();
        fields.insert("id".to_string(), json!(self.id));
        fields.insert("flat_content".to_string(), json!(self.flat_content));
        fields.insert("mentions".to_string(), json!(self.mentions));
        fields.insert("depth".to_string(), json!(self.depth));
        fields.insert("children".to_string(), json!(self.children));
        fields
    }

    fn from_fields(kind: RecordKind, fields: &RecordFields) -> RepoResult<Self> {
        if kind != RecordKind::Note {
            return Err(RepoError::InvalidData(format!(
                "note cannot be decoded from `{kind}` namespace"
            )));
        }
        let stored: StoredNote = serde_json::from_value(Value::Object(fields.clone()))
            .map_err(|err| RepoError::InvalidData(format!("invalid note fields: {err}")))?;
        Ok(Self {
            id: stored.id,
            flat_content: stored.flat_content,
            mentions: stored.mentions,
            depth: stored.depth,
            children: stored.children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{escape_literal, flatten, is_note_marker, note_marker, ContentEntry, Note};
    use crate::repo::record_repo::{Record, RepoError};
    use crate::RecordKind;

    #[test]
    fn marker_roundtrips_and_rejects_plain_text() {
        assert_eq!(note_marker(42), "@@note:42");
        assert_eq!(is_note_marker(&note_marker(42)), Some(42));
        assert_eq!(is_note_marker("42"), None);
        assert_eq!(is_note_marker("@@note:abc"), None);
    }

    #[test]
    fn flatten_rejects_unsaved_nested_note() {
        let nested = Note::new();
        let err = flatten(&[ContentEntry::Text("intro"), ContentEntry::Nested(&nested)])
            .unwrap_err();
        assert!(matches!(err, RepoError::UnsavedNestedReference { position: 1 }));
    }

    #[test]
    fn set_content_tracks_children_and_keeps_old_content_on_error() {
        let mut saved = Note::new();
        saved.id = Some(7);
        let unsaved = Note::new();

        let mut parent = Note::from_strings(["before"]);
        parent
            .set_content(&["see".into(), (&saved).into()])
            .unwrap();
        assert_eq!(parent.flat_content, vec!["see".to_string(), note_marker(7)]);
        assert!(parent.children.contains(&7));

        parent.set_content(&[(&unsaved).into()]).unwrap_err();
        assert_eq!(parent.flat_content.len(), 2);
    }

    #[test]
    fn text_joins_fragments_without_resolving_markers() {
        let mut note = Note::from_strings(["a"]);
        note.flat_content.push(note_marker(3));
        note.flat_content.push("b".to_string());
        assert_eq!(note.text(), "a @@note:3 b");
    }

    #[test]
    fn literal_marker_text_is_escaped() {
        let note = Note::from_strings(["@@note:3", "\\@@note:3", "\\plain"]);
        assert_eq!(
            note.flat_content,
            vec!["\\@@note:3", "\\\\@@note:3", "\\plain"]
        );
        assert!(note.flat_content.iter().all(|entry| is_note_marker(entry).is_none()));
        assert_eq!(note.text(), "@@note:3 \\@@note:3 \\plain");

        let flat = flatten(&[ContentEntry::Text("@@note:9")]).unwrap();
        assert_eq!(flat, vec![escape_literal("@@note:9")]);
        assert_eq!(is_note_marker(&flat[0]), None);
    }

    #[test]
    fn nested_note_is_one_level_deeper() {
        let root = Note::new();
        assert_eq!(root.depth, 1);
        assert_eq!(Note::nested_under(&root).depth, 2);
    }

    #[test]
    fn fields_decode_back_to_same_note() {
        let mut note = Note::from_strings(["x", "y"]);
        note.id = Some(3);
        note.mentions.insert(1);
        let decoded = Note::from_fields(RecordKind::Note, &note.to_fields()).unwrap();
        assert_eq!(decoded, note);

        let err = Note::from_fields(RecordKind::Proof, &note.to_fields()).unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(_)));
    }
}
