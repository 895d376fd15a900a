//! Free-text term matching over item notes.
//!
//! # Responsibility
//! - Compile a whitespace-separated query into a case-insensitive matcher.
//! - Filter one item namespace by the text of each item's name/content.
//!
//! # Invariants
//! - Terms are literal substrings; regex metacharacters carry no meaning.
//! - A record matches when it contains any one term (OR semantics).
//! - A blank query has no terms and matches every record.
//! - Nested note markers are matched as raw text, never resolved.

use crate::model::item::{Item, ItemField};
use crate::model::kind::ItemKind;
use crate::model::note::TEXT_SEPARATOR;
use crate::repo::record_repo::{RepoError, RepoResult};
use crate::store::Store;
use log::debug;
use regex::{Regex, RegexBuilder};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

#[derive(Debug)]
pub enum SearchError {
    /// Query could not be compiled into a matcher.
    InvalidQuery { query: String, message: String },
    Repo(RepoError),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid search query `{query}`: {message}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidQuery { .. } => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for SearchError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Compiled OR-of-substrings matcher.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    terms: Vec<String>,
    pattern: Regex,
}

impl SearchQuery {
    /// Whitespace-separated terms, in query order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Source of the compiled pattern.
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Compiles `search` into a case-insensitive alternation of its terms.
pub fn build_search_query(search: &str) -> SearchResult<SearchQuery> {
    let terms: Vec<String> = search.split_whitespace().map(str::to_string).collect();
    let alternation = terms
        .iter()
        .map(|term| regex::escape(term))
        .collect::<Vec<_>>()
        .join("|");

    let pattern = RegexBuilder::new(&format!("({alternation})"))
        .case_insensitive(true)
        .build()
        .map_err(|err| SearchError::InvalidQuery {
            query: search.to_string(),
            message: err.to_string(),
        })?;

    Ok(SearchQuery { terms, pattern })
}

/// Name text and content text of `item`, joined by the note separator.
pub fn item_text(store: &Store, item: &Item) -> RepoResult<String> {
    let name = item.load_note(store, ItemField::Name)?;
    let content = item.load_note(store, ItemField::Content)?;
    Ok(format!("{}{TEXT_SEPARATOR}{}", name.text(), content.text()))
}

/// Returns every item of `kind` matching `query`, in ascending id order.
pub fn filter_items(store: &Store, kind: ItemKind, query: &SearchQuery) -> SearchResult<Vec<Item>> {
    let mut hits = Vec::new();
    for item in Item::list_all(store, kind) {
        let item = item?;
        if query.is_match(&item_text(store, &item)?) {
            hits.push(item);
        }
    }

    debug!(
        "event=search_filter module=search status=ok kind={} terms={} hits={}",
        kind,
        query.terms().len(),
        hits.len()
    );
    Ok(hits)
}
