//! Slug and document-id utilities.
//!
//! Slugs are the filesystem-safe names documents are stored under in the
//! source tree. Document ids are the fixed-length opaque identifiers the host
//! runtime assigns.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Length of every document id.
pub const DOCUMENT_ID_LEN: usize = 16;

/// Derive a filesystem-safe slug from a document name.
///
/// Performs the following transformations:
/// 1. Converts to lowercase
/// 2. Drops apostrophes (so "Dragon's Breath" becomes "dragons-breath")
/// 3. Treats every other non-alphanumeric character as a separator
/// 4. Collapses separator runs into single hyphens and trims them
///
/// The result is stable: slugifying a slug returns it unchanged.
///
/// # Examples
///
/// ```
/// use grimoire_core::util::ids::slugify;
///
/// assert_eq!(slugify("Potion of Healing (Lesser)"), "potion-of-healing-lesser");
/// assert_eq!(slugify("Dragon's Breath"), "dragons-breath");
/// assert_eq!(slugify("  Mixed   Case  "), "mixed-case");
/// assert_eq!(slugify("already-a-slug"), "already-a-slug");
/// ```
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '\'' | '\u{2019}'))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join("-")
}

/// Compute the slug a source file was stored under.
///
/// Returns `None` if the path has no UTF-8 file stem.
pub fn slug_from_path(path: &Path) -> Option<String> {
    path.file_stem().and_then(|s| s.to_str()).map(String::from)
}

/// Returns `true` if `value` has the shape of a document id.
pub fn looks_like_document_id(value: &str) -> bool {
    value.len() == DOCUMENT_ID_LEN && value.bytes().all(|b| b.is_ascii_alphanumeric())
}

// ============================================================================
// DocumentId
// ============================================================================

/// Fixed-length opaque document identifier.
///
/// Immutable once assigned and unique within its pack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Validates and wraps an id.
    ///
    /// # Examples
    ///
    /// ```
    /// use grimoire_core::util::ids::DocumentId;
    ///
    /// let id = DocumentId::parse("AbCdEfGh12345678").unwrap();
    /// assert_eq!(id.as_str(), "AbCdEfGh12345678");
    /// assert!(DocumentId::parse("too-short").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self> {
        if looks_like_document_id(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(Error::structural(format!(
                "\"{value}\" is not a valid document id ({DOCUMENT_ID_LEN} alphanumeric characters)"
            )))
        }
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
