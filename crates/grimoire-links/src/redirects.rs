//! Redirect table for renamed or moved link targets.
//!
//! When a document is renamed or moved to another pack, source text still
//! naming the old target can be pointed at the new one without touching
//! every reference. The table maps `"<pack>.<old target>"` to
//! `"<pack>.<new target>"` and is consulted only when compiling.

use std::collections::HashMap;
use std::path::Path;

use grimoire_core::{Error, Result};

/// Compile-direction link redirects.
#[derive(Clone, Debug, Default)]
pub struct RedirectTable {
    entries: HashMap<String, String>,
}

impl RedirectTable {
    /// An empty table.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from explicit entries.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = HashMap::new();
        for (from, to) in entries {
            let (from, to) = (from.into(), to.into());
            for key in [&from, &to] {
                if !key.contains('.') {
                    return Err(Error::config(format!(
                        "redirect \"{key}\" is not of the form <pack>.<target>"
                    )));
                }
            }
            table.insert(from, to);
        }
        Ok(Self { entries: table })
    }

    /// Load a JSON redirect file. A missing file is an empty table.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no redirect table at {}", path.display());
            return Ok(Self::empty());
        }
        let text = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        let entries: HashMap<String, String> = serde_json::from_str(&text)
            .map_err(|e| Error::config(format!("invalid redirect table {}: {e}", path.display())))?;
        let table = Self::from_entries(entries)?;
        log::debug!("loaded {} redirects from {}", table.len(), path.display());
        Ok(table)
    }

    /// Redirected `(pack, target)` for a reference, if one is recorded.
    pub fn apply(&self, pack: &str, target: &str) -> Option<(&str, &str)> {
        self.entries
            .get(&format!("{pack}.{target}"))
            .and_then(|to| to.split_once('.'))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
