//! Canonical item cache.
//!
//! Deflation and inflation look up canonical items by `<pack>.<slug>`.
//! Where the items come from depends on the direction: compilation reads
//! them from the source tree, extraction from the item packs prepared
//! earlier in the same run. [`CanonicalCache`] puts a read-through memo in
//! front of either source and is shared by every per-pack task.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use grimoire_content::PackType;
use grimoire_core::{Error, Result};
use serde_json::Value;

use crate::source::PackDir;

/// Source of canonical items.
pub trait CanonicalLoader: Send + Sync {
    /// Load the item with file slug `slug` from item pack `pack`.
    ///
    /// Returns `Ok(None)` when there is no such item.
    fn load(&self, pack: &str, slug: &str) -> Result<Option<Value>>;
}

/// Loads canonical items from `<source_root>/<pack>.items/<slug>.json`.
#[derive(Clone, Debug)]
pub struct SourceTreeLoader {
    source_root: PathBuf,
}

impl SourceTreeLoader {
    /// Create a loader over `source_root`.
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
        }
    }
}

impl CanonicalLoader for SourceTreeLoader {
    fn load(&self, pack: &str, slug: &str) -> Result<Option<Value>> {
        let path = PackDir::new(&self.source_root, pack, PackType::Item)
            .path
            .join(format!("{slug}.json"));
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path).map_err(|e| Error::io_with_path(e, &path))?;
        let value = serde_json::from_str(&text)
            .map_err(|e| Error::structural(format!("{}: {e}", path.display())))?;
        Ok(Some(value))
    }
}

/// Canonical items already held in memory, keyed by `<pack>.<slug>`.
#[derive(Clone, Debug, Default)]
pub struct PreparedItems {
    items: HashMap<String, Value>,
}

impl PreparedItems {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item of `pack` under its file slug.
    pub fn insert(&mut self, pack: &str, slug: &str, value: Value) {
        self.items.insert(format!("{pack}.{slug}"), value);
    }

    /// Number of items held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no items are held.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl CanonicalLoader for PreparedItems {
    fn load(&self, pack: &str, slug: &str) -> Result<Option<Value>> {
        Ok(self.items.get(&format!("{pack}.{slug}")).cloned())
    }
}

/// Read-through cache of canonical items.
pub struct CanonicalCache {
    loader: Box<dyn CanonicalLoader>,
    entries: Mutex<HashMap<String, Option<Arc<Value>>>>,
}

impl CanonicalCache {
    /// Wrap `loader`.
    pub fn new(loader: impl CanonicalLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The canonical item `<pack>.<slug>`, loading it on first use.
    pub fn get(&self, pack: &str, slug: &str) -> Result<Option<Arc<Value>>> {
        let key = format!("{pack}.{slug}");
        if let Some(entry) = self.lock()?.get(&key) {
            return Ok(entry.clone());
        }

        // Loads run outside the lock; the first one stored wins
        let loaded = self.loader.load(pack, slug)?.map(Arc::new);
        Ok(self.lock()?.entry(key).or_insert(loaded).clone())
    }

    /// Number of keys looked up so far.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether nothing has been looked up yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Option<Arc<Value>>>>> {
        self.entries
            .lock()
            .map_err(|_| Error::task("canonical cache lock poisoned"))
    }
}

impl std::fmt::Debug for CanonicalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanonicalCache")
            .field("entries", &self.len())
            .finish()
    }
}
