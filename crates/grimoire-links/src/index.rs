//! Link index: name and id lookups for every pack.
//!
//! The index is built in two phases. A [`LinkIndexBuilder`] is populated
//! with every document of every pack taking part in a run, then frozen with
//! [`LinkIndexBuilder::finish`]. Resolution only happens against the frozen
//! [`LinkIndex`], so a link may point at any document of any pack no matter
//! which pack is processed first.
//!
//! Embedded items are indexed under their parent, so links of the form
//! `<actor>.Item.<item>` can be resolved in either direction.

use std::collections::HashMap;

use grimoire_content::Document;
use grimoire_core::{Error, Result};

// ============================================================================
// Entry tables
// ============================================================================

/// Bidirectional name/id table for one scope (a pack, or one parent's items).
#[derive(Clone, Debug, Default)]
struct Entries {
    names_by_id: HashMap<String, String>,
    ids_by_name: HashMap<String, String>,
}

impl Entries {
    fn register(&mut self, scope: &str, id: &str, name: &str) -> Result<()> {
        if let Some(existing) = self.names_by_id.get(id) {
            if existing == name {
                return Ok(());
            }
            return Err(Error::integrity(format!(
                "id \"{id}\" is used by both \"{existing}\" and \"{name}\" in {scope}"
            )));
        }
        self.names_by_id.insert(id.to_string(), name.to_string());
        // First registration of a name wins
        self.ids_by_name
            .entry(name.to_string())
            .or_insert_with(|| id.to_string());
        Ok(())
    }

    fn len(&self) -> usize {
        self.names_by_id.len()
    }
}

#[derive(Clone, Debug, Default)]
struct PackEntries {
    documents: Entries,
    embedded: HashMap<String, Entries>,
}

// ============================================================================
// Builder
// ============================================================================

/// Populates a [`LinkIndex`].
///
/// Registering the same id twice with the same name is a no-op; the same id
/// under a different name is an integrity error.
#[derive(Debug, Default)]
pub struct LinkIndexBuilder {
    packs: HashMap<String, PackEntries>,
}

impl LinkIndexBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `pack` known to the index, even if it ends up empty.
    pub fn declare_pack(&mut self, pack: &str) {
        self.packs.entry(pack.to_string()).or_default();
    }

    /// Register a top-level document.
    pub fn register(&mut self, pack: &str, id: &str, name: &str) -> Result<()> {
        self.packs
            .entry(pack.to_string())
            .or_default()
            .documents
            .register(&format!("pack \"{pack}\""), id, name)
    }

    /// Register an embedded item under its parent.
    pub fn register_embedded(&mut self, pack: &str, parent_id: &str, id: &str, name: &str) -> Result<()> {
        self.packs
            .entry(pack.to_string())
            .or_default()
            .embedded
            .entry(parent_id.to_string())
            .or_default()
            .register(&format!("embedded items of \"{parent_id}\" in pack \"{pack}\""), id, name)
    }

    /// Register a document and all of its embedded items.
    pub fn register_document(&mut self, pack: &str, document: &Document) -> Result<()> {
        let parent = document.id.as_str();
        self.register(pack, parent, &document.name)?;
        for item in &document.items {
            self.register_embedded(pack, parent, item.id.as_str(), &item.name)?;
        }
        Ok(())
    }

    /// Freeze the index.
    pub fn finish(self) -> LinkIndex {
        let documents: usize = self.packs.values().map(|p| p.documents.len()).sum();
        log::debug!("link index frozen: {} packs, {documents} documents", self.packs.len());
        LinkIndex { packs: self.packs }
    }
}

// ============================================================================
// Frozen index
// ============================================================================

/// Read-only name/id lookups, shared across per-pack tasks.
#[derive(Debug, Default)]
pub struct LinkIndex {
    packs: HashMap<String, PackEntries>,
}

impl LinkIndex {
    /// Whether `pack` took part in the run.
    pub fn has_pack(&self, pack: &str) -> bool {
        self.packs.contains_key(pack)
    }

    /// Names of all indexed packs, sorted.
    pub fn pack_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.packs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of top-level documents indexed for `pack`.
    pub fn document_count(&self, pack: &str) -> usize {
        self.packs.get(pack).map_or(0, |p| p.documents.len())
    }

    /// Id of the document named `name` in `pack`.
    pub fn id_of(&self, pack: &str, name: &str) -> Option<&str> {
        self.packs
            .get(pack)?
            .documents
            .ids_by_name
            .get(name)
            .map(String::as_str)
    }

    /// Name of the document with `id` in `pack`.
    pub fn name_of(&self, pack: &str, id: &str) -> Option<&str> {
        self.packs
            .get(pack)?
            .documents
            .names_by_id
            .get(id)
            .map(String::as_str)
    }

    /// Id of the item named `name` embedded in `parent_id`.
    pub fn embedded_id_of(&self, pack: &str, parent_id: &str, name: &str) -> Option<&str> {
        self.packs
            .get(pack)?
            .embedded
            .get(parent_id)?
            .ids_by_name
            .get(name)
            .map(String::as_str)
    }

    /// Name of the item with `id` embedded in `parent_id`.
    pub fn embedded_name_of(&self, pack: &str, parent_id: &str, id: &str) -> Option<&str> {
        self.packs
            .get(pack)?
            .embedded
            .get(parent_id)?
            .names_by_id
            .get(id)
            .map(String::as_str)
    }

    /// Resolve a name to an id, failing with `BrokenLink` on behalf of `source_doc`.
    pub fn resolve_to_id(&self, pack: &str, name: &str, source_doc: &str) -> Result<&str> {
        self.id_of(pack, name)
            .ok_or_else(|| Error::broken_link(source_doc, pack, name))
    }

    /// Resolve an id to a name, failing with `BrokenLink` on behalf of `source_doc`.
    pub fn resolve_to_name(&self, pack: &str, id: &str, source_doc: &str) -> Result<&str> {
        self.name_of(pack, id)
            .ok_or_else(|| Error::broken_link(source_doc, pack, id))
    }
}
