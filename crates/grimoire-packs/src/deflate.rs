//! Embedded item deflation and inflation.
//!
//! Creatures carry copies of library items: the spells they cast, the
//! actions they share with every other creature. When an embedded item is
//! the same as its canonical library item, the source file stores a short
//! reference record instead of the full copy:
//!
//! ```json
//! { "_canonical": "spells.fireball", "location": { "value": "entry0000000001" }, "sort": 200000, "_id": "castFireball0001" }
//! ```
//!
//! Compilation inflates the record back into the full item. For any item
//! that deflates, inflating the record reproduces the item exactly.

use grimoire_content::{Document, DocumentKind, PackType, SanitizeOptions, Sanitizer, fingerprint};
use grimoire_core::{DocumentId, Error, Result, slugify};
use grimoire_links::CompendiumRef;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::CanonicalCache;

/// Key marking a deflated record.
pub const CANONICAL_KEY: &str = "_canonical";

// ============================================================================
// Exemptions
// ============================================================================

/// How a kind's instance-specific field is handled when comparing against
/// the canonical item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exemption {
    /// Compare everything.
    None,
    /// Ignore this field when comparing; carry a differing value as a delta.
    Delta(&'static [&'static str]),
    /// Ignore this field when comparing; carry it in the record's `location`.
    Positional(&'static [&'static str]),
    /// Never deflate.
    Never,
}

impl Exemption {
    /// The exemption that applies to embedded items of `kind`.
    pub fn for_kind(kind: DocumentKind) -> Self {
        use DocumentKind::*;
        match kind {
            Action => Exemption::Delta(&["system", "description", "value"]),
            Spell => Exemption::Positional(&["system", "location"]),
            Armor | Backpack | Consumable | Equipment | Shield | Treasure | Weapon => Exemption::Never,
            Ancestry | Background | Class | Condition | Deity | Effect | Feat | Heritage | Kit | Lore | Melee
            | SpellcastingEntry => Exemption::None,
            Character | Npc | Hazard | Familiar | Vehicle | Loot | JournalEntry | Macro | RollTable => {
                Exemption::Never
            }
        }
    }

    /// Bookkeeping fields of `kind` that say nothing about the item's
    /// content. Both sides drop them before comparing, and an inflated item
    /// takes the canonical item's values.
    pub fn transient_fields(kind: DocumentKind) -> &'static [&'static [&'static str]] {
        use DocumentKind::*;
        match kind {
            Action | Spell | Ancestry | Background | Class | Condition | Deity | Effect | Feat | Heritage | Kit
            | Lore | Melee | SpellcastingEntry => &[&["system", "slug"]],
            _ => &[],
        }
    }

    fn path(&self) -> Option<&'static [&'static str]> {
        match self {
            Exemption::Delta(path) | Exemption::Positional(path) => Some(path),
            Exemption::None | Exemption::Never => None,
        }
    }
}

// ============================================================================
// Deflated record
// ============================================================================

/// Reference-plus-delta stand-in for an embedded item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeflatedItem {
    /// The embedded item's own id.
    #[serde(rename = "_id")]
    pub id: DocumentId,
    /// `<pack>.<slug>` of the canonical item.
    #[serde(rename = "_canonical")]
    pub canonical: String,
    /// Display-order key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<i64>,
    /// Positional field value (a spell's slot location).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Value>,
    /// Partial object tree merged over the canonical item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<Value>,
}

impl DeflatedItem {
    /// Whether a raw embedded item value is a deflated record.
    pub fn is_deflated(value: &Value) -> bool {
        value.get(CANONICAL_KEY).is_some()
    }

    /// Parse a raw record.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::structural(format!("invalid deflated item: {e}")))
    }

    /// Render as JSON.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Split `<pack>.<slug>`.
    pub fn canonical_parts(&self) -> Result<(&str, &str)> {
        self.canonical
            .split_once('.')
            .ok_or_else(|| Error::structural(format!("canonical reference \"{}\" is not <pack>.<slug>", self.canonical)))
    }
}

// ============================================================================
// Deflater
// ============================================================================

/// Deflates and inflates embedded items against canonical library items.
#[derive(Debug)]
pub struct Deflater<'a> {
    system_id: &'a str,
    sanitizer: &'a Sanitizer,
    cache: &'a CanonicalCache,
}

impl<'a> Deflater<'a> {
    /// Create a deflater.
    pub fn new(system_id: &'a str, sanitizer: &'a Sanitizer, cache: &'a CanonicalCache) -> Self {
        Self {
            system_id,
            sanitizer,
            cache,
        }
    }

    /// Deflate `item` if it is the same as its canonical item.
    ///
    /// `item` must already be sanitized as embedded, with its links in name
    /// form. Returns `None` for items that stay as they are.
    pub fn deflate(&self, item: &Document) -> Result<Option<DeflatedItem>> {
        let exemption = Exemption::for_kind(item.kind);
        if exemption == Exemption::Never {
            return Ok(None);
        }

        let Some(origin) = item.compendium_source().and_then(CompendiumRef::parse) else {
            return Ok(None);
        };
        if origin.system != self.system_id || origin.doc_type != PackType::Item.document_name() {
            return Ok(None);
        }
        let slug = slugify(&origin.target);
        let Some(canonical_value) = self.cache.get(&origin.pack, &slug)? else {
            return Ok(None);
        };
        let canonical = Document::from_value((*canonical_value).clone(), PackType::Item)?;
        if canonical.name != origin.target || canonical.kind != item.kind {
            return Ok(None);
        }
        let canonical = self.sanitizer.sanitize(&canonical, SanitizeOptions::default());

        // Compare with instance-specific fields removed from both sides
        let mut clone = item.clone();
        clone.id = canonical.id.clone();
        clone.sort = None;
        clone.fields.remove("_stats");
        let mut reference = canonical.clone();
        for path in Exemption::transient_fields(item.kind) {
            remove_path(&mut clone.fields, path);
            remove_path(&mut reference.fields, path);
        }
        if let Some(path) = exemption.path() {
            remove_path(&mut clone.fields, path);
            remove_path(&mut reference.fields, path);
        }
        let clone = self.sanitizer.sanitize(&clone, SanitizeOptions::default());
        let reference = self.sanitizer.sanitize(&reference, SanitizeOptions::default());
        if fingerprint(&clone.to_value()) != fingerprint(&reference.to_value()) {
            return Ok(None);
        }

        let mut record = DeflatedItem {
            id: item.id.clone(),
            canonical: format!("{}.{slug}", origin.pack),
            sort: item.sort,
            location: None,
            delta: None,
        };
        match exemption {
            Exemption::Positional(path) => {
                if canonical.get_path(path).is_some() {
                    // Absence could not be restored on inflate
                    return Ok(None);
                }
                record.location = item.get_path(path).cloned();
            }
            Exemption::Delta(path) => match (item.get_path(path), canonical.get_path(path)) {
                (Some(ours), Some(theirs)) if ours == theirs => {}
                (Some(ours), _) => {
                    let mut delta = Map::new();
                    set_path(&mut delta, path, ours.clone());
                    record.delta = Some(Value::Object(delta));
                }
                (None, Some(_)) => return Ok(None),
                (None, None) => {}
            },
            Exemption::None | Exemption::Never => {}
        }

        log::trace!("deflated \"{}\" to {}", item.name, record.canonical);
        Ok(Some(record))
    }

    /// Rebuild the full item from a record. `owner` and `pack` name the
    /// containing document for error messages.
    pub fn inflate(&self, record: &DeflatedItem, owner: &str, pack: &str) -> Result<Document> {
        let (canonical_pack, slug) = record.canonical_parts()?;
        let canonical_value = self
            .cache
            .get(canonical_pack, slug)?
            .ok_or_else(|| Error::broken_link(owner, canonical_pack, slug))?;
        let mut value = (*canonical_value).clone();
        let canonical = Document::from_value(value.clone(), PackType::Item).map_err(|e| e.in_document(pack, owner))?;

        let exemption = Exemption::for_kind(canonical.kind);
        if let (Exemption::Positional(path), Some(location)) = (exemption, &record.location) {
            if let Value::Object(map) = &mut value {
                set_path(map, path, location.clone());
            }
        }
        if let Some(delta) = &record.delta {
            deep_merge(&mut value, delta);
        }

        let mut item = Document::from_value(value, PackType::Item).map_err(|e| e.in_document(pack, owner))?;
        item.id = record.id.clone();
        item.sort = record.sort;
        let mut stats = Map::new();
        stats.insert(
            "compendiumSource".into(),
            Value::String(format!(
                "Compendium.{}.{canonical_pack}.{}.{}",
                self.system_id,
                PackType::Item.document_name(),
                canonical.name
            )),
        );
        item.fields.insert("_stats".into(), Value::Object(stats));
        Ok(item)
    }

    /// Inflate every deflated record in a raw container's `items` array.
    ///
    /// Returns the number of items inflated.
    pub fn inflate_container(&self, value: &mut Value, pack: &str) -> Result<usize> {
        let owner = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let Some(Value::Array(items)) = value.get_mut("items") else {
            return Ok(0);
        };
        let mut inflated = 0;
        for slot in items.iter_mut().filter(|v| DeflatedItem::is_deflated(v)) {
            let record = DeflatedItem::from_value(slot.clone()).map_err(|e| e.in_document(pack, &owner))?;
            *slot = self.inflate(&record, &owner, pack)?.to_value();
            inflated += 1;
        }
        Ok(inflated)
    }
}

// ============================================================================
// Object tree helpers
// ============================================================================

fn remove_path(map: &mut Map<String, Value>, path: &[&str]) {
    match path {
        [] => {}
        [key] => {
            map.remove(*key);
        }
        [head, rest @ ..] => {
            if let Some(Value::Object(child)) = map.get_mut(*head) {
                remove_path(child, rest);
            }
        }
    }
}

fn set_path(map: &mut Map<String, Value>, path: &[&str], value: Value) {
    match path {
        [] => {}
        [key] => {
            map.insert((*key).to_string(), value);
        }
        [head, rest @ ..] => {
            let child = map
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                set_path(child, rest, value);
            }
        }
    }
}

/// Merge `patch` into `target`: objects recursively, everything else replaced.
pub fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => deep_merge(existing, value),
                    _ => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}
