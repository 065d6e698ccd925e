//! Document model.
//!
//! A [`Document`] is one content record: a creature, an item, a journal
//! entry, a macro, a roll table. Fields the pipeline reasons about are typed
//! (`id`, `name`, `kind`, `img`, `sort`, embedded `items`); everything else is
//! carried through untouched in `fields`.
//!
//! Documents are read from and written to `serde_json::Value` explicitly
//! rather than through a derive, because the shape of the `type` tag depends
//! on the pack the document lives in.

use std::fmt;
use std::str::FromStr;

use grimoire_core::{DocumentId, Error, Result, slugify};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// PackType
// ============================================================================

/// The document collection a pack holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PackType {
    /// Creatures, hazards, and other statblock-bearing actors.
    Actor,
    /// Items of every kind.
    Item,
    /// Journal entries.
    JournalEntry,
    /// Macros.
    Macro,
    /// Roll tables.
    RollTable,
}

impl PackType {
    /// All pack types.
    pub const ALL: [PackType; 5] = [
        PackType::Actor,
        PackType::Item,
        PackType::JournalEntry,
        PackType::Macro,
        PackType::RollTable,
    ];

    /// Source directory extension (`bestiary.actors`).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Actor => "actors",
            Self::Item => "items",
            Self::JournalEntry => "journals",
            Self::Macro => "macros",
            Self::RollTable => "tables",
        }
    }

    /// Inverse of [`extension`](Self::extension).
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.extension() == ext)
    }

    /// Document type name used in `Compendium.<system>.<pack>.<DocType>.<id>` links.
    pub fn document_name(&self) -> &'static str {
        match self {
            Self::Actor => "Actor",
            Self::Item => "Item",
            Self::JournalEntry => "JournalEntry",
            Self::Macro => "Macro",
            Self::RollTable => "RollTable",
        }
    }

    /// Inverse of [`document_name`](Self::document_name).
    pub fn from_document_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.document_name() == name)
    }

    /// Whether documents of this collection carry a `type` tag naming their kind.
    pub fn has_kind_tag(&self) -> bool {
        matches!(self, Self::Actor | Self::Item)
    }
}

impl fmt::Display for PackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.document_name())
    }
}

// ============================================================================
// DocumentKind
// ============================================================================

/// Closed set of document kinds the pipeline knows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentKind {
    // Actors
    Character,
    Npc,
    Hazard,
    Familiar,
    Vehicle,
    Loot,
    // Items
    Action,
    Ancestry,
    Armor,
    Background,
    Backpack,
    Class,
    Condition,
    Consumable,
    Deity,
    Effect,
    Equipment,
    Feat,
    Heritage,
    Kit,
    Lore,
    Melee,
    Shield,
    Spell,
    SpellcastingEntry,
    Treasure,
    Weapon,
    // Untagged collections
    JournalEntry,
    Macro,
    RollTable,
}

const KIND_TAGS: &[(DocumentKind, &str)] = &[
    (DocumentKind::Character, "character"),
    (DocumentKind::Npc, "npc"),
    (DocumentKind::Hazard, "hazard"),
    (DocumentKind::Familiar, "familiar"),
    (DocumentKind::Vehicle, "vehicle"),
    (DocumentKind::Loot, "loot"),
    (DocumentKind::Action, "action"),
    (DocumentKind::Ancestry, "ancestry"),
    (DocumentKind::Armor, "armor"),
    (DocumentKind::Background, "background"),
    (DocumentKind::Backpack, "backpack"),
    (DocumentKind::Class, "class"),
    (DocumentKind::Condition, "condition"),
    (DocumentKind::Consumable, "consumable"),
    (DocumentKind::Deity, "deity"),
    (DocumentKind::Effect, "effect"),
    (DocumentKind::Equipment, "equipment"),
    (DocumentKind::Feat, "feat"),
    (DocumentKind::Heritage, "heritage"),
    (DocumentKind::Kit, "kit"),
    (DocumentKind::Lore, "lore"),
    (DocumentKind::Melee, "melee"),
    (DocumentKind::Shield, "shield"),
    (DocumentKind::Spell, "spell"),
    (DocumentKind::SpellcastingEntry, "spellcastingEntry"),
    (DocumentKind::Treasure, "treasure"),
    (DocumentKind::Weapon, "weapon"),
];

impl DocumentKind {
    /// The `type` tag written in JSON, or `None` for untagged collections.
    pub fn tag(&self) -> Option<&'static str> {
        KIND_TAGS
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, tag)| *tag)
    }

    /// The collection documents of this kind belong to.
    pub fn pack_type(&self) -> PackType {
        match self {
            Self::Character | Self::Npc | Self::Hazard | Self::Familiar | Self::Vehicle | Self::Loot => {
                PackType::Actor
            }
            Self::JournalEntry => PackType::JournalEntry,
            Self::Macro => PackType::Macro,
            Self::RollTable => PackType::RollTable,
            _ => PackType::Item,
        }
    }

    /// Resolve the kind of a document stored in a pack of `pack_type`.
    pub fn resolve(pack_type: PackType, tag: Option<&str>) -> Result<Self> {
        match pack_type {
            PackType::JournalEntry => Ok(Self::JournalEntry),
            PackType::Macro => Ok(Self::Macro),
            PackType::RollTable => Ok(Self::RollTable),
            PackType::Actor | PackType::Item => {
                let tag = tag.ok_or_else(|| Error::structural("missing \"type\" field"))?;
                let kind: Self = tag.parse()?;
                if kind.pack_type() != pack_type {
                    return Err(Error::integrity(format!(
                        "document type \"{tag}\" does not belong in an {pack_type} pack"
                    )));
                }
                Ok(kind)
            }
        }
    }

    /// Whether documents of this kind own embedded items.
    pub fn is_container(&self) -> bool {
        self.pack_type() == PackType::Actor
    }

    /// Physical items: things with bulk, price, and size.
    pub fn is_physical(&self) -> bool {
        matches!(
            self,
            Self::Armor
                | Self::Backpack
                | Self::Consumable
                | Self::Equipment
                | Self::Shield
                | Self::Treasure
                | Self::Weapon
        )
    }
}

impl FromStr for DocumentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        KIND_TAGS
            .iter()
            .find(|(_, tag)| *tag == s)
            .map(|(kind, _)| *kind)
            .ok_or_else(|| Error::structural(format!("unrecognized document type \"{s}\"")))
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            Some(tag) => f.write_str(tag),
            None => write!(f, "{}", self.pack_type()),
        }
    }
}

// ============================================================================
// Document
// ============================================================================

/// One content record.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    /// Fixed-length opaque identifier, unique within its pack.
    pub id: DocumentId,
    /// Human-readable name; drives the source filename.
    pub name: String,
    /// What kind of document this is.
    pub kind: DocumentKind,
    /// Image path, omitted when unset.
    pub img: Option<String>,
    /// Display-order key, meaningful for embedded items.
    pub sort: Option<i64>,
    /// Embedded items (container kinds only).
    pub items: Vec<Document>,
    /// Every other field, passed through untouched.
    pub fields: Map<String, Value>,
}

impl Document {
    /// Parse a document stored in a pack of `pack_type`.
    pub fn from_value(value: Value, pack_type: PackType) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(Error::structural("document is not a JSON object"));
        };

        let name = match fields.remove("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name,
            Some(Value::String(_)) => return Err(Error::structural("document has an empty name")),
            Some(_) => return Err(Error::structural("document name is not a string")),
            None => return Err(Error::structural("document is missing a name")),
        };

        let id = match fields.remove("_id") {
            Some(Value::String(id)) => {
                DocumentId::parse(&id).map_err(|e| Error::structural(format!("{e} in \"{name}\"")))?
            }
            _ => return Err(Error::structural(format!("\"{name}\" is missing an _id"))),
        };

        let kind = if pack_type.has_kind_tag() {
            let tag = match fields.remove("type") {
                Some(Value::String(tag)) => Some(tag),
                Some(_) => return Err(Error::structural(format!("\"{name}\" has a non-string type"))),
                None => None,
            };
            DocumentKind::resolve(pack_type, tag.as_deref())
                .map_err(|e| e.in_document(pack_type.document_name(), &name))?
        } else {
            DocumentKind::resolve(pack_type, None)?
        };

        let img = match fields.remove("img") {
            None | Some(Value::Null) => None,
            Some(Value::String(img)) => Some(img),
            Some(_) => return Err(Error::structural(format!("\"{name}\" has a non-string img"))),
        };

        let sort = match fields.remove("sort") {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.as_i64().ok_or_else(|| {
                Error::structural(format!("\"{name}\" has a non-integer sort"))
            })?),
        };

        let items = if kind.is_container() {
            match fields.remove("items") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items
                    .into_iter()
                    .map(|item| Document::from_value(item, PackType::Item))
                    .collect::<Result<Vec<_>>>()
                    .map_err(|e| e.in_document("embedded", &name))?,
                Some(_) => return Err(Error::structural(format!("\"{name}\" has a non-array items field"))),
            }
        } else {
            Vec::new()
        };

        Ok(Self {
            id,
            name,
            kind,
            img,
            sort,
            items,
            fields,
        })
    }

    /// Render back into JSON.
    ///
    /// Key order is not significant here; writers canonicalize it.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("_id".into(), Value::String(self.id.to_string()));
        map.insert("name".into(), Value::String(self.name.clone()));
        if let Some(tag) = self.kind.tag() {
            map.insert("type".into(), Value::String(tag.to_string()));
        }
        if let Some(img) = &self.img {
            map.insert("img".into(), Value::String(img.clone()));
        }
        if let Some(sort) = self.sort {
            map.insert("sort".into(), Value::from(sort));
        }
        if self.kind.is_container() {
            map.insert(
                "items".into(),
                Value::Array(self.items.iter().map(Document::to_value).collect()),
            );
        }
        for (key, value) in &self.fields {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }

    /// Source filename: `<slug>.json`.
    pub fn filename(&self) -> String {
        format!("{}.json", self.slug())
    }

    /// Slug derived from the name.
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    /// Walk a dotted path through `fields`.
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.fields.get(*first)?;
        for key in rest {
            current = current.as_object()?.get(*key)?;
        }
        Some(current)
    }

    /// Mutable variant of [`get_path`](Self::get_path).
    pub fn get_path_mut(&mut self, path: &[&str]) -> Option<&mut Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.fields.get_mut(*first)?;
        for key in rest {
            current = current.as_object_mut()?.get_mut(*key)?;
        }
        Some(current)
    }

    /// `system.<path>` as a string.
    pub fn system_str(&self, path: &[&str]) -> Option<&str> {
        let mut full = vec!["system"];
        full.extend_from_slice(path);
        self.get_path(&full).and_then(Value::as_str)
    }

    /// Spell level (`system.level.value`), if any.
    pub fn level(&self) -> Option<i64> {
        self.get_path(&["system", "level", "value"]).and_then(Value::as_i64)
    }

    /// `system.slug`, if set.
    pub fn slug_field(&self) -> Option<&str> {
        self.system_str(&["slug"])
    }

    /// Action category tag (`system.actionCategory.value`).
    pub fn action_category(&self) -> Option<&str> {
        self.system_str(&["actionCategory", "value"])
    }

    /// Weapon type tag of a melee item (`system.weaponType.value`).
    pub fn weapon_type(&self) -> Option<&str> {
        self.system_str(&["weaponType", "value"])
    }

    /// Origin reference of an embedded item (`_stats.compendiumSource`).
    pub fn compendium_source(&self) -> Option<&str> {
        self.get_path(&["_stats", "compendiumSource"]).and_then(Value::as_str)
    }
}
