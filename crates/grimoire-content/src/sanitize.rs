//! Document sanitizer and pruner.
//!
//! Source files hold only what a human should review. [`Sanitizer::sanitize`]
//! takes a document as read from the host runtime (or from a hand-edited
//! source file) and returns a copy with:
//!
//! - host-runtime state removed (ownership grants, per-install `_stats`,
//!   sheet-only scratch keys, foreign flag namespaces),
//! - redundant representations normalized (legacy origin flags, string
//!   levels, unsorted trait lists, messy description HTML),
//! - fields equal to their schema default omitted.
//!
//! Embedded items are sanitized in the context of their parent: they keep
//! their `sort` key and their origin reference, and only the system's own
//! flag namespace survives.

use grimoire_core::{Result, util::ids::slugify};
use serde_json::{Map, Value};

use crate::document::{Document, DocumentKind, PackType};
use crate::html::clean_description;

/// Keys holding sheet-only scratch state, removed at any depth.
const RUNTIME_KEYS: &[&str] = &["_modifiers", "_sheetTab", "_ui"];

/// Top-level keys holding per-install state.
const HOST_STATE_KEYS: &[&str] = &["ownership", "permission"];

/// Host default images: an unset image is the same thing.
const HOST_DEFAULT_IMAGES: &[&str] = &["icons/svg/mystery-man.svg", "icons/svg/item-bag.svg"];

/// Description-bearing HTML fields, relative to the document root.
const HTML_FIELDS: &[&[&str]] = &[
    &["system", "description", "value"],
    &["system", "description", "gm"],
    &["system", "details", "publicNotes"],
    &["system", "details", "privateNotes"],
    &["content"],
];

/// Which documents a default applies to.
#[derive(Clone, Copy, Debug)]
enum Applies {
    Any,
    Kind(DocumentKind),
    Actors,
}

/// A field omitted from source form when it holds its default value.
struct DefaultField {
    applies: Applies,
    path: &'static [&'static str],
    default: fn() -> Value,
}

fn empty_string() -> Value {
    Value::String(String::new())
}

fn empty_array() -> Value {
    Value::Array(Vec::new())
}

fn null() -> Value {
    Value::Null
}

fn common() -> Value {
    Value::String("common".into())
}

const DEFAULT_FIELDS: &[DefaultField] = &[
    DefaultField { applies: Applies::Any, path: &["system", "description", "gm"], default: empty_string },
    DefaultField { applies: Applies::Any, path: &["system", "rules"], default: empty_array },
    DefaultField { applies: Applies::Any, path: &["system", "slug"], default: null },
    DefaultField { applies: Applies::Any, path: &["system", "traits", "otherTags"], default: empty_array },
    DefaultField { applies: Applies::Any, path: &["system", "traits", "rarity"], default: common },
    DefaultField { applies: Applies::Any, path: &["effects"], default: empty_array },
    DefaultField { applies: Applies::Any, path: &["folder"], default: null },
    DefaultField { applies: Applies::Kind(DocumentKind::Spell), path: &["system", "location", "value"], default: null },
    DefaultField { applies: Applies::Kind(DocumentKind::Action), path: &["system", "requirements", "value"], default: empty_string },
    DefaultField { applies: Applies::Kind(DocumentKind::Action), path: &["system", "trigger", "value"], default: empty_string },
    DefaultField { applies: Applies::Actors, path: &["system", "details", "privateNotes"], default: empty_string },
];

impl Applies {
    fn matches(&self, kind: DocumentKind) -> bool {
        match self {
            Applies::Any => true,
            Applies::Kind(k) => *k == kind,
            Applies::Actors => kind.pack_type() == PackType::Actor,
        }
    }
}

/// Options for one sanitize call.
#[derive(Clone, Copy, Debug, Default)]
pub struct SanitizeOptions {
    /// The document is an embedded item, sanitized within its parent.
    pub embedded: bool,
}

impl SanitizeOptions {
    /// Options for an embedded item.
    pub fn embedded() -> Self {
        Self { embedded: true }
    }
}

/// Sanitizer bound to one game system's flag namespace.
#[derive(Clone, Debug)]
pub struct Sanitizer {
    system_id: String,
}

impl Sanitizer {
    /// Create a sanitizer for `system_id`.
    pub fn new(system_id: impl Into<String>) -> Self {
        Self {
            system_id: system_id.into(),
        }
    }

    /// Parse and sanitize a raw document.
    ///
    /// Input that cannot be read as a document is a structural error.
    pub fn sanitize_value(&self, value: Value, pack_type: PackType, options: SanitizeOptions) -> Result<Document> {
        let document = Document::from_value(value, pack_type)?;
        Ok(self.sanitize(&document, options))
    }

    /// Return a sanitized copy of `document`.
    pub fn sanitize(&self, document: &Document, options: SanitizeOptions) -> Document {
        let mut doc = document.clone();

        for key in HOST_STATE_KEYS {
            doc.fields.remove(*key);
        }
        for value in doc.fields.values_mut() {
            prune_runtime_keys(value);
        }

        self.normalize_stats(&mut doc, options);
        self.filter_flags(&mut doc, options);

        if !options.embedded {
            doc.sort = None;
        }
        if doc
            .img
            .as_deref()
            .is_some_and(|img| HOST_DEFAULT_IMAGES.contains(&img))
        {
            doc.img = None;
        }

        normalize_system(&mut doc);
        clean_html_fields(&mut doc);
        elide_defaults(&mut doc);

        let items = std::mem::take(&mut doc.items);
        doc.items = items
            .iter()
            .map(|item| self.sanitize(item, SanitizeOptions::embedded()))
            .collect();

        doc
    }

    /// Flag namespaces kept in source form.
    fn flag_whitelist(&self, options: SanitizeOptions) -> Vec<&str> {
        if options.embedded {
            vec![self.system_id.as_str()]
        } else {
            vec![self.system_id.as_str(), "core"]
        }
    }

    /// Move a legacy `flags.core.sourceId` into `_stats.compendiumSource`,
    /// then reduce `_stats` to what the document keeps.
    fn normalize_stats(&self, doc: &mut Document, options: SanitizeOptions) {
        let legacy_source = doc
            .fields
            .get_mut("flags")
            .and_then(Value::as_object_mut)
            .and_then(|flags| flags.get_mut("core"))
            .and_then(Value::as_object_mut)
            .and_then(|core| core.remove("sourceId"))
            .filter(|v| v.is_string());

        let source = doc
            .compendium_source()
            .map(|s| Value::String(s.to_string()))
            .or(legacy_source);

        doc.fields.remove("_stats");
        if options.embedded {
            if let Some(source) = source {
                let mut stats = Map::new();
                stats.insert("compendiumSource".into(), source);
                doc.fields.insert("_stats".into(), Value::Object(stats));
            }
        }
    }

    fn filter_flags(&self, doc: &mut Document, options: SanitizeOptions) {
        let whitelist = self.flag_whitelist(options);
        let empty = match doc.fields.get_mut("flags") {
            Some(Value::Object(flags)) => {
                flags.retain(|namespace, value| {
                    whitelist.contains(&namespace.as_str()) && value.as_object().is_some_and(|m| !m.is_empty())
                });
                flags.is_empty()
            }
            Some(_) => true,
            None => false,
        };
        if empty {
            doc.fields.remove("flags");
        }
    }
}

/// Remove sheet-only scratch keys at any depth.
fn prune_runtime_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !RUNTIME_KEYS.contains(&key.as_str()));
            for child in map.values_mut() {
                prune_runtime_keys(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(prune_runtime_keys),
        _ => {}
    }
}

/// Coerce string levels to numbers and put trait lists in canonical order.
fn normalize_system(doc: &mut Document) {
    if let Some(level) = doc.get_path_mut(&["system", "level", "value"]) {
        if let Some(parsed) = level.as_str().and_then(|s| s.trim().parse::<i64>().ok()) {
            *level = Value::from(parsed);
        }
    }

    if let Some(Value::Array(traits)) = doc.get_path_mut(&["system", "traits", "value"]) {
        if traits.iter().all(Value::is_string) {
            let mut names: Vec<String> = traits
                .iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect();
            names.sort();
            names.dedup();
            *traits = names.into_iter().map(Value::String).collect();
        }
    }
}

fn clean_html_fields(doc: &mut Document) {
    for path in HTML_FIELDS {
        if let Some(Value::String(html)) = doc.get_path_mut(path) {
            *html = clean_description(html);
        }
    }

    // Journal pages carry their own text blocks
    if let Some(Value::Array(pages)) = doc.fields.get_mut("pages") {
        for page in pages {
            if let Some(Value::String(html)) = page
                .get_mut("text")
                .and_then(|text| text.get_mut("content"))
            {
                *html = clean_description(html);
            }
        }
    }
}

fn elide_defaults(doc: &mut Document) {
    let kind = doc.kind;
    for field in DEFAULT_FIELDS.iter().filter(|f| f.applies.matches(kind)) {
        if doc.get_path(field.path) == Some(&(field.default)()) {
            remove_path(&mut doc.fields, field.path);
        }
    }
}

/// Remove the value at `path`, then any parent objects left empty by it.
///
/// The top-level key itself is only removed when the path has one segment.
fn remove_path(root: &mut Map<String, Value>, path: &[&str]) {
    match path {
        [] => {}
        [key] => {
            root.remove(*key);
        }
        [head, rest @ ..] => {
            if let Some(Value::Object(child)) = root.get_mut(*head) {
                remove_nested(child, rest);
            }
        }
    }
}

fn remove_nested(map: &mut Map<String, Value>, path: &[&str]) {
    match path {
        [] => {}
        [key] => {
            map.remove(*key);
        }
        [head, rest @ ..] => {
            if let Some(Value::Object(child)) = map.get_mut(*head) {
                remove_nested(child, rest);
                if child.is_empty() {
                    map.remove(*head);
                }
            }
        }
    }
}

/// Warn-worthy mismatch between `system.slug` and the slug of the name.
///
/// Returns the expected slug when the stored one differs.
pub fn slug_mismatch(doc: &Document) -> Option<String> {
    let stored = doc.slug_field()?;
    let expected = slugify(&doc.name);
    (stored != expected).then_some(expected)
}

/// Every HTML text block of `doc`, journal page text included.
pub fn html_texts(doc: &Document) -> Vec<&str> {
    let mut texts: Vec<&str> = HTML_FIELDS
        .iter()
        .filter_map(|path| doc.get_path(path))
        .filter_map(Value::as_str)
        .collect();
    if let Some(Value::Array(pages)) = doc.fields.get("pages") {
        texts.extend(
            pages
                .iter()
                .filter_map(|page| page.get("text").and_then(|text| text.get("content")))
                .filter_map(Value::as_str),
        );
    }
    texts
}
