//! Canonical JSON rendering.
//!
//! Source files and compiled packs are rendered with a fixed key order so
//! that unchanged input always produces byte-identical output. Keys are
//! sorted alphabetically, except that `_id` and keys shaped like document
//! ids are moved to the end of their object; those keys are noise in a diff
//! and sorting them last keeps meaningful fields together.

use grimoire_core::{Result, looks_like_document_id};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

/// Returns `true` for keys that sort after all other keys.
fn is_id_key(key: &str) -> bool {
    key == "_id" || looks_like_document_id(key)
}

/// Recursively reorder object keys into canonical order.
///
/// # Example
///
/// ```
/// use grimoire_content::json::canonicalize;
/// use serde_json::json;
///
/// let value = canonicalize(json!({ "_id": "0123456789abcdef", "name": "X", "img": "a.webp" }));
/// let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
/// assert_eq!(keys, vec!["img", "name", "_id"]);
/// ```
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| is_id_key(a).cmp(&is_id_key(b)).then_with(|| a.cmp(b)));
            let ordered: Map<String, Value> = entries
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect();
            Value::Object(ordered)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Render a source-tree file: canonical order, four-space indent, trailing newline.
pub fn to_source_string(value: Value) -> Result<String> {
    let value = canonicalize(value);
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    buffer.push(b'\n');
    // serde_json only ever emits UTF-8
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Render one compiled-pack record: canonical order, single line.
pub fn to_compact_line(value: Value) -> Result<String> {
    Ok(serde_json::to_string(&canonicalize(value))?)
}

/// Canonical text used for structural equality checks.
pub fn fingerprint(value: &Value) -> String {
    canonicalize(value.clone()).to_string()
}
