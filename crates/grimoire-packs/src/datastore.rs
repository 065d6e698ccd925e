//! Host runtime datastore reader.
//!
//! Extraction reads packs from the host application's data directory. The
//! system manifest (`system.json`) lists every pack with its name, document
//! type, and the path of its database file. Each database file is an
//! append log of JSON documents, one per line: a later line for an `_id`
//! replaces the earlier one, and a line carrying `"$$deleted": true`
//! removes the document.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use grimoire_content::PackType;
use grimoire_core::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

/// Marker key for deleted records.
const DELETED_KEY: &str = "$$deleted";

/// Host application configuration, as passed to `extract`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    /// Root of the host's user data.
    pub data_path: PathBuf,
}

impl HostConfig {
    /// Read a host config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::config(format!("invalid host config {}: {e}", path.display())))
    }

    /// The manifest of `system_id` inside the host data directory.
    pub fn manifest_path(&self, system_id: &str) -> PathBuf {
        self.data_path
            .join("Data")
            .join("systems")
            .join(system_id)
            .join("system.json")
    }
}

#[derive(Clone, Debug, Deserialize)]
struct ManifestPack {
    name: String,
    #[serde(rename = "type")]
    doc_type: String,
    path: String,
}

#[derive(Clone, Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    packs: Vec<ManifestPack>,
}

/// One pack listed in the manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatastorePack {
    /// Pack name.
    pub name: String,
    /// Collection the pack holds.
    pub pack_type: PackType,
    /// Database file path.
    pub path: PathBuf,
}

/// The packs of one installed game system.
#[derive(Clone, Debug)]
pub struct Datastore {
    packs: Vec<DatastorePack>,
}

impl Datastore {
    /// Open a system manifest. Pack paths are relative to its directory.
    pub fn open(manifest_path: &Path) -> Result<Self> {
        let text = fs::read_to_string(manifest_path).map_err(|e| Error::io_with_path(e, manifest_path))?;
        let manifest: Manifest = serde_json::from_str(&text)
            .map_err(|e| Error::structural(format!("invalid manifest {}: {e}", manifest_path.display())))?;
        let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));

        let mut packs = Vec::with_capacity(manifest.packs.len());
        for entry in manifest.packs {
            let pack_type = PackType::from_document_name(&entry.doc_type).ok_or_else(|| {
                Error::structural(format!(
                    "pack \"{}\" has unsupported document type \"{}\"",
                    entry.name, entry.doc_type
                ))
            })?;
            packs.push(DatastorePack {
                path: base.join(&entry.path),
                name: entry.name,
                pack_type,
            });
        }
        packs.sort_by(|a, b| a.name.cmp(&b.name));
        log::debug!("manifest {} lists {} packs", manifest_path.display(), packs.len());
        Ok(Self { packs })
    }

    /// All packs, ordered by name.
    pub fn packs(&self) -> &[DatastorePack] {
        &self.packs
    }

    /// Look up a pack by name.
    pub fn pack(&self, name: &str) -> Option<&DatastorePack> {
        self.packs.iter().find(|p| p.name == name)
    }
}

impl DatastorePack {
    /// Read the live documents of this pack.
    pub fn read(&self) -> Result<Vec<Value>> {
        let text = fs::read_to_string(&self.path).map_err(|e| Error::io_with_path(e, &self.path))?;
        read_append_log(&text, &self.path)
    }
}

/// Collapse an append log into its live documents, in first-seen order.
pub fn read_append_log(text: &str, path: &Path) -> Result<Vec<Value>> {
    let mut slots: Vec<Option<Value>> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .map_err(|e| Error::structural(format!("{}:{}: {e}", path.display(), line_no + 1)))?;
        let id = value
            .get("_id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::structural(format!("{}:{}: record has no _id", path.display(), line_no + 1)))?
            .to_string();
        let deleted = value.get(DELETED_KEY).and_then(Value::as_bool).unwrap_or(false);

        match (positions.get(&id), deleted) {
            (Some(&at), true) => slots[at] = None,
            (Some(&at), false) => slots[at] = Some(value),
            (None, true) => {}
            (None, false) => {
                positions.insert(id, slots.len());
                slots.push(Some(value));
            }
        }
    }

    Ok(slots.into_iter().flatten().collect())
}
