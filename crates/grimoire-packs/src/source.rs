//! Source tree and compiled pack files.
//!
//! A source tree holds one directory per pack, named `<pack>.<ext>`
//! (`bestiary.actors`, `spells.items`), with one `<slug>.json` file per
//! document. Compiled packs are single `<pack>.db` files holding one
//! compact JSON document per line.

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use grimoire_content::PackType;
use grimoire_core::{Error, Result};
use serde_json::Value;

/// Compiled pack file extension.
pub const COMPILED_EXTENSION: &str = "db";

// ============================================================================
// Pack directories
// ============================================================================

/// One pack directory in the source tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackDir {
    /// Pack name.
    pub name: String,
    /// Collection the pack holds.
    pub pack_type: PackType,
    /// Directory path.
    pub path: PathBuf,
}

impl PackDir {
    /// The pack directory for `name` under `source_root`.
    pub fn new(source_root: &Path, name: &str, pack_type: PackType) -> Self {
        Self {
            name: name.to_string(),
            pack_type,
            path: source_root.join(Self::dir_name(name, pack_type)),
        }
    }

    /// `<name>.<ext>`.
    pub fn dir_name(name: &str, pack_type: PackType) -> String {
        format!("{name}.{}", pack_type.extension())
    }

    /// Parse a directory path into a pack, if its extension names a pack type.
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        let (name, ext) = file_name.rsplit_once('.')?;
        let pack_type = PackType::from_extension(ext)?;
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            pack_type,
            path: path.to_path_buf(),
        })
    }
}

/// A source file read from a pack directory.
#[derive(Clone, Debug)]
pub struct SourceFile {
    /// Full path.
    pub path: PathBuf,
    /// File name (`<slug>.json`).
    pub filename: String,
    /// Parsed content.
    pub value: Value,
}

fn glob_paths(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).map_err(|e| Error::config(format!("invalid glob \"{pattern}\": {e}")))?;
    let mut found = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => found.push(path),
            Err(e) => {
                let path = e.path().to_path_buf();
                return Err(Error::io_with_path(e.into_error(), path));
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Find every pack directory under `source_root`, ordered by name.
pub fn discover_packs(source_root: &Path) -> Result<Vec<PackDir>> {
    if !source_root.is_dir() {
        return Err(Error::config(format!(
            "source root {} is not a directory",
            source_root.display()
        )));
    }
    let pattern = format!("{}/*.*", Pattern::escape(&source_root.to_string_lossy()));
    let mut packs: Vec<PackDir> = glob_paths(&pattern)?
        .into_iter()
        .filter(|path| path.is_dir())
        .filter_map(|path| PackDir::from_path(&path))
        .collect();
    packs.sort_by(|a, b| a.name.cmp(&b.name));

    for pair in packs.windows(2) {
        if pair[0].name == pair[1].name {
            return Err(Error::integrity(format!(
                "pack \"{}\" has more than one directory ({} and {})",
                pair[0].name,
                pair[0].path.display(),
                pair[1].path.display()
            )));
        }
    }
    log::debug!("discovered {} packs under {}", packs.len(), source_root.display());
    Ok(packs)
}

/// Read every `*.json` file of a pack, ordered by file name.
pub fn read_pack(pack: &PackDir) -> Result<Vec<SourceFile>> {
    let pattern = format!("{}/*.json", Pattern::escape(&pack.path.to_string_lossy()));
    let mut files = Vec::new();
    for path in glob_paths(&pattern)? {
        let text = fs::read_to_string(&path).map_err(|e| Error::io_with_path(e, &path))?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| Error::structural(format!("{}: {e}", path.display())))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        files.push(SourceFile { path, filename, value });
    }
    Ok(files)
}

/// Replace a pack directory wholesale with `files` (`(file name, contents)`).
pub fn write_pack(pack: &PackDir, files: &[(String, String)]) -> Result<()> {
    if pack.path.exists() {
        fs::remove_dir_all(&pack.path).map_err(|e| Error::io_with_path(e, &pack.path))?;
    }
    fs::create_dir_all(&pack.path).map_err(|e| Error::io_with_path(e, &pack.path))?;
    for (filename, contents) in files {
        let path = pack.path.join(filename);
        fs::write(&path, contents).map_err(|e| Error::io_with_path(e, &path))?;
    }
    log::debug!("wrote {} files to {}", files.len(), pack.path.display());
    Ok(())
}

// ============================================================================
// Compiled packs
// ============================================================================

/// Path of the compiled file for `name`.
pub fn compiled_path(output_root: &Path, name: &str) -> PathBuf {
    output_root.join(format!("{name}.{COMPILED_EXTENSION}"))
}

/// Write a compiled pack: one line per document, newline-terminated.
pub fn write_compiled(output_root: &Path, name: &str, lines: &[String]) -> Result<PathBuf> {
    fs::create_dir_all(output_root).map_err(|e| Error::io_with_path(e, output_root))?;
    let path = compiled_path(output_root, name);
    let mut contents = String::new();
    for line in lines {
        contents.push_str(line);
        contents.push('\n');
    }
    fs::write(&path, contents).map_err(|e| Error::io_with_path(e, &path))?;
    Ok(path)
}
