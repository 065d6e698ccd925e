//! Compile-time document validation.
//!
//! Everything here is checked before any compiled output is written:
//! images, enumerated fields, the pack a document lives in, and sibling
//! references between embedded items.

use std::collections::HashSet;
use std::path::Path;

use grimoire_content::{Document, DocumentKind, PackType, has_inline_image, html_texts, slug_mismatch};
use grimoire_core::{Diagnostics, Error, PipelineConfig, Result};
use serde_json::Value;

/// Creature and item sizes.
pub const SIZES: &[&str] = &["tiny", "sm", "med", "lg", "huge", "grg"];

/// Weapon proficiency categories.
pub const WEAPON_CATEGORIES: &[&str] = &["unarmed", "simple", "martial", "advanced"];

/// Validates documents of one run.
#[derive(Debug)]
pub struct Validator<'a> {
    config: &'a PipelineConfig,
    diagnostics: &'a Diagnostics,
}

impl<'a> Validator<'a> {
    /// Create a validator.
    pub fn new(config: &'a PipelineConfig, diagnostics: &'a Diagnostics) -> Self {
        Self { config, diagnostics }
    }

    /// Validate a top-level document of `pack` and its embedded items.
    pub fn validate_document(&self, pack: &str, pack_type: PackType, document: &Document) -> Result<()> {
        self.check_document(pack_type, document)
            .map_err(|e| e.in_document(pack, &document.name))?;

        if let Some(expected) = slug_mismatch(document) {
            self.diagnostics.warn(format!(
                "\"{}\" in pack \"{pack}\" has system.slug \"{}\" but its name slugifies to \"{expected}\"",
                document.name,
                document.slug_field().unwrap_or_default()
            ));
        }
        Ok(())
    }

    fn check_document(&self, pack_type: PackType, document: &Document) -> Result<()> {
        if document.kind.pack_type() != pack_type {
            return Err(Error::integrity(format!(
                "document type \"{}\" does not belong in an {pack_type} pack",
                document.kind
            )));
        }

        if let Some(img) = &document.img {
            self.check_image(img)?;
        }
        if let Some(texture) = document
            .get_path(&["prototypeToken", "texture", "src"])
            .and_then(Value::as_str)
        {
            self.check_image(texture)
                .map_err(|e| prefix(e, "token image: "))?;
        }
        check_inline_html(document)?;
        self.check_enums(document)?;

        let sibling_ids: HashSet<&str> = document.items.iter().map(|i| i.id.as_str()).collect();
        for item in &document.items {
            if item.kind.pack_type() != PackType::Item {
                return Err(Error::integrity(format!(
                    "embedded item \"{}\" has non-item type \"{}\"",
                    item.name, item.kind
                )));
            }
            if let Some(img) = &item.img {
                self.check_image(img)
                    .map_err(|e| prefix(e, &format!("embedded item \"{}\": ", item.name)))?;
            }
            check_inline_html(item)
                .map_err(|e| prefix(e, &format!("embedded item \"{}\": ", item.name)))?;
            self.check_enums(item)?;
            self.check_linked_weapon(item, &sibling_ids)?;
        }
        Ok(())
    }

    /// Inline data is rejected, the format must be approved, and local
    /// assets must exist when an asset root is configured.
    pub fn check_image(&self, img: &str) -> Result<()> {
        if img.starts_with("data:") {
            return Err(Error::policy("inline image data is not allowed"));
        }

        let extension = Path::new(img)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !self
            .config
            .approved_image_formats
            .iter()
            .any(|f| f.eq_ignore_ascii_case(&extension))
        {
            return Err(Error::policy(format!(
                "image \"{img}\" is not in an approved format ({})",
                self.config.approved_image_formats.join(", ")
            )));
        }

        if self
            .config
            .external_asset_prefixes
            .iter()
            .any(|p| img.starts_with(p.as_str()))
        {
            return Ok(());
        }

        if let Some(asset_root) = &self.config.asset_root {
            let prefix = self.config.asset_prefix();
            let relative = img.strip_prefix(prefix.as_str()).unwrap_or(img);
            if !asset_root.join(relative).is_file() {
                return Err(Error::integrity(format!("image \"{img}\" does not exist")));
            }
        }
        Ok(())
    }

    fn check_enums(&self, document: &Document) -> Result<()> {
        let size = if document.kind.pack_type() == PackType::Actor {
            document.system_str(&["traits", "size", "value"])
        } else if document.kind.is_physical() {
            document.system_str(&["size"])
        } else {
            None
        };
        if let Some(size) = size {
            if !SIZES.contains(&size) {
                return Err(Error::integrity(format!(
                    "\"{}\" has unknown size \"{size}\"",
                    document.name
                )));
            }
        }

        if document.kind == DocumentKind::Weapon {
            if let Some(category) = document.system_str(&["category"]) {
                if !WEAPON_CATEGORIES.contains(&category) {
                    return Err(Error::integrity(format!(
                        "\"{}\" has unknown weapon category \"{category}\"",
                        document.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// A melee item's linked weapon must be one of its siblings.
    fn check_linked_weapon(&self, item: &Document, sibling_ids: &HashSet<&str>) -> Result<()> {
        if item.kind != DocumentKind::Melee {
            return Ok(());
        }
        let linked = item
            .get_path(&["flags", self.config.system_id.as_str(), "linkedWeapon"])
            .and_then(Value::as_str);
        match linked {
            Some(id) if !sibling_ids.contains(id) => Err(Error::integrity(format!(
                "melee item \"{}\" links to weapon \"{id}\", which is not among its siblings",
                item.name
            ))),
            _ => Ok(()),
        }
    }
}

/// Descriptions, notes and journal pages must reference images by path.
fn check_inline_html(document: &Document) -> Result<()> {
    if html_texts(document).into_iter().any(has_inline_image) {
        return Err(Error::policy("inline image data in HTML text is not allowed"));
    }
    Ok(())
}

fn prefix(error: Error, context: &str) -> Error {
    match error {
        Error::Policy { message } => Error::policy(format!("{context}{message}")),
        Error::Integrity { message } => Error::integrity(format!("{context}{message}")),
        other => other,
    }
}
