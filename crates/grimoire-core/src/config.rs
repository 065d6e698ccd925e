//! Pipeline configuration.
//!
//! Configuration lives in a TOML file (`grimoire.toml` by default). Every
//! field has a default, so an empty file or no file at all yields a working
//! configuration for the default system.
//!
//! ```toml
//! system_id = "pf2e"
//! source_root = "packs"
//! output_root = "dist/packs"
//! asset_root = "static"
//! approved_image_formats = ["webp", "svg"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::util::resolver::ConfigResolver;
use crate::{Error, Result};

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "grimoire.toml";

/// Settings shared by the extractor, the compiler, and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Namespace used in `Compendium.<system>.…` links and flag whitelists.
    pub system_id: String,

    /// Root of the source tree (one directory per pack).
    pub source_root: PathBuf,

    /// Directory compiled packs are written to.
    pub output_root: PathBuf,

    /// Directory holding asset files. Image existence is only checked when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_root: Option<PathBuf>,

    /// Prefix stripped from image paths before resolving them against
    /// `asset_root`. Defaults to `systems/<system_id>/`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_prefix: Option<String>,

    /// Prefixes of host-provided assets that are format-checked only.
    pub external_asset_prefixes: Vec<String>,

    /// Image file extensions allowed in documents.
    pub approved_image_formats: Vec<String>,

    /// Redirect table, relative to `source_root` unless absolute.
    pub redirects: PathBuf,

    /// Host system manifest used by `extract` when no host config is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datastore_manifest: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            system_id: "pf2e".to_string(),
            source_root: PathBuf::from("packs"),
            output_root: PathBuf::from("dist/packs"),
            asset_root: None,
            asset_prefix: None,
            external_asset_prefixes: vec!["icons/".to_string()],
            approved_image_formats: vec!["webp".to_string(), "svg".to_string()],
            redirects: PathBuf::from("redirects.json"),
            datastore_manifest: None,
        }
    }
}

impl PipelineConfig {
    /// The resolver used to locate the config file.
    pub fn resolver() -> ConfigResolver {
        ConfigResolver::new("grimoire", CONFIG_FILE_NAME)
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the resolver's discovery
    /// order applies, and defaults are used if nothing is found.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match Self::resolver().resolve(explicit) {
            Some(path) => {
                if !path.is_file() {
                    return Err(Error::config(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
                log::debug!("loading configuration from {}", path.display());
                Self::from_file(&path)
            }
            None => {
                log::debug!("no {CONFIG_FILE_NAME} found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        Self::from_toml(&content)
            .map_err(|e| Error::config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Parse TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Reject settings the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.system_id.is_empty() || self.system_id.contains(['.', '[', ']']) {
            return Err(Error::config(format!(
                "system_id \"{}\" must be non-empty and contain no '.', '[' or ']'",
                self.system_id
            )));
        }
        if self.approved_image_formats.is_empty() {
            return Err(Error::config("approved_image_formats must not be empty"));
        }
        Ok(())
    }

    /// Prefix that maps image paths into `asset_root`.
    pub fn asset_prefix(&self) -> String {
        self.asset_prefix
            .clone()
            .unwrap_or_else(|| format!("systems/{}/", self.system_id))
    }

    /// Redirect table location.
    pub fn redirects_path(&self) -> PathBuf {
        crate::util::paths::resolve_against(&self.source_root, &self.redirects)
    }

    /// Re-root every relative path against `base`.
    pub fn rooted_at(mut self, base: &Path) -> Self {
        use crate::util::paths::resolve_against;

        self.source_root = resolve_against(base, &self.source_root);
        self.output_root = resolve_against(base, &self.output_root);
        self.asset_root = self.asset_root.map(|p| resolve_against(base, &p));
        self.datastore_manifest = self.datastore_manifest.map(|p| resolve_against(base, &p));
        self
    }
}
