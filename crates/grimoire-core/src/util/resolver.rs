//! Config file resolution.
//!
//! `ConfigResolver` locates a project's configuration file using an
//! environment variable, a marker search upward from a starting directory,
//! and a per-user fallback under the platform config directory.
//!
//! # Example
//!
//! ```no_run
//! use grimoire_core::util::resolver::ConfigResolver;
//!
//! let resolver = ConfigResolver::new("grimoire", "grimoire.toml");
//!
//! // Checks GRIMOIRE_CONFIG, then ./grimoire.toml and its ancestors,
//! // then ~/.config/grimoire/grimoire.toml
//! if let Some(path) = resolver.config_file() {
//!     println!("Config: {}", path.display());
//! }
//! ```

use std::env;
use std::path::{Path, PathBuf};

use crate::util::paths::{expand_tilde, find_dir_with_marker};

/// Configurable config-file resolver for a project.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    /// Project name (e.g., "grimoire")
    project_name: String,
    /// Environment variable prefix (e.g., "GRIMOIRE")
    env_prefix: String,
    /// Config file name searched for (e.g., "grimoire.toml")
    file_name: String,
    /// Directory the upward marker search starts from
    search_start: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create a new resolver for the given project and config file name.
    ///
    /// The project name is converted to an environment variable prefix:
    /// - "grimoire" → "GRIMOIRE"
    /// - "my-packs" → "MY_PACKS"
    pub fn new(project_name: &str, file_name: &str) -> Self {
        let env_prefix = project_name.to_uppercase().replace(['-', ' '], "_");

        Self {
            project_name: project_name.to_string(),
            env_prefix,
            file_name: file_name.to_string(),
            search_start: env::current_dir().ok(),
        }
    }

    /// Start the upward search from `dir` instead of the working directory.
    pub fn with_search_start(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_start = Some(dir.into());
        self
    }

    /// Get the environment variable name for a given suffix.
    ///
    /// # Example
    /// ```
    /// use grimoire_core::util::resolver::ConfigResolver;
    ///
    /// let resolver = ConfigResolver::new("grimoire", "grimoire.toml");
    /// assert_eq!(resolver.env_var("CONFIG"), "GRIMOIRE_CONFIG");
    /// ```
    pub fn env_var(&self, suffix: &str) -> String {
        format!("{}_{}", self.env_prefix, suffix)
    }

    /// Per-user default location of the config file.
    pub fn user_config_file(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(&self.project_name).join(&self.file_name))
    }

    /// Resolve an existing config file.
    ///
    /// Checks in order:
    /// 1. `{PROJECT}_CONFIG` environment variable
    /// 2. Walk up from the search start looking for the config file name
    /// 3. Per-user config directory
    pub fn config_file(&self) -> Option<PathBuf> {
        if let Ok(path) = env::var(self.env_var("CONFIG")) {
            let path = expand_tilde(&path);
            if path.is_file() {
                return Some(path);
            }
            log::warn!(
                "{} points at {}, which does not exist",
                self.env_var("CONFIG"),
                path.display()
            );
        }

        if let Some(start) = &self.search_start {
            if let Some(dir) = find_dir_with_marker(start, &self.file_name) {
                return Some(dir.join(&self.file_name));
            }
        }

        self.user_config_file().filter(|path| path.is_file())
    }

    /// Resolve an explicitly requested path, falling back to discovery.
    pub fn resolve(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(path) => Some(expand_tilde(&path.to_string_lossy())),
            None => self.config_file(),
        }
    }

    /// Get the project name.
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Get the environment variable prefix.
    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }
}
