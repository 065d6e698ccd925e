//! Subcommand handlers.

pub mod build;
pub mod config;
pub mod extract;

use std::path::Path;

use grimoire_core::{PipelineConfig, Result};

/// Load the pipeline configuration.
///
/// Relative paths in a config file are taken relative to the file's own
/// directory; defaults are relative to the working directory.
pub fn load_config(explicit: Option<&Path>) -> Result<PipelineConfig> {
    let config = PipelineConfig::load(explicit)?;
    let base = PipelineConfig::resolver()
        .resolve(explicit)
        .filter(|path| path.is_file())
        .and_then(|path| path.parent().map(Path::to_path_buf));
    Ok(match base {
        Some(dir) if !dir.as_os_str().is_empty() => config.rooted_at(&dir),
        _ => config,
    })
}
