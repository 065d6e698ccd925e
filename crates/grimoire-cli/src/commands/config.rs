//! `grimoire config`.

use std::path::{Path, PathBuf};

use grimoire_core::config::CONFIG_FILE_NAME;
use grimoire_core::{Error, PipelineConfig, Result};

use crate::cli::ConfigAction;
use crate::commands::load_config;

/// Dispatch a config subcommand.
pub fn handle_config_command(config_path: Option<&Path>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Path => cmd_config_path(config_path),
        ConfigAction::Show => cmd_config_show(config_path),
        ConfigAction::Init { file, force } => {
            let path = file
                .or_else(|| config_path.map(Path::to_path_buf))
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            cmd_config_init(&path, force)
        }
    }
}

/// Show the resolved config file path.
pub fn cmd_config_path(config_path: Option<&Path>) -> Result<()> {
    match PipelineConfig::resolver().resolve(config_path) {
        Some(path) => {
            println!("{}", path.display());
            if !path.exists() {
                eprintln!("(file does not exist; run `grimoire config init` to create it)");
            }
            Ok(())
        }
        None => {
            println!("(none; using defaults)");
            Ok(())
        }
    }
}

/// Print the effective configuration as TOML.
pub fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

/// Write a default configuration file.
pub fn cmd_config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::config(format!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(e, parent))?;
    }
    let toml = PipelineConfig::default().to_toml_string()?;
    std::fs::write(path, toml).map_err(|e| Error::io_with_path(e, path))?;
    println!("Config file created at {}", path.display());
    Ok(())
}
