//! # grimoire-cli
//!
//! The `grimoire` command:
//!
//! - `build`: compile the source tree into runtime packs
//! - `extract <pack|all> [host-config]`: pull packs from the host datastore
//! - `config path|show|init`: inspect or create `grimoire.toml`

#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;

use cli::{Cli, Command};
use commands::extract::ExtractArgs;

/// Run a parsed command line.
pub async fn run(cli: Cli) -> grimoire_core::Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Build => {
            let config = commands::load_config(config_path)?;
            commands::build::cmd_build(config).await?;
        }
        Command::Extract {
            pack,
            host_config,
            disable_presort,
            log_warnings,
        } => {
            let config = commands::load_config(config_path)?;
            let args = ExtractArgs {
                pack,
                host_config,
                disable_presort,
                log_warnings,
            };
            commands::extract::cmd_extract(config, args).await?;
        }
        Command::Config { action } => commands::config::handle_config_command(config_path, action)?,
    }
    Ok(())
}
