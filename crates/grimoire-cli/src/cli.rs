//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Grimoire - content build pipeline for game compendium packs
#[derive(Parser, Debug)]
#[command(name = "grimoire")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "GRIMOIRE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile the source tree into runtime packs
    Build,

    /// Extract packs from the host datastore into the source tree
    Extract {
        /// Pack to extract, or `all`
        pack: String,

        /// Host application config (JSON with `dataPath`)
        host_config: Option<PathBuf>,

        /// Keep embedded items in their stored order
        #[arg(long = "disablePresort")]
        disable_presort: bool,

        /// Log non-fatal warnings
        #[arg(
            long = "logWarnings",
            action = ArgAction::Set,
            num_args = 0..=1,
            default_value_t = true,
            default_missing_value = "true"
        )]
        log_warnings: bool,
    },

    /// Configuration file operations
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path
    Path,
    /// Print the effective configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Where to write it (defaults to ./grimoire.toml)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_extract_defaults() {
        match parse(&["grimoire", "extract", "all"]).command {
            Command::Extract {
                pack,
                host_config,
                disable_presort,
                log_warnings,
            } => {
                assert_eq!(pack, "all");
                assert!(host_config.is_none());
                assert!(!disable_presort);
                assert!(log_warnings);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_extract_flags() {
        let cli = parse(&[
            "grimoire",
            "extract",
            "bestiary",
            "/srv/host/options.json",
            "--disablePresort",
            "--logWarnings",
            "false",
        ]);
        match cli.command {
            Command::Extract {
                pack,
                host_config,
                disable_presort,
                log_warnings,
            } => {
                assert_eq!(pack, "bestiary");
                assert_eq!(host_config, Some(PathBuf::from("/srv/host/options.json")));
                assert!(disable_presort);
                assert!(!log_warnings);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_bare_log_warnings_flag() {
        let cli = parse(&["grimoire", "extract", "all", "--logWarnings"]);
        assert!(matches!(cli.command, Command::Extract { log_warnings: true, .. }));
    }

    #[test]
    fn test_global_config() {
        let cli = parse(&["grimoire", "build", "--config", "custom.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Command::Build));
    }

    #[test]
    fn test_config_init() {
        let cli = parse(&["grimoire", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Init { force: true, .. }
            }
        ));
    }
}
