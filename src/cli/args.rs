//! CLI argument definitions using clap
//!
//! Commands:
//! - docindex start --config <path> [overrides]
//! - docindex check-config --config <path> [overrides]

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// docindex - index and chunk store over a document database
#[derive(Parser, Debug)]
#[command(name = "docindex")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to the store and serve RPC calls
    Start {
        #[command(flatten)]
        source: ConfigSource,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },

    /// Load and validate the configuration, print it with secrets redacted
    CheckConfig {
        #[command(flatten)]
        source: ConfigSource,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },
}

/// Where the configuration file comes from
#[derive(Args, Debug, Clone)]
pub struct ConfigSource {
    /// Path to configuration file
    #[arg(long, default_value = "./docindex.json")]
    pub config: PathBuf,

    /// Expand ${VAR}, $VAR and ${VAR:default} in the file before parsing
    #[arg(long = "config-expand-env")]
    pub expand_env: bool,
}

/// Flags that take precedence over the configuration file
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Store host address
    #[arg(long)]
    pub store_addresses: Option<String>,

    /// Store port
    #[arg(long)]
    pub store_port: Option<u16>,

    /// Database holding every table
    #[arg(long)]
    pub store_database: Option<String>,

    /// Store username
    #[arg(long)]
    pub store_username: Option<String>,

    /// Store password
    #[arg(long)]
    pub store_password: Option<String>,

    /// RPC listen port
    #[arg(long)]
    pub listen_port: Option<u16>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_with_overrides() {
        let cli = Cli::parse_from([
            "docindex",
            "start",
            "--config",
            "/etc/docindex.json",
            "--config-expand-env",
            "--store-port",
            "27018",
            "--listen-port",
            "7000",
        ]);

        match cli.command {
            Command::Start { source, overrides } => {
                assert_eq!(source.config, PathBuf::from("/etc/docindex.json"));
                assert!(source.expand_env);
                assert_eq!(overrides.store_port, Some(27018));
                assert_eq!(overrides.listen_port, Some(7000));
                assert_eq!(overrides.store_database, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_check_config_defaults() {
        let cli = Cli::parse_from(["docindex", "check-config"]);
        match cli.command {
            Command::CheckConfig { source, overrides } => {
                assert_eq!(source.config, PathBuf::from("./docindex.json"));
                assert!(!source.expand_env);
                assert_eq!(overrides, ConfigOverrides::default());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
