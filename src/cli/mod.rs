//! CLI module for docindex
//!
//! Provides command-line interface for:
//! - start: Connect to the store and serve RPC calls
//! - check-config: Validate and print the effective configuration

mod args;
mod commands;
mod config;
mod errors;

pub use args::{Cli, Command, ConfigOverrides, ConfigSource};
pub use commands::{check_config, resolve_config, run, run_command, start};
pub use config::{expand_env_with, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
