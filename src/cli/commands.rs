//! CLI command implementations
//!
//! Boot sequence for `start`:
//! 1. Load config, apply flags, validate
//! 2. Connect to the store and ping it (failure is fatal)
//! 3. Build the adapter over the shared handle
//! 4. Serve RPC calls until the listener stops

use std::io::{self, Write};

use super::args::{Cli, Command, ConfigOverrides, ConfigSource};
use super::config::Config;
use super::errors::{CliError, CliResult};
use crate::adapter::IndexStore;
use crate::http_server::HttpServer;
use crate::observability::{log_event, log_event_with_fields, Event, Logger};
use crate::store::ConnectionManager;

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Start { source, overrides } => start(&source, &overrides),
        Command::CheckConfig { source, overrides } => check_config(&source, &overrides),
    }
}

/// Load, override and validate the configuration
pub fn resolve_config(source: &ConfigSource, overrides: &ConfigOverrides) -> CliResult<Config> {
    let mut config = Config::load(&source.config, source.expand_env)?;
    config.apply_overrides(overrides);
    config.validate()?;
    Ok(config)
}

/// Connect to the store and serve until the listener stops
pub fn start(source: &ConfigSource, overrides: &ConfigOverrides) -> CliResult<()> {
    log_event(Event::BootStart);

    let config = resolve_config(source, overrides)?;
    Logger::set_min_severity(config.log_severity()?);
    let path = source.config.display().to_string();
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("database", config.store.database.as_str()),
            ("path", path.as_str()),
        ],
    );

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        let handle = ConnectionManager::connect(&config.store)
            .await
            .map_err(|e| CliError::connect_failed(e.to_string()))?;

        let store = IndexStore::new(handle, config.adapter.clone());
        HttpServer::new(store, config.server.clone())
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Print the effective configuration, password redacted
pub fn check_config(source: &ConfigSource, overrides: &ConfigOverrides) -> CliResult<()> {
    let config = resolve_config(source, overrides)?;
    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&mut stdout, &config.redacted())?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
