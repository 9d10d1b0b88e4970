//! Configuration file
//!
//! JSON, one section per subsystem. Unknown keys are rejected. Optionally
//! expanded against the environment before parsing, then overridden by
//! explicit CLI flags.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::args::ConfigOverrides;
use super::errors::{CliError, CliResult};
use crate::adapter::AdapterConfig;
use crate::http_server::HttpServerConfig;
use crate::observability::Severity;
use crate::store::StoreConfig;

/// Complete process configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub server: HttpServerConfig,

    #[serde(default)]
    pub adapter: AdapterConfig,

    /// Minimum severity written to the log (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            server: HttpServerConfig::default(),
            adapter: AdapterConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Read and parse a configuration file. Validation is left to the
    /// caller so that CLI overrides can be applied first.
    pub fn load(path: &Path, expand_env: bool) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;
        Self::parse(&content, expand_env)
    }

    pub fn parse(content: &str, expand_env: bool) -> CliResult<Self> {
        let content = if expand_env {
            expand_env_with(content, |key| std::env::var(key).ok())?
        } else {
            content.to_string()
        };
        serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))
    }

    /// Replace file values with every flag that was given
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(addresses) = &overrides.store_addresses {
            self.store.addresses = addresses.clone();
        }
        if let Some(port) = overrides.store_port {
            self.store.port = port;
        }
        if let Some(database) = &overrides.store_database {
            self.store.database = database.clone();
        }
        if let Some(username) = &overrides.store_username {
            self.store.username = Some(username.clone());
        }
        if let Some(password) = &overrides.store_password {
            self.store.password = Some(password.clone());
        }
        if let Some(port) = overrides.listen_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> CliResult<()> {
        self.store.validate().map_err(CliError::config_error)?;
        self.server.validate().map_err(CliError::config_error)?;
        self.adapter.validate().map_err(CliError::config_error)?;
        self.log_severity()?;
        Ok(())
    }

    pub fn log_severity(&self) -> CliResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| {
            CliError::config_error(format!(
                "Invalid log_level: '{}'. Expected trace, info, warn, error or fatal.",
                self.log_level
            ))
        })
    }

    /// Copy safe to print
    pub fn redacted(&self) -> Self {
        Self {
            store: self.store.redacted(),
            ..self.clone()
        }
    }
}

const ENV_REFERENCE: &str = r"\$\{([^}]*)\}|\$([A-Za-z0-9_]+)";

static ENV_PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

fn env_pattern() -> CliResult<&'static Regex> {
    ENV_PATTERN
        .get_or_init(|| Regex::new(ENV_REFERENCE))
        .as_ref()
        .map_err(|e| CliError::config_error(format!("Invalid env reference pattern: {}", e)))
}

/// Replace `${VAR}`, `$VAR` and `${VAR:default}` using `lookup`.
///
/// Undefined or empty variables become the default if one is given, the
/// empty string otherwise.
pub fn expand_env_with<F>(input: &str, lookup: F) -> CliResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let expanded = env_pattern()?
        .replace_all(input, |caps: &Captures| {
            let reference = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let (key, default) = match reference.split_once(':') {
                Some((key, default)) => (key, Some(default)),
                None => (reference, None),
            };
            match lookup(key).filter(|v| !v.is_empty()) {
                Some(value) => value,
                None => default.unwrap_or_default().to_string(),
            }
        })
        .into_owned();
    Ok(expanded)
}
