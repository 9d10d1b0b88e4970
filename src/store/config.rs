//! Document store connection settings

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which document store implementation to connect to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process store; nothing survives a restart
    Memory,
    /// MongoDB, requires the `mongo` cargo feature
    Mongo,
}

/// Store connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Backend (default: "memory")
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    /// Host address of the store (default: "localhost")
    #[serde(default = "default_addresses")]
    pub addresses: String,

    /// Port the store listens on (default: 27017)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database holding every table (required)
    #[serde(default)]
    pub database: String,

    /// Username for password authentication
    #[serde(default)]
    pub username: Option<String>,

    /// Password for password authentication
    #[serde(default)]
    pub password: Option<String>,

    /// Per-operation timeout in milliseconds (default: 10000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Connect and ping timeout in milliseconds (default: 5000)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_backend() -> BackendKind {
    BackendKind::Memory
}

fn default_addresses() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    27017
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            addresses: default_addresses(),
            port: default_port(),
            database: String::new(),
            username: None,
            password: None,
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// In-memory store on the given database, defaults elsewhere
    pub fn memory(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Default::default()
        }
    }

    /// Connection URI without credentials, e.g. `mongodb://localhost:27017`
    pub fn connection_uri(&self) -> String {
        format!("mongodb://{}:{}", self.addresses, self.port)
    }

    /// Username and password, if authentication is configured.
    ///
    /// Empty strings count as unset.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().filter(|s| !s.is_empty())?;
        let password = self.password.as_deref().filter(|s| !s.is_empty())?;
        Some((username, password))
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Checks the settings, returning a description of the first problem
    pub fn validate(&self) -> Result<(), String> {
        if self.database.trim().is_empty() {
            return Err("store.database must be set".to_string());
        }
        if self.backend == BackendKind::Mongo && self.addresses.trim().is_empty() {
            return Err("store.addresses must be set for the mongo backend".to_string());
        }
        let has_user = self.username.as_deref().is_some_and(|s| !s.is_empty());
        let has_password = self.password.as_deref().is_some_and(|s| !s.is_empty());
        if has_user != has_password {
            return Err("store.username and store.password must be set together".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("store.timeout_ms must be > 0".to_string());
        }
        if self.connect_timeout_ms == 0 {
            return Err("store.connect_timeout_ms must be > 0".to_string());
        }
        Ok(())
    }

    /// Copy safe to print: the password is replaced by `***`
    pub fn redacted(&self) -> Self {
        Self {
            password: self.password.as_ref().map(|_| "***".to_string()),
            ..self.clone()
        }
    }
}
