use crate::core::{Result, StoreError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub postgres: ConnectionConfig,
    pub pool: PoolConfig,
    pub log: LogConfig,
}

/// Connection parameters.
///
/// Every field is optional. Empty strings and a zero port are replaced by
/// the defaults in [`crate::core::db::descriptor`] when the configuration is
/// normalized. `ssl` must be set explicitly to request an encrypted transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: i64,
    pub username: String,
    pub password: String,
    pub dbname: String,
    pub ssl: bool,
    pub timezone: String,
}

/// Connection pool sizing for the PostgreSQL driver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout_secs: 30,
        }
    }
}

/// Logging configuration for the command line binary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `"pgstore=debug"`
    pub filter: Option<String>,
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
///
/// # Example
///
/// ```no_run
/// let config = pgstore::config::load_config("config.toml").expect("Failed to load config");
/// println!("{:?}", config.postgres);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| StoreError::Config(e.to_string()))
}

/// Default location of the configuration file: `<config_dir>/pgstore/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pgstore").join("config.toml"))
}
