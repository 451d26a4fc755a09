/// Configuration Normalizer
///
/// Resolves a [`ConnectionConfig`] into a [`ConnectionDescriptor`]: every empty
/// field is replaced by its default and the port is range-checked. Host and
/// time zone values are passed through without validation.
use crate::config::ConnectionConfig;
use crate::core::{Result, StoreError};
use std::fmt;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_USERNAME: &str = "postgres";
pub const DEFAULT_PASSWORD: &str = "postgres";
pub const DEFAULT_DBNAME: &str = "postgres";
pub const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";

/// Transport security mode written into the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    #[default]
    Disable,
    Enable,
}

impl SslMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Enable => "enable",
        }
    }
}

impl From<bool> for SslMode {
    fn from(enabled: bool) -> Self {
        if enabled {
            SslMode::Enable
        } else {
            SslMode::Disable
        }
    }
}

/// Fully resolved connection parameters.
///
/// `Display` renders the space-separated `key=value` form consumed by the
/// engine, in the fixed order host, port, user, password, dbname, sslmode,
/// TimeZone.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    host: String,
    port: u16,
    user: String,
    password: String,
    dbname: String,
    sslmode: SslMode,
    timezone: String,
}

impl ConnectionDescriptor {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn dbname(&self) -> &str {
        &self.dbname
    }

    pub fn sslmode(&self) -> SslMode {
        self.sslmode
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    /// The descriptor string with the password masked, safe for logs.
    pub fn redacted(&self) -> String {
        self.render("********")
    }

    fn render(&self, password: &str) -> String {
        format!(
            "host={} port={} user={} password={} dbname={} sslmode={} TimeZone={}",
            self.host,
            self.port,
            self.user,
            password,
            self.dbname,
            self.sslmode.as_str(),
            self.timezone,
        )
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&self.password))
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionDescriptor")
            .field(&self.redacted())
            .finish()
    }
}

/// Normalizes a connection configuration.
///
/// # Returns
///
/// The resolved descriptor, or `StoreError::Validation` if the port is
/// neither zero (default) nor within 1..=65535. No other field can fail.
pub fn normalize(config: &ConnectionConfig) -> Result<ConnectionDescriptor> {
    let port = match config.port {
        0 => DEFAULT_PORT,
        p => u16::try_from(p).map_err(|_| {
            StoreError::Validation(format!("port out of range: {p} (expected 1-65535)"))
        })?,
    };

    Ok(ConnectionDescriptor {
        host: or_default(&config.host, DEFAULT_HOST),
        port,
        user: or_default(&config.username, DEFAULT_USERNAME),
        password: or_default(&config.password, DEFAULT_PASSWORD),
        dbname: or_default(&config.dbname, DEFAULT_DBNAME),
        sslmode: SslMode::from(config.ssl),
        timezone: or_default(&config.timezone, DEFAULT_TIMEZONE),
    })
}

fn or_default(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}
