use std::path::PathBuf;

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteConnectOptions;

/// Environment variable holding the database file path.
pub const DATABASE_ENV: &str = "INVOICEHUB_DB";

/// Environment variable overriding the pool size.
pub const MAX_CONNECTIONS_ENV: &str = "INVOICEHUB_MAX_CONNECTIONS";

pub const DEFAULT_DATABASE_PATH: &str = "invoicehub.db";

/// Connection settings for the invoice store.
///
/// ```rust,ignore
/// let config = StoreConfig::new("./data/invoices.db").max_connections(2);
/// let repo = Repository::init(&config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of pooled connections. Default: 5
    pub max_connections: u32,

    /// Create the database file when it does not exist. Default: false
    pub create_if_missing: bool,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            database_path: path.into(),
            max_connections: 5,
            create_if_missing: false,
        }
    }

    /// Build a configuration from `INVOICEHUB_DB` and `INVOICEHUB_MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(DATABASE_ENV).unwrap_or_else(|_| DEFAULT_DATABASE_PATH.into());
        let mut config = Self::new(path);

        if let Ok(value) = std::env::var(MAX_CONNECTIONS_ENV) {
            let max = value.trim().parse::<u32>().with_context(|| {
                format!("{} must be a positive integer, got '{}'", MAX_CONNECTIONS_ENV, value)
            })?;
            config = config.max_connections(max);
        }

        Ok(config)
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub(crate) fn connect_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.database_path)
            .create_if_missing(self.create_if_missing)
            .foreign_keys(true)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.database_path, PathBuf::from("invoicehub.db"));
        assert_eq!(config.max_connections, 5);
        assert!(!config.create_if_missing);
    }

    #[test]
    fn test_builder() {
        let config = StoreConfig::new("/tmp/x.db")
            .max_connections(0)
            .create_if_missing(true);
        assert_eq!(config.max_connections, 1);
        assert!(config.create_if_missing);
    }
}
