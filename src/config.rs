//! Store configuration.
//!
//! Combines explicit construction with environment-variable defaults, so
//! embedding processes can wire the store from their own config layer or
//! straight from the environment.

use anyhow::{Context, Result};
use std::env;

/// Configuration for the persistent backend.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database URL, e.g. `sqlite:///var/lib/metastore/meta.db`.
    pub database_url: String,

    /// Connection pool size. Readers run concurrently under WAL; writers
    /// serialize inside SQLite.
    pub max_connections: u32,

    /// How long a writer waits on a locked database before giving up.
    /// Callers should treat a lock timeout as retryable, not fatal.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/metastore.db".into(),
            max_connections: 5,
            busy_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    /// Config pointing at the given database URL, defaults elsewhere.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    /// Read configuration from `METASTORE_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let database_url =
            env::var("METASTORE_DATABASE_URL").unwrap_or(defaults.database_url);
        let max_connections = match env::var("METASTORE_MAX_CONNECTIONS") {
            Ok(value) => value
                .parse::<u32>()
                .with_context(|| format!("parsing METASTORE_MAX_CONNECTIONS value `{value}`"))?,
            Err(env::VarError::NotPresent) => defaults.max_connections,
            Err(err) => return Err(err).context("reading METASTORE_MAX_CONNECTIONS"),
        };
        let busy_timeout_ms = match env::var("METASTORE_BUSY_TIMEOUT_MS") {
            Ok(value) => value
                .parse::<u64>()
                .with_context(|| format!("parsing METASTORE_BUSY_TIMEOUT_MS value `{value}`"))?,
            Err(env::VarError::NotPresent) => defaults.busy_timeout_ms,
            Err(err) => return Err(err).context("reading METASTORE_BUSY_TIMEOUT_MS"),
        };

        Ok(Self {
            database_url,
            max_connections,
            busy_timeout_ms,
        })
    }
}
