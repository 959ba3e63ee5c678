//! Configuration loading and representation.
//!
//! Everything is read from environment variables with defaults. Values that
//! fail to parse fall back to the default and log a warning, so a typo never
//! prevents startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Postgres connection settings. Absent when `DATABASE_URL` is unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub connect_retries: u32,
    pub retry_delay: Duration,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let url = lookup("DATABASE_URL").filter(|u| !u.trim().is_empty())?;
        Some(Self {
            url,
            pool_size: parse_or(&lookup, "MAST_DB_POOL_SIZE", 5),
            connect_retries: parse_or(&lookup, "MAST_DB_CONNECT_RETRIES", 10).max(1),
            retry_delay: Duration::from_secs(parse_or(&lookup, "MAST_DB_RETRY_DELAY_SECS", 5)),
            acquire_timeout: Duration::from_secs(parse_or(
                &lookup,
                "MAST_DB_ACQUIRE_TIMEOUT_SECS",
                5,
            )),
        })
    }
}

/// Behaviour of the inventory store.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Upper bound for each statement and each begin/commit/rollback.
    pub statement_timeout: Duration,
    /// Fail a batch when one of its ids matches no row.
    pub strict_batch: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            statement_timeout: Duration::from_secs(30),
            strict_batch: false,
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            statement_timeout: Duration::from_secs(
                parse_or(
                    &lookup,
                    "MAST_STATEMENT_TIMEOUT_SECS",
                    defaults.statement_timeout.as_secs(),
                )
                .max(1),
            ),
            strict_batch: parse_or(&lookup, "MAST_STRICT_BATCH", defaults.strict_batch),
        }
    }
}

/// HTTP server and asset settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub static_dir: PathBuf,
    /// Seed the in-memory backend with demo rows (ignored for Postgres).
    pub seed_demo: bool,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            bind_addr: parse_or(
                &lookup,
                "MAST_BIND_ADDR",
                SocketAddr::from(([0, 0, 0, 0], 8080)),
            ),
            static_dir: lookup("MAST_STATIC_DIR")
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            seed_demo: parse_or(&lookup, "MAST_SEED_DEMO", false),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + core::fmt::Debug,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, ?default, "invalid config value; using default");
                default
            }
        },
    }
}
