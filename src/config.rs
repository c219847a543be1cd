//! Runtime settings from the environment (`.env` is loaded by the binary via dotenvy).

use crate::error::ConfigError;
use crate::payment::stripe::DEFAULT_API_BASE;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    Postgres,
    Memory,
}

impl FromStr for StorageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageKind::Postgres),
            "memory" => Ok(StorageKind::Memory),
            _ => Err(ConfigError::Invalid {
                key: "STORAGE",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub storage: StorageKind,
    pub database_url: String,
    /// PostgreSQL schema for the document tables.
    pub database_schema: String,
    pub db_max_connections: u32,
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: String,
    pub stripe_timeout_seconds: u64,
    pub body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Ok(Config {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            storage: get("STORAGE").map(|s| s.parse()).transpose()?.unwrap_or(StorageKind::Postgres),
            database_url: get("DATABASE_URL").unwrap_or_else(|| "postgres://localhost/tourbook".into()),
            database_schema: get("DATABASE_SCHEMA").unwrap_or_else(|| "public".into()),
            db_max_connections: parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 5)?,
            stripe_secret_key: get("STRIPE_SECRET_KEY"),
            stripe_api_base: get("STRIPE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into()),
            stripe_timeout_seconds: parse_or(get("STRIPE_TIMEOUT_SECONDS"), "STRIPE_TIMEOUT_SECONDS", 20)?,
            body_limit_bytes: parse_or(get("BODY_LIMIT_BYTES"), "BODY_LIMIT_BYTES", 10 * 1024)?,
        })
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid { key, value: v }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.bind_addr, "0.0.0.0:3000");
        assert_eq!(c.storage, StorageKind::Postgres);
        assert_eq!(c.db_max_connections, 5);
        assert_eq!(c.body_limit_bytes, 10 * 1024);
        assert!(c.stripe_secret_key.is_none());
    }

    #[test]
    fn overrides_and_blank_values() {
        let c = config(&[("STORAGE", "Memory"), ("STRIPE_SECRET_KEY", "  "), ("DB_MAX_CONNECTIONS", "12")]).unwrap();
        assert_eq!(c.storage, StorageKind::Memory);
        assert!(c.stripe_secret_key.is_none());
        assert_eq!(c.db_max_connections, 12);
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(matches!(config(&[("STORAGE", "mongo")]), Err(ConfigError::Invalid { key: "STORAGE", .. })));
        assert!(matches!(
            config(&[("BODY_LIMIT_BYTES", "lots")]),
            Err(ConfigError::Invalid { key: "BODY_LIMIT_BYTES", .. })
        ));
    }
}
