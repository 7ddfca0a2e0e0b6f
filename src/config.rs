//! Configuration management

use anyhow::{Context, Result};

const DEFAULT_NATS_URL: &str = "nats://localhost:4222";
const DEFAULT_UPLOAD_DIR: &str = "../uploads";
const DEFAULT_IMPORT_LOG_LIMIT_MAX: i64 = 100;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Directory uploaded CSV batches are stored under, one subdirectory per batch
    pub upload_dir: String,

    /// Upper bound for `limit` on import log listings
    pub import_log_limit_max: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set")?;

        Self::from_lookup(database_url, |key| std::env::var(key).ok())
    }

    fn from_lookup(database_url: String, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let nats_url = lookup("NATS_URL").unwrap_or_else(|| DEFAULT_NATS_URL.to_string());

        let upload_dir = lookup("UPLOAD_DIR").unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_string());

        let import_log_limit_max = match lookup("IMPORT_LOG_LIMIT_MAX") {
            Some(value) => value
                .trim()
                .parse::<i64>()
                .with_context(|| format!("IMPORT_LOG_LIMIT_MAX must be a number, got '{}'", value))?,
            None => DEFAULT_IMPORT_LOG_LIMIT_MAX,
        };
        if import_log_limit_max < 1 {
            anyhow::bail!("IMPORT_LOG_LIMIT_MAX must be at least 1 (current: {})", import_log_limit_max);
        }

        Ok(Self {
            nats_url,
            database_url,
            upload_dir,
            import_log_limit_max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup("postgres://test".to_string(), |key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.nats_url, "nats://localhost:4222");
        assert_eq!(config.upload_dir, "../uploads");
        assert_eq!(config.import_log_limit_max, 100);
    }

    #[test]
    fn test_config_overrides() {
        let config = load(&[
            ("NATS_URL", "nats://nats:4222"),
            ("UPLOAD_DIR", "/data/uploads"),
            ("IMPORT_LOG_LIMIT_MAX", "50"),
        ])
        .unwrap();
        assert_eq!(config.nats_url, "nats://nats:4222");
        assert_eq!(config.upload_dir, "/data/uploads");
        assert_eq!(config.import_log_limit_max, 50);
    }

    #[test]
    fn test_config_rejects_bad_limit() {
        assert!(load(&[("IMPORT_LOG_LIMIT_MAX", "many")]).is_err());
        assert!(load(&[("IMPORT_LOG_LIMIT_MAX", "0")]).is_err());
    }
}
