// Daemon configuration from environment variables

use anyhow::{Context, Result};
use confpush_core::application::relay::constants::{DEFAULT_BATCH_SIZE, IDLE_SLEEP_DURATION};
use confpush_core::application::RelayConfig;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "~/.confpush/confpush.db";

const ENV_DB_PATH: &str = "CONFPUSH_DB_PATH";
const ENV_LOG_FORMAT: &str = "CONFPUSH_LOG_FORMAT";
const ENV_RELAY_BATCH_SIZE: &str = "CONFPUSH_RELAY_BATCH_SIZE";
const ENV_RELAY_IDLE_MS: &str = "CONFPUSH_RELAY_IDLE_MS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub db_path: String,
    pub log_format: LogFormat,
    pub relay: RelayConfig,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw_path = lookup(ENV_DB_PATH).unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let db_path = shellexpand::tilde(&raw_path).into_owned();

        let log_format = match lookup(ENV_LOG_FORMAT).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let batch_size = match lookup(ENV_RELAY_BATCH_SIZE) {
            Some(v) => v
                .parse::<usize>()
                .with_context(|| format!("{} must be a positive integer, got {:?}", ENV_RELAY_BATCH_SIZE, v))?,
            None => DEFAULT_BATCH_SIZE,
        };
        if batch_size == 0 {
            anyhow::bail!("{} must be greater than zero", ENV_RELAY_BATCH_SIZE);
        }

        let idle_sleep = match lookup(ENV_RELAY_IDLE_MS) {
            Some(v) => Duration::from_millis(
                v.parse::<u64>()
                    .with_context(|| format!("{} must be milliseconds, got {:?}", ENV_RELAY_IDLE_MS, v))?,
            ),
            None => IDLE_SLEEP_DURATION,
        };

        Ok(Self {
            db_path,
            log_format,
            relay: RelayConfig {
                batch_size,
                idle_sleep,
                ..RelayConfig::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<DaemonConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DaemonConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert!(config.db_path.ends_with(".confpush/confpush.db"));
        assert!(!config.db_path.starts_with('~'));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.relay.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.relay.idle_sleep, IDLE_SLEEP_DURATION);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("CONFPUSH_DB_PATH", "/var/lib/confpush.db"),
            ("CONFPUSH_LOG_FORMAT", "json"),
            ("CONFPUSH_RELAY_BATCH_SIZE", "10"),
            ("CONFPUSH_RELAY_IDLE_MS", "50"),
        ])
        .unwrap();
        assert_eq!(config.db_path, "/var/lib/confpush.db");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.relay.batch_size, 10);
        assert_eq!(config.relay.idle_sleep, Duration::from_millis(50));
    }

    #[test]
    fn test_rejects_bad_numbers() {
        assert!(config(&[("CONFPUSH_RELAY_BATCH_SIZE", "lots")]).is_err());
        assert!(config(&[("CONFPUSH_RELAY_BATCH_SIZE", "0")]).is_err());
        assert!(config(&[("CONFPUSH_RELAY_IDLE_MS", "-5")]).is_err());
    }
}
