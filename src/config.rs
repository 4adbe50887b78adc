//! Runtime configuration read from the environment (and an optional `.env` file)

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::data::tcmb::TCMB_CPI_URL;
use crate::forecast::DEFAULT_ORDER;
use crate::schedule::{ParsePolicyError, SchedulePolicy};
use crate::store::ArtifactStore;

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding the persisted artifacts
    pub data_dir: PathBuf,
    /// Page the CPI table is scraped from
    pub source_url: String,
    pub fetch_timeout: Duration,
    pub schedule: SchedulePolicy,
    /// Autoregressive order of the default forecaster
    pub ar_order: usize,
}

impl Config {
    /// Loads `.env` if present, then reads the `CPI_*` variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = lookup("CPI_DATA_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let source_url = lookup("CPI_SOURCE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| TCMB_CPI_URL.to_string());

        let fetch_timeout = match lookup("CPI_FETCH_TIMEOUT_SECS") {
            Some(value) => {
                let secs: u64 = value.trim().parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::Invalid {
                        key: "CPI_FETCH_TIMEOUT_SECS",
                        value: value.clone(),
                        reason: e.to_string(),
                    }
                })?;
                Duration::from_secs(secs.max(1))
            }
            None => Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        };

        let schedule = match lookup("CPI_SCHEDULE") {
            Some(value) => value.parse().map_err(|e: ParsePolicyError| {
                ConfigError::Invalid {
                    key: "CPI_SCHEDULE",
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => SchedulePolicy::default(),
        };

        let ar_order = match lookup("CPI_AR_ORDER") {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(order) if order >= 1 => order,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "CPI_AR_ORDER",
                        value,
                        reason: "expected a positive integer".to_string(),
                    })
                }
            },
            None => DEFAULT_ORDER,
        };

        Ok(Self {
            data_dir,
            source_url,
            fetch_timeout,
            schedule,
            ar_order,
        })
    }
}

/// XDG data directory, or `./data` when no home directory is known
fn default_data_dir() -> PathBuf {
    ArtifactStore::new()
        .map(|store| store.dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.source_url, TCMB_CPI_URL);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.schedule, SchedulePolicy::MinInterval { days: 30 });
        assert_eq!(config.ar_order, 12);
        assert!(config.data_dir.to_string_lossy().contains("cpiwatch")
            || config.data_dir == PathBuf::from("data"));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("CPI_DATA_DIR", "/tmp/cpi"),
            ("CPI_SOURCE_URL", "http://localhost:8080/cpi"),
            ("CPI_FETCH_TIMEOUT_SECS", "5"),
            ("CPI_SCHEDULE", "day:30"),
            ("CPI_AR_ORDER", "6"),
        ])
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/cpi"));
        assert_eq!(config.source_url, "http://localhost:8080/cpi");
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.schedule, SchedulePolicy::DayOfMonth(30));
        assert_eq!(config.ar_order, 6);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for (key, value) in [
            ("CPI_FETCH_TIMEOUT_SECS", "soon"),
            ("CPI_SCHEDULE", "weekly"),
            ("CPI_AR_ORDER", "0"),
        ] {
            match config_from(&[(key, value)]) {
                Err(ConfigError::Invalid { key: k, .. }) => assert_eq!(k, key),
                Ok(_) => panic!("{}={} should be rejected", key, value),
            }
        }
    }

    #[test]
    fn test_blank_data_dir_uses_default() {
        let config = config_from(&[("CPI_DATA_DIR", "  ")]).unwrap();
        assert_ne!(config.data_dir, PathBuf::from("  "));
    }
}
