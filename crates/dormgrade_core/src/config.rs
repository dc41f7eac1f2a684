//! Runtime configuration.
//!
//! # Responsibility
//! - Resolve engine settings from environment variables with stable defaults.
//!
//! # Invariants
//! - Loading never panics; malformed values are reported as error strings.
//! - Unset and blank variables both fall back to the default.

use crate::logging::default_log_level;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "DORMGRADE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "DORMGRADE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "DORMGRADE_LOG_DIR";
pub const ENV_MEMBER_BUDGET_MS: &str = "DORMGRADE_MEMBER_BUDGET_MS";

pub const DEFAULT_DB_PATH: &str = "dormgrade.sqlite3";
pub const DEFAULT_MEMBER_BUDGET_MS: u64 = 5_000;

/// Settings shared by the CLI and embedding hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// File logging is disabled when `None`.
    pub log_dir: Option<PathBuf>,
    pub member_budget_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: default_log_level().to_string(),
            log_dir: None,
            member_budget_ms: DEFAULT_MEMBER_BUDGET_MS,
        }
    }
}

impl CoreConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(db_path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(db_path);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level.to_ascii_lowercase();
        }
        if let Some(log_dir) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(log_dir));
        }
        if let Some(budget) = read(ENV_MEMBER_BUDGET_MS) {
            config.member_budget_ms = parse_budget_ms(&budget)?;
        }
        Ok(config)
    }

    pub fn member_budget(&self) -> Duration {
        Duration::from_millis(self.member_budget_ms)
    }
}

fn parse_budget_ms(value: &str) -> Result<u64, String> {
    match value.parse::<u64>() {
        Ok(0) => Err(format!("{ENV_MEMBER_BUDGET_MS} must be greater than zero")),
        Ok(budget) => Ok(budget),
        Err(err) => Err(format!(
            "{ENV_MEMBER_BUDGET_MS} must be a whole number of milliseconds, got `{value}`: {err}"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, DEFAULT_DB_PATH, DEFAULT_MEMBER_BUDGET_MS};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = CoreConfig::from_lookup(lookup_from(&[])).expect("defaults should load");
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.member_budget_ms, DEFAULT_MEMBER_BUDGET_MS);
        assert!(config.log_dir.is_none());
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn environment_values_override_defaults() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            ("DORMGRADE_DB_PATH", "/var/lib/dormgrade/db.sqlite3"),
            ("DORMGRADE_LOG_LEVEL", " WARN "),
            ("DORMGRADE_LOG_DIR", "/var/log/dormgrade"),
            ("DORMGRADE_MEMBER_BUDGET_MS", "250"),
        ]))
        .expect("valid values should load");
        assert_eq!(config.db_path, PathBuf::from("/var/lib/dormgrade/db.sqlite3"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/dormgrade")));
        assert_eq!(config.member_budget().as_millis(), 250);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = CoreConfig::from_lookup(lookup_from(&[("DORMGRADE_LOG_DIR", "   ")]))
            .expect("blank values should be ignored");
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn rejects_malformed_budget() {
        let error = CoreConfig::from_lookup(lookup_from(&[("DORMGRADE_MEMBER_BUDGET_MS", "fast")]))
            .expect_err("non-numeric budget must fail");
        assert!(error.contains("DORMGRADE_MEMBER_BUDGET_MS"));
        assert!(CoreConfig::from_lookup(lookup_from(&[("DORMGRADE_MEMBER_BUDGET_MS", "0")])).is_err());
    }
}
