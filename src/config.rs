//! Configuration management for the phonebook core.
//!
//! This module handles loading and validating configuration from environment
//! variables. A `.env` file in the working directory is loaded first if present.

use crate::error::{ConfigError, ConfigResult};
use crate::search::SearchOptions;
use std::env;
use std::path::PathBuf;

/// Configuration for the contact service and the maintenance runner.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Most contacts fetched from the store for one search (default: 1000)
    pub search_max_fetch: usize,

    /// Queries up to this many characters use substring matching (default: 2)
    pub search_short_query_max_chars: usize,

    /// Fuzzy search keeps at most this many candidates (default: 10)
    pub search_max_candidates: usize,

    /// Fuzzy matches must score above this (0-100, default: 30)
    pub search_min_score: u8,

    /// Largest page a contact listing returns (default: 100)
    pub list_max_page_size: usize,

    /// Log level (default: "info")
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `PHONEBOOK_DB_PATH`: SQLite database file
    ///
    /// Optional environment variables:
    /// - `SEARCH_MAX_FETCH`: Contacts fetched per search (default: 1000)
    /// - `SEARCH_SHORT_QUERY_MAX_CHARS`: Substring-match threshold (default: 2)
    /// - `SEARCH_MAX_CANDIDATES`: Fuzzy candidate cap (default: 10)
    /// - `SEARCH_MIN_SCORE`: Fuzzy score cutoff, 0-100 (default: 30)
    /// - `LIST_MAX_PAGE_SIZE`: Listing page cap (default: 100)
    /// - `LOG_LEVEL`: Logging level (default: "info")
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();

        let database_path = env::var("PHONEBOOK_DB_PATH")
            .map_err(|_| ConfigError::MissingVar("PHONEBOOK_DB_PATH".to_string()))?;

        if database_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                var: "PHONEBOOK_DB_PATH".to_string(),
                reason: "Cannot be empty".to_string(),
            });
        }

        let defaults = Config::default();
        let search_max_fetch = Self::parse_env_usize("SEARCH_MAX_FETCH", defaults.search_max_fetch)?;
        let search_short_query_max_chars = Self::parse_env_usize(
            "SEARCH_SHORT_QUERY_MAX_CHARS",
            defaults.search_short_query_max_chars,
        )?;
        let search_max_candidates =
            Self::parse_env_usize("SEARCH_MAX_CANDIDATES", defaults.search_max_candidates)?;
        let search_min_score = Self::parse_env_u8("SEARCH_MIN_SCORE", defaults.search_min_score)?;
        let list_max_page_size =
            Self::parse_env_usize("LIST_MAX_PAGE_SIZE", defaults.list_max_page_size)?;

        if search_min_score > 100 {
            return Err(ConfigError::InvalidValue {
                var: "SEARCH_MIN_SCORE".to_string(),
                reason: "Must be between 0 and 100".to_string(),
            });
        }

        for (var, value) in [
            ("SEARCH_MAX_FETCH", search_max_fetch),
            ("SEARCH_MAX_CANDIDATES", search_max_candidates),
            ("LIST_MAX_PAGE_SIZE", list_max_page_size),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    var: var.to_string(),
                    reason: "Must be greater than zero".to_string(),
                });
            }
        }

        let log_level = env::var("LOG_LEVEL").unwrap_or(defaults.log_level);

        Ok(Config {
            database_path: PathBuf::from(database_path),
            search_max_fetch,
            search_short_query_max_chars,
            search_max_candidates,
            search_min_score,
            list_max_page_size,
            log_level,
        })
    }

    /// Search-engine tunables derived from this configuration.
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            short_query_max_chars: self.search_short_query_max_chars,
            max_candidates: self.search_max_candidates,
            min_score: f64::from(self.search_min_score),
        }
    }

    /// Parse an environment variable as usize with a default value.
    fn parse_env_usize(var_name: &str, default: usize) -> ConfigResult<usize> {
        match env::var(var_name) {
            Ok(val) => val.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                var: var_name.to_string(),
                reason: format!("Must be a positive number, got: {}", val),
            }),
            Err(_) => Ok(default),
        }
    }

    /// Parse an environment variable as u8 with a default value.
    fn parse_env_u8(var_name: &str, default: u8) -> ConfigResult<u8> {
        match env::var(var_name) {
            Ok(val) => val.parse::<u8>().map_err(|_| ConfigError::InvalidValue {
                var: var_name.to_string(),
                reason: format!("Must be a number between 0-255, got: {}", val),
            }),
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from("phonebook.db"),
            search_max_fetch: 1000,
            search_short_query_max_chars: 2,
            search_max_candidates: 10,
            search_min_score: 30,
            list_max_page_size: 100,
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    // Sets env vars for one test and removes them on drop
    struct EnvGuard {
        vars: Vec<String>,
    }

    impl EnvGuard {
        fn new() -> Self {
            EnvGuard { vars: Vec::new() }
        }

        fn set(&mut self, key: &str, value: &str) {
            env::set_var(key, value);
            self.vars.push(key.to_string());
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for var in &self.vars {
                env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.search_max_fetch, 1000);
        assert_eq!(config.search_min_score, 30);
        assert_eq!(config.list_max_page_size, 100);

        let options = config.search_options();
        assert_eq!(options, SearchOptions::default());
    }

    #[test]
    #[serial]
    fn test_config_from_env_missing_db_path() {
        env::remove_var("PHONEBOOK_DB_PATH");

        match Config::from_env() {
            Err(ConfigError::MissingVar(var)) => assert_eq!(var, "PHONEBOOK_DB_PATH"),
            other => panic!("Expected MissingVar error, got: {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_config_from_env_valid() {
        let mut guard = EnvGuard::new();
        guard.set("PHONEBOOK_DB_PATH", "/tmp/contacts.db");
        guard.set("SEARCH_MAX_FETCH", "250");
        guard.set("SEARCH_MIN_SCORE", "45");
        guard.set("SEARCH_SHORT_QUERY_MAX_CHARS", "3");

        let config = Config::from_env().unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/contacts.db"));
        assert_eq!(config.search_max_fetch, 250);
        assert_eq!(config.search_max_candidates, 10);

        let options = config.search_options();
        assert_eq!(options.min_score, 45.0);
        assert_eq!(options.short_query_max_chars, 3);
    }

    #[test]
    #[serial]
    fn test_config_invalid_min_score() {
        let mut guard = EnvGuard::new();
        guard.set("PHONEBOOK_DB_PATH", "contacts.db");
        guard.set("SEARCH_MIN_SCORE", "150");

        match Config::from_env() {
            Err(ConfigError::InvalidValue { var, .. }) => assert_eq!(var, "SEARCH_MIN_SCORE"),
            other => panic!("Expected InvalidValue error, got: {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_config_rejects_zero_fetch() {
        let mut guard = EnvGuard::new();
        guard.set("PHONEBOOK_DB_PATH", "contacts.db");
        guard.set("SEARCH_MAX_FETCH", "0");

        match Config::from_env() {
            Err(ConfigError::InvalidValue { var, .. }) => assert_eq!(var, "SEARCH_MAX_FETCH"),
            other => panic!("Expected InvalidValue error, got: {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_config_rejects_zero_candidates() {
        let mut guard = EnvGuard::new();
        guard.set("PHONEBOOK_DB_PATH", "contacts.db");
        guard.set("SEARCH_MAX_CANDIDATES", "0");

        match Config::from_env() {
            Err(ConfigError::InvalidValue { var, .. }) => assert_eq!(var, "SEARCH_MAX_CANDIDATES"),
            other => panic!("Expected InvalidValue error, got: {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_parse_env_usize() {
        let mut guard = EnvGuard::new();
        guard.set("TEST_USIZE", "42");
        guard.set("TEST_USIZE_INVALID", "not-a-number");

        assert_eq!(Config::parse_env_usize("TEST_USIZE", 10).unwrap(), 42);
        assert_eq!(Config::parse_env_usize("NONEXISTENT_USIZE", 10).unwrap(), 10);
        assert!(Config::parse_env_usize("TEST_USIZE_INVALID", 10).is_err());
    }
}
