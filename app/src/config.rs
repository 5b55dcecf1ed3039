// ==============================================================================
// config.rs - Runtime Configuration
// ==============================================================================
// Description: Session and database settings loaded from the environment
// Author: Matt Barham
// Created: 2026-10-07
// Modified: 2026-10-14
// Version: 1.0.1
// ==============================================================================

use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::time::Duration;

pub const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 2000;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Annotation session settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Quiet period before a selection/option change is saved
    pub save_debounce: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            save_debounce: Duration::from_millis(DEFAULT_SAVE_DEBOUNCE_MS),
        }
    }
}

impl SessionConfig {
    /// Load session configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let save_debounce_ms = match lookup("ANNOTATION_SAVE_DEBOUNCE_MS") {
            Some(value) => value
                .trim()
                .parse()
                .context("ANNOTATION_SAVE_DEBOUNCE_MS must be a whole number of milliseconds")?,
            None => DEFAULT_SAVE_DEBOUNCE_MS,
        };

        Ok(Self {
            save_debounce: Duration::from_millis(save_debounce_ms),
        })
    }
}

/// PostgreSQL connection settings
#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

// Connection strings carry credentials
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl DatabaseConfig {
    /// Load from `DATABASE_URL` or `DATABASE_URL_FILE`
    pub fn from_env() -> Result<Self> {
        Self::resolve(None)
    }

    /// An explicit URL (e.g. a CLI flag) wins over the environment
    pub fn resolve(url_override: Option<String>) -> Result<Self> {
        Self::from_lookup(url_override, |key| std::env::var(key).ok())
    }

    fn from_lookup(url_override: Option<String>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = match url_override.or_else(|| lookup("DATABASE_URL")) {
            Some(url) => url,
            None => {
                let url_file = lookup("DATABASE_URL_FILE")
                    .context("DATABASE_URL or DATABASE_URL_FILE must be provided")?;
                Self::read_url_file(&url_file)?
            }
        };

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value
                .trim()
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self { url, max_connections })
    }

    /// Read the connection string from a secret file
    fn read_url_file(path: &str) -> Result<String> {
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read DATABASE_URL_FILE {}", path))
            .map(|s| s.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_session_defaults() {
        let config = SessionConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.save_debounce, Duration::from_secs(2));
    }

    #[test]
    fn test_session_debounce_override() {
        let config = SessionConfig::from_lookup(env(&[("ANNOTATION_SAVE_DEBOUNCE_MS", "250")])).unwrap();
        assert_eq!(config.save_debounce, Duration::from_millis(250));

        assert!(SessionConfig::from_lookup(env(&[("ANNOTATION_SAVE_DEBOUNCE_MS", "soon")])).is_err());
    }

    #[test]
    fn test_database_url_precedence() {
        let lookup = env(&[("DATABASE_URL", "postgres://env/db")]);
        let config = DatabaseConfig::from_lookup(Some("postgres://flag/db".to_string()), &lookup).unwrap();
        assert_eq!(config.url, "postgres://flag/db");
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);

        let config = DatabaseConfig::from_lookup(None, &lookup).unwrap();
        assert_eq!(config.url, "postgres://env/db");
    }

    #[test]
    fn test_database_url_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "postgres://secret/db  ").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = DatabaseConfig::from_lookup(
            None,
            env(&[("DATABASE_URL_FILE", path.as_str()), ("DATABASE_MAX_CONNECTIONS", "12")]),
        )
        .unwrap();

        assert_eq!(config.url, "postgres://secret/db");
        assert_eq!(config.max_connections, 12);
        assert!(!format!("{:?}", config).contains("secret"));
    }

    #[test]
    fn test_database_url_missing() {
        assert!(DatabaseConfig::from_lookup(None, env(&[])).is_err());
    }
}
