//! TOML-based configuration for sqlcube.
//!
//! Supports a config file (sqlcube.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [sql]
//! dialect = "${SQLCUBE_DIALECT}"
//!
//! [executor]
//! max_concurrent_scopes = 8
//!
//! [cache]
//! enabled = true
//! max_entries = 10000
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::{EmptyQueryCache, InMemoryQueryCache, QueryCache};
use crate::sql::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub sql: SqlSettings,
    pub executor: ExecutorSettings,
    pub cache: CacheSettings,
}

/// SQL generation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SqlSettings {
    /// Dialect name (supports ${ENV_VAR} expansion).
    pub dialect: String,
}

impl Default for SqlSettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::DuckDb.to_string(),
        }
    }
}

impl SqlSettings {
    /// The configured dialect, with environment variables expanded.
    pub fn dialect(&self) -> SettingsResult<Dialect> {
        let name = expand_env_vars(&self.dialect)?;
        name.parse()
            .map_err(|_| SettingsError::UnsupportedDialect(name))
    }
}

/// Executor settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Maximum number of scopes whose SQL runs at the same time.
    pub max_concurrent_scopes: usize,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            max_concurrent_scopes: 8,
        }
    }
}

/// Result cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,

    /// Maximum number of (measure, scope) entries kept.
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: crate::cache::DEFAULT_MAX_ENTRIES,
        }
    }
}

impl CacheSettings {
    /// Build the configured cache.
    pub fn build(&self) -> Arc<dyn QueryCache> {
        if self.enabled {
            Arc::new(InMemoryQueryCache::new(self.max_entries))
        } else {
            Arc::new(EmptyQueryCache)
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SettingsResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `SQLCUBE_CONFIG`
    /// 2. `./sqlcube.toml`
    pub fn load() -> SettingsResult<Self> {
        if let Ok(path) = env::var("SQLCUBE_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("sqlcube.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        Ok(Settings::default())
    }

    /// Check values that deserialize but cannot be used.
    pub fn validate(&self) -> SettingsResult<()> {
        self.sql.dialect()?;
        if self.executor.max_concurrent_scopes == 0 {
            return Err(SettingsError::InvalidConfig(
                "executor.max_concurrent_scopes must be at least 1".to_string(),
            ));
        }
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(SettingsError::InvalidConfig(
                "cache.max_entries must be at least 1 when the cache is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> SettingsResult<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }
        let var_name: String = if chars.peek() == Some(&'{') {
            chars.next();
            chars.by_ref().take_while(|&ch| ch != '}').collect()
        } else {
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                name.push(ch);
            }
            if name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
            name
        };
        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
