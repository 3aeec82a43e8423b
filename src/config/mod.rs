//! Configuration module for sqlcube.
//!
//! Handles the settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, CacheSettings, ExecutorSettings, Settings, SettingsError, SettingsResult,
    SqlSettings,
};
