//! Command timeout configuration
//!
//! The facade never reads ambient global configuration. It is handed a
//! [`TimeoutSetting`] at construction; a resolved setting consults its
//! [`SettingsSource`] again on every call, so edits to the source take effect
//! on the next command without restarting anything.

use crate::errors::{ConfigError, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Key the command timeout is stored under in every settings source
pub const TIMEOUT_KEY: &str = "ConnectionString.TimeOut";

/// Seconds used when the key is absent, unparsable or not positive
pub const DEFAULT_TIMEOUT_SECS: u32 = 30;

/// A read-only key-value configuration source
pub trait SettingsSource: Send + Sync {
    /// Look up the raw text stored under `key`
    fn get(&self, key: &str) -> Option<String>;
}

impl SettingsSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Settings read from process environment variables
///
/// `ConnectionString.TimeOut` is looked up as `DAF_CONNECTIONSTRING_TIMEOUT`.
#[derive(Debug, Clone)]
pub struct EnvSettings {
    prefix: String,
}

impl EnvSettings {
    pub fn new() -> Self {
        Self::with_prefix("DAF_")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Environment variable name for a settings key
    pub fn var_name(&self, key: &str) -> String {
        let mut name = self.prefix.clone();
        for c in key.chars() {
            name.push(if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            });
        }
        name
    }
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsSource for EnvSettings {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.var_name(key)).ok()
    }
}

/// Settings parsed from a TOML document
///
/// A key is found either verbatim at the top level
/// (`"ConnectionString.TimeOut" = 45`) or as a dotted path through tables
/// (`[ConnectionString] TimeOut = 45`).
#[derive(Debug, Clone)]
pub struct TomlSettings {
    root: toml::Table,
}

impl TomlSettings {
    /// Load and parse a TOML settings file
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&text).map_err(|reason| ConfigError::Malformed {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse settings from TOML text
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let root = text.parse::<toml::Table>().map_err(|e| e.to_string())?;
        Ok(Self { root })
    }

    fn lookup(&self, key: &str) -> Option<&toml::Value> {
        if let Some(value) = self.root.get(key) {
            return Some(value);
        }
        let mut parts = key.split('.');
        let mut current = self.root.get(parts.next()?)?;
        for part in parts {
            current = current.as_table()?.get(part)?;
        }
        Some(current)
    }
}

impl SettingsSource for TomlSettings {
    fn get(&self, key: &str) -> Option<String> {
        match self.lookup(key)? {
            toml::Value::String(s) => Some(s.clone()),
            toml::Value::Integer(i) => Some(i.to_string()),
            toml::Value::Float(f) => Some(f.to_string()),
            toml::Value::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Where the per-call command timeout comes from
#[derive(Clone)]
pub enum TimeoutSetting {
    /// A fixed number of seconds; 0 disables the limit
    Fixed(u32),
    /// Re-read from a settings source on every call
    Resolved(Arc<dyn SettingsSource>),
}

impl TimeoutSetting {
    /// Resolve from the given source on every call
    pub fn from_source(source: impl SettingsSource + 'static) -> Self {
        TimeoutSetting::Resolved(Arc::new(source))
    }

    /// Resolve the timeout for one call, in seconds
    pub fn resolve(&self) -> u32 {
        match self {
            TimeoutSetting::Fixed(secs) => *secs,
            TimeoutSetting::Resolved(source) => resolve_timeout(source.as_ref()),
        }
    }
}

impl Default for TimeoutSetting {
    fn default() -> Self {
        TimeoutSetting::Fixed(DEFAULT_TIMEOUT_SECS)
    }
}

impl std::fmt::Debug for TimeoutSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeoutSetting::Fixed(secs) => f.debug_tuple("Fixed").field(secs).finish(),
            TimeoutSetting::Resolved(_) => f.write_str("Resolved(..)"),
        }
    }
}

/// Resolve the command timeout from a settings source
///
/// Absent, unparsable and non-positive values fall back to
/// [`DEFAULT_TIMEOUT_SECS`].
pub fn resolve_timeout(source: &dyn SettingsSource) -> u32 {
    let Some(raw) = source.get(TIMEOUT_KEY) else {
        return DEFAULT_TIMEOUT_SECS;
    };
    match raw.trim().parse::<i64>() {
        Ok(secs) if secs > 0 => u32::try_from(secs).unwrap_or(u32::MAX),
        _ => {
            tracing::warn!(
                key = TIMEOUT_KEY,
                value = %raw,
                default = DEFAULT_TIMEOUT_SECS,
                "unusable command timeout setting, using default"
            );
            DEFAULT_TIMEOUT_SECS
        }
    }
}

/// Load a TOML settings file into a per-call timeout setting
pub fn timeout_from_file(path: impl AsRef<Path>) -> Result<TimeoutSetting> {
    let settings = TomlSettings::load(path)?;
    Ok(TimeoutSetting::from_source(settings))
}
