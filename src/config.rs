//! Configuration for target sources and scope stores.
//!
//! Settings are read from a [`ConfigProvider`] that consults its sources
//! in priority order (environment variables, in-memory maps, JSON files
//! with the `config` feature) and caches what it finds.

use std::collections::HashMap;
use std::env;

use parking_lot::RwLock;
#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{TargetError, TargetResult};
use crate::policy::RefreshCheckDelay;
use crate::scope::{MapScopeStore, ScopeKind};

/// A configuration value that can be various types
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(untagged))]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Array(Vec<ConfigValue>),
    Object(HashMap<String, ConfigValue>),
}

impl ConfigValue {
    fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::String(_) => "string",
            ConfigValue::Integer(_) => "integer",
            ConfigValue::Float(_) => "float",
            ConfigValue::Boolean(_) => "boolean",
            ConfigValue::Array(_) => "array",
            ConfigValue::Object(_) => "object",
        }
    }

    fn mismatch(&self, expected: &str) -> TargetError {
        TargetError::invalid_configuration(format!(
            "expected {} config value, found {}",
            expected,
            self.type_name()
        ))
    }

    pub fn as_string(&self) -> TargetResult<&str> {
        match self {
            ConfigValue::String(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn as_i64(&self) -> TargetResult<i64> {
        match self {
            ConfigValue::Integer(i) => Ok(*i),
            other => Err(other.mismatch("integer")),
        }
    }

    pub fn as_bool(&self) -> TargetResult<bool> {
        match self {
            ConfigValue::Boolean(b) => Ok(*b),
            other => Err(other.mismatch("boolean")),
        }
    }
}

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    /// Get a configuration value by key
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// List all available keys
    fn keys(&self) -> Vec<String>;
}

/// Environment variable configuration source.
///
/// Key `scope.persistent_handles` is read from `SCOPE_PERSISTENT_HANDLES`,
/// or `<PREFIX>_SCOPE_PERSISTENT_HANDLES` with a prefix.
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn env_key(&self, key: &str) -> String {
        let key = key.replace('.', "_").to_uppercase();
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key),
            None => key,
        }
    }
}

fn parse_scalar(value: String) -> ConfigValue {
    if let Ok(int_val) = value.parse::<i64>() {
        ConfigValue::Integer(int_val)
    } else if let Ok(float_val) = value.parse::<f64>() {
        ConfigValue::Float(float_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        ConfigValue::Boolean(bool_val)
    } else {
        ConfigValue::String(value)
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        env::var(self.env_key(key)).ok().map(parse_scalar)
    }

    fn keys(&self) -> Vec<String> {
        env::vars()
            .filter_map(|(key, _)| match &self.prefix {
                Some(prefix) => {
                    let prefix = format!("{}_", prefix.to_uppercase());
                    key.strip_prefix(&prefix).map(str::to_lowercase)
                }
                None => Some(key.to_lowercase()),
            })
            .collect()
    }
}

/// In-memory configuration source, handy for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MapConfigSource {
    values: HashMap<String, ConfigValue>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }
}

impl ConfigSource for MapConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// JSON file configuration source with flat dotted keys.
#[cfg(feature = "config")]
#[derive(Debug)]
pub struct JsonConfigSource {
    path: std::path::PathBuf,
    config: RwLock<Option<HashMap<String, ConfigValue>>>,
}

#[cfg(feature = "config")]
impl JsonConfigSource {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: RwLock::new(None),
        }
    }

    /// Re-reads the file.
    pub fn reload(&self) -> TargetResult<()> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            TargetError::invalid_configuration(format!("{}: {}", self.path.display(), e))
        })?;
        let parsed: HashMap<String, ConfigValue> = serde_json::from_str(&content).map_err(|e| {
            TargetError::invalid_configuration(format!("{}: {}", self.path.display(), e))
        })?;
        *self.config.write() = Some(parsed);
        Ok(())
    }
}

#[cfg(feature = "config")]
impl ConfigSource for JsonConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        if self.config.read().is_none() {
            if let Err(e) = self.reload() {
                tracing::warn!(error = %e, "JSON configuration not loaded");
            }
        }
        self.config.read().as_ref()?.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.config
            .read()
            .as_ref()
            .map(|cfg| cfg.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Configuration provider consulting sources in priority order.
pub struct ConfigProvider {
    sources: Vec<Box<dyn ConfigSource>>,
    cache: RwLock<HashMap<String, ConfigValue>>,
}

impl std::fmt::Debug for ConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigProvider")
            .field("sources", &self.sources)
            .field("cached", &self.cache.read().len())
            .finish()
    }
}

impl ConfigProvider {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Add a configuration source (higher priority sources should be added first)
    pub fn add_source(&mut self, source: Box<dyn ConfigSource>) {
        self.sources.push(source);
    }

    /// Get a configuration value, checking sources in priority order
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        if let Some(value) = self.cache.read().get(key) {
            return Some(value.clone());
        }

        let value = self.sources.iter().find_map(|source| source.get(key))?;
        self.cache.write().insert(key.to_string(), value.clone());
        Some(value)
    }

    fn require(&self, key: &str) -> TargetResult<ConfigValue> {
        self.get(key).ok_or_else(|| {
            TargetError::invalid_configuration(format!("configuration key '{}' not found", key))
        })
    }

    pub fn get_string(&self, key: &str) -> TargetResult<String> {
        self.require(key)?.as_string().map(str::to_string)
    }

    pub fn get_i64(&self, key: &str) -> TargetResult<i64> {
        self.require(key)?.as_i64()
    }

    /// Get all configuration keys from all sources
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sources.iter().flat_map(|s| s.keys()).collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

impl Default for ConfigProvider {
    fn default() -> Self {
        let mut provider = Self::new();
        provider.add_source(Box::new(EnvironmentConfigSource::new()));
        provider
    }
}

/// Externally configurable settings of target sources and scope stores.
///
/// `refresh_check_delay_ms` follows the millisecond convention of
/// [`RefreshCheckDelay::from_millis`]: negative never checks, zero always
/// checks.
///
/// # Examples
///
/// ```rust
/// use ferrous_target::{ConfigProvider, ConfigValue, MapConfigSource, RefreshCheckDelay, TargetSourceConfig};
/// use std::time::Duration;
///
/// let mut provider = ConfigProvider::new();
/// provider.add_source(Box::new(
///     MapConfigSource::new().with("target.refresh_check_delay_ms", ConfigValue::Integer(250)),
/// ));
///
/// let config = TargetSourceConfig::load(&provider).unwrap();
/// assert_eq!(config.refresh_check_delay(), RefreshCheckDelay::Every(Duration::from_millis(250)));
/// assert!(!config.persistent_scope_handles);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct TargetSourceConfig {
    pub refresh_check_delay_ms: i64,
    pub persistent_scope_handles: bool,
}

impl TargetSourceConfig {
    pub const REFRESH_CHECK_DELAY_KEY: &'static str = "target.refresh_check_delay_ms";
    pub const PERSISTENT_HANDLES_KEY: &'static str = "scope.persistent_handles";

    /// Reads settings from `config`; absent keys keep their defaults.
    ///
    /// A key holding a value of the wrong type is `InvalidConfiguration`.
    pub fn load(config: &ConfigProvider) -> TargetResult<Self> {
        let defaults = Self::default();
        let refresh_check_delay_ms = match config.get(Self::REFRESH_CHECK_DELAY_KEY) {
            Some(value) => value.as_i64()?,
            None => defaults.refresh_check_delay_ms,
        };
        let persistent_scope_handles = match config.get(Self::PERSISTENT_HANDLES_KEY) {
            Some(value) => value.as_bool()?,
            None => defaults.persistent_scope_handles,
        };
        Ok(Self {
            refresh_check_delay_ms,
            persistent_scope_handles,
        })
    }

    pub fn refresh_check_delay(&self) -> RefreshCheckDelay {
        RefreshCheckDelay::from_millis(self.refresh_check_delay_ms)
    }

    /// Scope store of the given kind honoring `persistent_scope_handles`.
    pub fn scope_store(&self, kind: ScopeKind) -> MapScopeStore {
        MapScopeStore::new(kind).with_persistence(self.persistent_scope_handles)
    }
}

impl Default for TargetSourceConfig {
    fn default() -> Self {
        Self {
            refresh_check_delay_ms: -1,
            persistent_scope_handles: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeStore;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_environment_config_source() {
        env::set_var("TEST_KEY", "test_value");
        env::set_var("TEST_INT", "42");
        env::set_var("TEST_BOOL", "true");

        let source = EnvironmentConfigSource::new();

        assert_eq!(source.get("test_key"), Some(ConfigValue::String("test_value".to_string())));
        assert_eq!(source.get("test.int"), Some(ConfigValue::Integer(42)));
        assert_eq!(source.get("test_bool"), Some(ConfigValue::Boolean(true)));

        env::remove_var("TEST_KEY");
        env::remove_var("TEST_INT");
        env::remove_var("TEST_BOOL");
    }

    #[test]
    #[serial]
    fn test_target_config_from_prefixed_env() {
        env::set_var("MYAPP_TARGET_REFRESH_CHECK_DELAY_MS", "0");
        env::set_var("MYAPP_SCOPE_PERSISTENT_HANDLES", "true");

        let mut provider = ConfigProvider::new();
        provider.add_source(Box::new(EnvironmentConfigSource::with_prefix("myapp")));
        let config = TargetSourceConfig::load(&provider).unwrap();

        assert_eq!(config.refresh_check_delay(), RefreshCheckDelay::Always);
        assert!(config.scope_store(ScopeKind::Session).is_persistent());

        env::remove_var("MYAPP_TARGET_REFRESH_CHECK_DELAY_MS");
        env::remove_var("MYAPP_SCOPE_PERSISTENT_HANDLES");
    }

    #[test]
    fn test_sources_consulted_in_priority_order() {
        let mut provider = ConfigProvider::new();
        provider.add_source(Box::new(MapConfigSource::new().with("a", ConfigValue::Integer(1))));
        provider.add_source(Box::new(
            MapConfigSource::new()
                .with("a", ConfigValue::Integer(2))
                .with("b", ConfigValue::String("two".to_string())),
        ));

        assert_eq!(provider.get_i64("a").unwrap(), 1);
        assert_eq!(provider.get_string("b").unwrap(), "two");
        assert!(provider.get_string("missing").unwrap_err().is_invalid_configuration());
        assert_eq!(provider.all_keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_wrong_type_is_invalid_configuration() {
        let mut provider = ConfigProvider::new();
        provider.add_source(Box::new(MapConfigSource::new().with(
            TargetSourceConfig::PERSISTENT_HANDLES_KEY,
            ConfigValue::String("yes".to_string()),
        )));
        let err = TargetSourceConfig::load(&provider).unwrap_err();
        assert!(err.is_invalid_configuration());
        assert!(err.to_string().contains("boolean"));
    }

    #[test]
    fn test_defaults_never_check() {
        let config = TargetSourceConfig::load(&ConfigProvider::new()).unwrap();
        assert_eq!(config, TargetSourceConfig::default());
        assert_eq!(config.refresh_check_delay(), RefreshCheckDelay::Never);
    }

    #[test]
    fn test_config_value_conversions() {
        assert_eq!(ConfigValue::Integer(5000).as_i64().unwrap(), 5000);
        assert!(ConfigValue::Boolean(true).as_bool().unwrap());
        assert!(ConfigValue::String("x".to_string()).as_i64().is_err());
        assert!(ConfigValue::Integer(1).as_string().is_err());
    }
}
