//! Configuration management.
//!
//! Values come from a stack of [`ConfigSource`]s checked in priority order:
//! environment variables, in-memory maps, or a JSON file. [`Settings`] reads
//! the application's keys from a [`ConfigProvider`].

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration key {0} not found")]
    Missing(String),
    #[error("Configuration key {key} is not {expected}")]
    Type { key: String, expected: &'static str },
    #[error("Configuration key {key} is out of range: {value}")]
    Range { key: String, value: i64 },
    #[error("Cannot read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON configuration in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A configuration value that can be various types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<ConfigValue>),
    Object(HashMap<String, ConfigValue>),
}

impl ConfigValue {
    pub fn as_string(&self) -> Option<String> {
        match self {
            ConfigValue::String(s) => Some(s.clone()),
            ConfigValue::Integer(i) => Some(i.to_string()),
            ConfigValue::Float(f) => Some(f.to_string()),
            ConfigValue::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            ConfigValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Only an explicit `true` counts as true.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            ConfigValue::String(s) => Some(s == "true"),
            _ => None,
        }
    }

    /// Arrays, or comma-separated strings.
    pub fn as_list(&self) -> Option<Vec<String>> {
        match self {
            ConfigValue::Array(items) => Some(items.iter().filter_map(ConfigValue::as_string).collect()),
            ConfigValue::String(s) => Some(
                s.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Option<ConfigValue>;

    fn keys(&self) -> Vec<String>;
}

/// Environment variable configuration source
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
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        env::var(self.env_key(key)).ok().map(ConfigValue::String)
    }

    fn keys(&self) -> Vec<String> {
        env::vars()
            .filter_map(|(key, _)| match &self.prefix {
                Some(prefix) => key
                    .strip_prefix(&format!("{}_", prefix.to_uppercase()))
                    .map(str::to_string),
                None => Some(key),
            })
            .collect()
    }
}

/// In-memory configuration source, mostly for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MapConfigSource {
    values: HashMap<String, ConfigValue>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), ConfigValue::String(value.into()));
        self
    }

    pub fn set_value(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
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

/// JSON file configuration source: a flat object of keys to values.
#[derive(Debug)]
pub struct JsonConfigSource {
    path: PathBuf,
    config: RwLock<HashMap<String, ConfigValue>>,
}

impl JsonConfigSource {
    /// Reads and parses the file immediately.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let source = Self {
            path: path.into(),
            config: RwLock::new(HashMap::new()),
        };
        source.reload()?;
        Ok(source)
    }

    /// Re-reads the file.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        let parsed: HashMap<String, ConfigValue> = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: self.path.clone(),
            source,
        })?;
        *self.config.write() = parsed;
        Ok(())
    }
}

impl ConfigSource for JsonConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.config.read().get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.config.read().keys().cloned().collect()
    }
}

/// Layered configuration lookup with a per-key cache.
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

    /// Adds a source. Sources added first take priority.
    pub fn add_source(&mut self, source: Box<dyn ConfigSource>) {
        self.sources.push(source);
        self.invalidate_cache();
    }

    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.add_source(Box::new(source));
        self
    }

    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        if let Some(value) = self.cache.read().get(key) {
            return Some(value.clone());
        }

        let value = self.sources.iter().find_map(|source| source.get(key))?;
        self.cache.write().insert(key.to_string(), value.clone());
        Some(value)
    }

    pub fn get_string(&self, key: &str) -> Result<String, ConfigError> {
        let value = self.get(key).ok_or_else(|| ConfigError::Missing(key.to_string()))?;
        value.as_string().ok_or_else(|| ConfigError::Type {
            key: key.to_string(),
            expected: "a string",
        })
    }

    pub fn get_string_opt(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_string()).filter(|s| !s.is_empty())
    }

    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string_opt(key).unwrap_or_else(|| default.to_string())
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, ConfigError> {
        let value = self.get(key).ok_or_else(|| ConfigError::Missing(key.to_string()))?;
        value.as_i64().ok_or_else(|| ConfigError::Type {
            key: key.to_string(),
            expected: "an integer",
        })
    }

    /// Reads a port number; absent keys yield `default`.
    pub fn get_port_or(&self, key: &str, default: u16) -> Result<u16, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(_) => {
                let value = self.get_i64(key)?;
                u16::try_from(value).map_err(|_| ConfigError::Range {
                    key: key.to_string(),
                    value,
                })
            }
        }
    }

    pub fn get_u32_or(&self, key: &str, default: u32) -> Result<u32, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(_) => {
                let value = self.get_i64(key)?;
                u32::try_from(value).map_err(|_| ConfigError::Range {
                    key: key.to_string(),
                    value,
                })
            }
        }
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).and_then(|v| v.as_list())
    }

    pub fn invalidate_cache(&self) {
        self.cache.write().clear();
    }

    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sources.iter().flat_map(|s| s.keys()).collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

impl Default for ConfigProvider {
    fn default() -> Self {
        Self::new().with_source(EnvironmentConfigSource::new())
    }
}

pub const DEFAULT_PORT: u16 = 2000;
pub const DEFAULT_REDIS_PORT: u16 = 6379;
pub const DEFAULT_PUBLIC_DIR: &str = "public";

/// Requests allowed per client address per minute; zero turns limiting off.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Routes reachable without a token when authentication is enabled.
pub const DEFAULT_PUBLIC_ROUTES: &[&str] = &["/auth/login", "/docs", "/docs/json", "/login.html", "/js/login.js"];

/// Application settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub node_env: String,
    pub architecture: String,
    pub port: u16,
    pub log_level: String,
    pub jwt_secret: Option<String>,
    pub auth_enabled: bool,
    pub auth_model_name: String,
    pub auth_username_field: String,
    pub auth_email_field: String,
    pub auth_password_field: String,
    pub redis_host: Option<String>,
    pub redis_port: u16,
    pub public_routes: Vec<String>,
    pub public_dir: PathBuf,
    pub rate_limit_per_minute: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            node_env: "development".to_string(),
            architecture: "none".to_string(),
            port: DEFAULT_PORT,
            log_level: "info".to_string(),
            jwt_secret: None,
            auth_enabled: false,
            auth_model_name: "User".to_string(),
            auth_username_field: "username".to_string(),
            auth_email_field: "email".to_string(),
            auth_password_field: "password".to_string(),
            redis_host: None,
            redis_port: DEFAULT_REDIS_PORT,
            public_routes: DEFAULT_PUBLIC_ROUTES.iter().map(|r| r.to_string()).collect(),
            public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR),
            rate_limit_per_minute: DEFAULT_RATE_LIMIT,
        }
    }
}

impl Settings {
    pub fn from_provider(config: &ConfigProvider) -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        Ok(Self {
            node_env: config.get_string_or("NODE_ENV", &defaults.node_env),
            architecture: config.get_string_or("ARCHITECTURE", &defaults.architecture),
            port: config.get_port_or("PORT", DEFAULT_PORT)?,
            log_level: config.get_string_or("LOG_LEVEL", &defaults.log_level),
            jwt_secret: config.get_string_opt("JWT_SECRET"),
            auth_enabled: config.get_bool_or("AUTH_ENABLED", false),
            auth_model_name: config.get_string_or("AUTH_MODEL_NAME", &defaults.auth_model_name),
            auth_username_field: config.get_string_or("AUTH_USERNAME_FIELD", &defaults.auth_username_field),
            auth_email_field: config.get_string_or("AUTH_EMAIL_FIELD", &defaults.auth_email_field),
            auth_password_field: config.get_string_or("AUTH_PASSWORD_FIELD", &defaults.auth_password_field),
            redis_host: config.get_string_opt("REDIS_HOST"),
            redis_port: config.get_port_or("REDIS_PORT", DEFAULT_REDIS_PORT)?,
            public_routes: config.get_list("PUBLIC_ROUTES").unwrap_or(defaults.public_routes),
            public_dir: config.get_string_opt("PUBLIC_DIR").map(PathBuf::from).unwrap_or(defaults.public_dir),
            rate_limit_per_minute: config.get_u32_or("RATE_LIMIT_MAX", DEFAULT_RATE_LIMIT)?,
        })
    }

    /// Reads settings from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_provider(&ConfigProvider::default())
    }

    pub fn is_production(&self) -> bool {
        self.node_env == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_values_keep_their_spelling() {
        let provider = ConfigProvider::new().with_source(
            MapConfigSource::new()
                .set("JWT_SECRET", "007")
                .set("AUTH_MODEL_NAME", "1e3")
                .set("PORT", " 8080 "),
        );
        assert_eq!(provider.get("JWT_SECRET"), Some(ConfigValue::String("007".to_string())));
        assert_eq!(provider.get_string("AUTH_MODEL_NAME").unwrap(), "1e3");
        assert_eq!(provider.get_i64("PORT").unwrap(), 8080);
    }

    #[test]
    fn first_source_wins() {
        let provider = ConfigProvider::new()
            .with_source(MapConfigSource::new().set("PORT", "8080"))
            .with_source(MapConfigSource::new().set("PORT", "9090").set("LOG_LEVEL", "debug"));

        assert_eq!(provider.get_i64("PORT").unwrap(), 8080);
        assert_eq!(provider.get_string("LOG_LEVEL").unwrap(), "debug");
        assert!(matches!(provider.get_string("NOPE"), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn only_literal_true_enables_a_flag() {
        let provider = ConfigProvider::new().with_source(
            MapConfigSource::new()
                .set("A", "true")
                .set("B", "yes")
                .set("C", "1"),
        );
        assert!(provider.get_bool_or("A", false));
        assert!(!provider.get_bool_or("B", false));
        assert!(!provider.get_bool_or("C", false));
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        let provider = ConfigProvider::new().with_source(MapConfigSource::new().set("PORT", "70000"));
        assert!(matches!(provider.get_port_or("PORT", 1), Err(ConfigError::Range { .. })));
    }
}
