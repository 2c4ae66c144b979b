//! Configuration loading: `application.yaml` + profile overlay + env
//! overlay, following `r2e_core::R2eConfig`'s resolution order.

use std::collections::HashMap;
use std::path::Path;

/// Error type for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    NotFound(String),
    TypeMismatch { key: String, expected: &'static str },
    Load(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "config type mismatch for '{key}': expected {expected}")
            }
            ConfigError::Load(msg) => write!(f, "config load error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::error::EngineError {
    fn from(err: ConfigError) -> Self {
        crate::error::EngineError::internal(err.to_string())
    }
}

/// A single configuration value, parsed from YAML or an env var.
#[derive(Debug, Clone)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl ConfigValue {
    fn from_yaml(value: &serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Bool(b) => ConfigValue::Bool(*b),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ConfigValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    ConfigValue::Float(f)
                } else {
                    ConfigValue::String(n.to_string())
                }
            }
            serde_yaml::Value::String(s) => ConfigValue::String(s.clone()),
            other => ConfigValue::String(serde_yaml::to_string(other).unwrap_or_default()),
        }
    }
}

/// Converts a [`ConfigValue`] into a concrete type.
pub trait FromConfigValue: Sized {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError>;
}

impl FromConfigValue for String {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::String(s) => Ok(s.clone()),
            ConfigValue::Integer(i) => Ok(i.to_string()),
            ConfigValue::Float(f) => Ok(f.to_string()),
            ConfigValue::Bool(b) => Ok(b.to_string()),
            ConfigValue::Null => Err(ConfigError::TypeMismatch { key: key.into(), expected: "String" }),
        }
    }
}

impl FromConfigValue for i64 {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::Integer(i) => Ok(*i),
            ConfigValue::String(s) => {
                s.parse().map_err(|_| ConfigError::TypeMismatch { key: key.into(), expected: "i64" })
            }
            _ => Err(ConfigError::TypeMismatch { key: key.into(), expected: "i64" }),
        }
    }
}

impl FromConfigValue for f64 {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::Float(f) => Ok(*f),
            ConfigValue::Integer(i) => Ok(*i as f64),
            ConfigValue::String(s) => {
                s.parse().map_err(|_| ConfigError::TypeMismatch { key: key.into(), expected: "f64" })
            }
            _ => Err(ConfigError::TypeMismatch { key: key.into(), expected: "f64" }),
        }
    }
}

impl FromConfigValue for bool {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::Bool(b) => Ok(*b),
            ConfigValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(ConfigError::TypeMismatch { key: key.into(), expected: "bool" }),
            },
            _ => Err(ConfigError::TypeMismatch { key: key.into(), expected: "bool" }),
        }
    }
}

/// Ambient engine settings every crate reads: rate limits, batching,
/// timeouts, and the retrieval assembler's large-table threshold.
///
/// Loaded from `application.yaml`, overlaid with `application-{profile}.yaml`,
/// then with environment variables (`ENGINE_BATCH_SIZE` -> `engine.batch_size`).
/// Resolution order matches `r2e_core::R2eConfig`: base file, profile file,
/// `.env`, environment.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    values: HashMap<String, ConfigValue>,
    profile: String,
}

impl EngineConfig {
    /// Load for the given profile, reading `application.yaml` and
    /// `application-{profile}.yaml` from the current working directory.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        let active_profile = std::env::var("ENGINE_PROFILE").unwrap_or_else(|_| profile.to_string());
        let mut values = HashMap::new();

        load_yaml_file(Path::new("application.yaml"), &mut values)?;
        let profile_path = format!("application-{active_profile}.yaml");
        load_yaml_file(Path::new(&profile_path), &mut values)?;

        let _ = dotenvy::dotenv();
        let _ = dotenvy::from_filename(format!(".env.{active_profile}"));

        for (env_key, env_val) in std::env::vars() {
            if let Some(config_key) = env_key.strip_prefix("ENGINE_") {
                values.insert(config_key.to_lowercase().replace('_', "."), ConfigValue::String(env_val));
            }
        }

        Ok(EngineConfig { values, profile: active_profile })
    }

    /// An empty config seeded with the engine's documented defaults —
    /// what a fresh `application.yaml`-less deployment gets.
    pub fn defaults() -> Self {
        let mut values = HashMap::new();
        values.insert("max_concurrent_batches".into(), ConfigValue::Integer(5));
        values.insert("batch_size".into(), ConfigValue::Integer(75));
        values.insert("large_table_word_threshold".into(), ConfigValue::Integer(700));
        values.insert("external_call_timeout_secs".into(), ConfigValue::Integer(30));
        values.insert("pdf_conversion_soft_timeout_secs".into(), ConfigValue::Integer(30));
        values.insert("pdf_conversion_hard_kill_secs".into(), ConfigValue::Integer(35));
        values.insert("credential_refresh_buffer_secs".into(), ConfigValue::Integer(300));
        EngineConfig { values, profile: "test".into() }
    }

    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        load_yaml_str(yaml, &mut values)?;
        Ok(EngineConfig { values, profile: profile.to_string() })
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self.values.get(key).ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> V {
        self.get(key).unwrap_or(default)
    }

    pub fn max_concurrent_batches(&self) -> usize {
        self.get_or("max_concurrent_batches", 5i64) as usize
    }

    pub fn batch_size(&self) -> usize {
        self.get_or("batch_size", 75i64) as usize
    }

    pub fn large_table_word_threshold(&self) -> usize {
        self.get_or("large_table_word_threshold", 700i64) as usize
    }

    pub fn external_call_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.get_or("external_call_timeout_secs", 30i64) as u64)
    }

    pub fn pdf_conversion_soft_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.get_or("pdf_conversion_soft_timeout_secs", 30i64) as u64)
    }

    pub fn pdf_conversion_hard_kill(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.get_or("pdf_conversion_hard_kill_secs", 35i64) as u64)
    }

    pub fn credential_refresh_buffer(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.get_or("credential_refresh_buffer_secs", 300i64) as u64)
    }
}

fn load_yaml_file(path: &Path, out: &mut HashMap<String, ConfigValue>) -> Result<(), ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => load_yaml_str(&contents, out),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ConfigError::Load(e.to_string())),
    }
}

fn load_yaml_str(yaml: &str, out: &mut HashMap<String, ConfigValue>) -> Result<(), ConfigError> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Load(e.to_string()))?;
    flatten(&value, "", out);
    Ok(())
}

fn flatten(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, ConfigValue>) {
    if let serde_yaml::Value::Mapping(map) = value {
        for (k, v) in map {
            let serde_yaml::Value::String(key) = k else { continue };
            let full_key = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
            if matches!(v, serde_yaml::Value::Mapping(_)) {
                flatten(v, &full_key, out);
            } else {
                out.insert(full_key, ConfigValue::from_yaml(v));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_readable() {
        let cfg = EngineConfig::defaults();
        assert_eq!(cfg.max_concurrent_batches(), 5);
        assert_eq!(cfg.batch_size(), 75);
        assert_eq!(cfg.large_table_word_threshold(), 700);
    }

    #[test]
    fn yaml_overrides_defaults() {
        let cfg = EngineConfig::from_yaml_str(
            "batch_size: 20\nlarge_table_word_threshold: 350\n",
            "test",
        )
        .unwrap();
        assert_eq!(cfg.batch_size(), 20);
        assert_eq!(cfg.large_table_word_threshold(), 350);
        // unset keys fall back to the documented default
        assert_eq!(cfg.max_concurrent_batches(), 5);
    }

    #[test]
    fn missing_key_without_default_is_not_found() {
        let cfg = EngineConfig::defaults();
        let result: Result<String, _> = cfg.get("nonexistent.key");
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
