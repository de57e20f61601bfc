//! The untyped configuration mapping passed from the agent's config loader
//! down to block factories, and the typed configuration structures that
//! describe an autoscaler instance.
//!
//! `ConfigValue` replaces the source's generic "recover from a failed type
//! assertion" trick with explicit, checked coercion: factories ask for a
//! specific shape and get a [`ConfigError`] back if the value doesn't match,
//! instead of panicking on a bad downcast.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

/// A structural or semantic violation of configuration. Fatal for the
/// autoscaler (or block) being configured; never escapes a factory boundary
/// as a panic.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required config key '{0}'")]
    Missing(String),
    #[error("config key '{key}' has the wrong type: expected {expected}, got {got}")]
    WrongType {
        key: String,
        expected: &'static str,
        got: &'static str,
    },
    #[error("config key '{key}' is invalid: {reason}")]
    Invalid { key: String, reason: String },
}

/// An untyped configuration value, as it arrives from the agent's TOML
/// loader. Any signed integer width widens to `Integer(i64)`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    String(String),
    List(Vec<ConfigValue>),
    Table(HashMap<String, ConfigValue>),
}

impl ConfigValue {
    fn kind_name(&self) -> &'static str {
        match self {
            ConfigValue::Integer(_) => "integer",
            ConfigValue::Float(_) => "float",
            ConfigValue::Bool(_) => "bool",
            ConfigValue::String(_) => "string",
            ConfigValue::List(_) => "list",
            ConfigValue::Table(_) => "table",
        }
    }

    pub fn as_i64(&self) -> Result<i64, &'static str> {
        match self {
            ConfigValue::Integer(v) => Ok(*v),
            _ => Err(self.kind_name()),
        }
    }

    pub fn as_f64(&self) -> Result<f64, &'static str> {
        match self {
            ConfigValue::Integer(v) => Ok(*v as f64),
            ConfigValue::Float(v) => Ok(*v),
            _ => Err(self.kind_name()),
        }
    }

    pub fn as_bool(&self) -> Result<bool, &'static str> {
        match self {
            ConfigValue::Bool(v) => Ok(*v),
            _ => Err(self.kind_name()),
        }
    }

    pub fn as_str(&self) -> Result<&str, &'static str> {
        match self {
            ConfigValue::String(v) => Ok(v),
            _ => Err(self.kind_name()),
        }
    }

    pub fn as_list(&self) -> Result<&[ConfigValue], &'static str> {
        match self {
            ConfigValue::List(v) => Ok(v),
            _ => Err(self.kind_name()),
        }
    }
}

/// A thin, checked accessor over a block's configuration table. Built-in and
/// third-party block factories use this instead of indexing the map
/// directly, so that a missing or mistyped key always becomes a
/// [`ConfigError`] rather than a panic.
#[derive(Debug, Clone, Default)]
pub struct BlockConfigMap(pub HashMap<String, ConfigValue>);

impl BlockConfigMap {
    fn get(&self, key: &str) -> Result<&ConfigValue, ConfigError> {
        self.0.get(key).ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, ConfigError> {
        self.get(key)?.as_i64().map_err(|got| ConfigError::WrongType {
            key: key.to_string(),
            expected: "integer",
            got,
        })
    }

    pub fn get_i64_or(&self, key: &str, default: i64) -> Result<i64, ConfigError> {
        match self.0.get(key) {
            Some(v) => v.as_i64().map_err(|got| ConfigError::WrongType {
                key: key.to_string(),
                expected: "integer",
                got,
            }),
            None => Ok(default),
        }
    }

    pub fn get_f64(&self, key: &str) -> Result<f64, ConfigError> {
        self.get(key)?.as_f64().map_err(|got| ConfigError::WrongType {
            key: key.to_string(),
            expected: "float",
            got,
        })
    }

    pub fn get_f64_or(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
        match self.0.get(key) {
            Some(v) => v.as_f64().map_err(|got| ConfigError::WrongType {
                key: key.to_string(),
                expected: "float",
                got,
            }),
            None => Ok(default),
        }
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.0.get(key) {
            Some(v) => v.as_bool().map_err(|got| ConfigError::WrongType {
                key: key.to_string(),
                expected: "bool",
                got,
            }),
            None => Ok(default),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key)?.as_str().map_err(|got| ConfigError::WrongType {
            key: key.to_string(),
            expected: "string",
            got,
        })
    }

    pub fn get_i64_list(&self, key: &str) -> Result<Vec<i64>, ConfigError> {
        let list = self.get(key)?.as_list().map_err(|got| ConfigError::WrongType {
            key: key.to_string(),
            expected: "list",
            got,
        })?;
        list.iter()
            .map(|v| {
                v.as_i64().map_err(|got| ConfigError::WrongType {
                    key: key.to_string(),
                    expected: "list of integer",
                    got,
                })
            })
            .collect()
    }

    pub fn get_i64_list_or(&self, key: &str, default: Vec<i64>) -> Result<Vec<i64>, ConfigError> {
        if self.0.contains_key(key) {
            self.get_i64_list(key)
        } else {
            Ok(default)
        }
    }
}

/// Selects a registered factory (`kind`) and carries the configuration
/// passed to it verbatim.
#[derive(Debug, Clone, Default)]
pub struct BlockConfig {
    pub kind: String,
    pub config: BlockConfigMap,
}

impl BlockConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        BlockConfig {
            kind: kind.into(),
            config: BlockConfigMap::default(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.config.0.insert(key.into(), value);
        self
    }
}

/// Configuration of a single [`crate::inputter::Inputter`]: a mandatory
/// gatherer and an optional arranger.
#[derive(Debug, Clone)]
pub struct InputterConfig {
    pub name: String,
    pub description: String,
    pub gather: BlockConfig,
    pub arrange: Option<BlockConfig>,
}

/// Configuration of one autoscaler instance.
#[derive(Debug, Clone)]
pub struct AutoscalerConfig {
    pub name: String,
    pub description: String,
    pub disabled: bool,
    pub interval: Duration,
    pub warmup: Duration,
    pub scaling_wait_timeout: Duration,
    pub scale: BlockConfig,
    pub solve: Option<BlockConfig>,
    pub filters: Vec<BlockConfig>,
    pub inputters: Vec<InputterConfig>,
}

impl AutoscalerConfig {
    /// Validates the structural invariants spec'd for an `AutoscalerConfig`:
    /// a non-empty name, at least one inputter, and a solver kind whenever
    /// more than one inputter is configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Invalid {
                key: "name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.inputters.is_empty() {
            return Err(ConfigError::Invalid {
                key: "inputters".to_string(),
                reason: "must contain at least one inputter".to_string(),
            });
        }
        if self.inputters.len() > 1 {
            let solver_kind_present = self.solve.as_ref().is_some_and(|s| !s.kind.is_empty());
            if !solver_kind_present {
                return Err(ConfigError::Invalid {
                    key: "solve.kind".to_string(),
                    reason: "required when more than one inputter is configured".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_accessors() {
        let mut map = HashMap::new();
        map.insert("factor".to_string(), ConfigValue::Integer(4));
        map.insert("round_type".to_string(), ConfigValue::String("ceil".to_string()));
        let cfg = BlockConfigMap(map);

        assert_eq!(cfg.get_i64("factor").unwrap(), 4);
        assert_eq!(cfg.get_str("round_type").unwrap(), "ceil");
        assert!(matches!(cfg.get_i64("round_type"), Err(ConfigError::WrongType { .. })));
        assert!(matches!(cfg.get_i64("missing"), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn validate_requires_solver_for_multiple_inputters() {
        let base = AutoscalerConfig {
            name: "a".into(),
            description: String::new(),
            disabled: false,
            interval: Duration::from_secs(1),
            warmup: Duration::ZERO,
            scaling_wait_timeout: Duration::ZERO,
            scale: BlockConfig::new("dummy"),
            solve: None,
            filters: vec![],
            inputters: vec![
                InputterConfig {
                    name: "i1".into(),
                    description: String::new(),
                    gather: BlockConfig::new("dummy"),
                    arrange: None,
                },
                InputterConfig {
                    name: "i2".into(),
                    description: String::new(),
                    gather: BlockConfig::new("dummy"),
                    arrange: None,
                },
            ],
        };
        assert!(base.validate().is_err());

        let mut with_solver = base.clone();
        with_solver.solve = Some(BlockConfig::new("sum"));
        assert!(with_solver.validate().is_ok());
    }
}
