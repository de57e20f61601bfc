//! TOML configuration loading.
//!
//! Document shape: a `[global]` table of defaults and listen address, a
//! top-level `autoscaler_files` list, and zero or more `[[autoscalers]]`
//! entries defined either inline or in a referenced file.
//!
//! `autoscaler_files` entries are glob patterns, expanded with `glob`
//! relative to the main file's directory; every matched file is expected to
//! contain its own `autoscalers` array.

use std::collections::HashMap as StdHashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use ladder_core::{AutoscalerConfig, BlockConfig, BlockConfigMap, ConfigValue, InputterConfig};
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
struct GlobalSection {
    #[serde(default)]
    listen_address: Option<String>,
    #[serde(default, with = "humantime_serde::option")]
    interval: Option<Duration>,
    #[serde(default, with = "humantime_serde::option")]
    warmup: Option<Duration>,
    #[serde(default, with = "humantime_serde::option")]
    scaling_wait_timeout: Option<Duration>,
}

#[derive(Debug, Deserialize, Default)]
struct Document {
    #[serde(default)]
    global: GlobalSection,
    #[serde(default)]
    autoscaler_files: Vec<String>,
    #[serde(default)]
    autoscalers: Vec<RawAutoscaler>,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    kind: String,
    #[serde(default)]
    config: StdHashMap<String, toml::Value>,
}

#[derive(Debug, Deserialize)]
struct RawInputter {
    name: String,
    #[serde(default)]
    description: String,
    gather: RawBlock,
    #[serde(default)]
    arrange: Option<RawBlock>,
}

#[derive(Debug, Deserialize)]
struct RawAutoscaler {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    disabled: bool,
    #[serde(default, with = "humantime_serde::option")]
    interval: Option<Duration>,
    #[serde(default, with = "humantime_serde::option")]
    warmup: Option<Duration>,
    #[serde(default, with = "humantime_serde::option")]
    scaling_wait_timeout: Option<Duration>,
    scale: RawBlock,
    #[serde(default)]
    solve: Option<RawBlock>,
    #[serde(default)]
    filters: Vec<RawBlock>,
    inputters: Vec<RawInputter>,
}

fn toml_to_config_value(value: &toml::Value) -> Result<ConfigValue> {
    Ok(match value {
        toml::Value::Integer(i) => ConfigValue::Integer(*i),
        toml::Value::Float(f) => ConfigValue::Float(*f),
        toml::Value::Boolean(b) => ConfigValue::Bool(*b),
        toml::Value::String(s) => ConfigValue::String(s.clone()),
        toml::Value::Array(items) => {
            let converted = items.iter().map(toml_to_config_value).collect::<Result<Vec<_>>>()?;
            ConfigValue::List(converted)
        }
        toml::Value::Table(table) => {
            let mut converted = StdHashMap::with_capacity(table.len());
            for (k, v) in table {
                converted.insert(k.clone(), toml_to_config_value(v)?);
            }
            ConfigValue::Table(converted)
        }
        toml::Value::Datetime(_) => anyhow::bail!("datetime config values are not supported"),
    })
}

fn raw_block_to_config(raw: RawBlock) -> Result<BlockConfig> {
    let mut map = StdHashMap::with_capacity(raw.config.len());
    for (k, v) in raw.config {
        map.insert(k, toml_to_config_value(&v)?);
    }
    Ok(BlockConfig {
        kind: raw.kind,
        config: BlockConfigMap(map),
    })
}

/// A fully loaded document: the resolved global defaults plus every
/// autoscaler found either inline or in a referenced file, with per-field
/// defaults applied and `disabled` entries kept (the caller decides what to
/// do with them, e.g. still list them in the health-check endpoint).
pub struct LoadedConfig {
    pub listen_address: Option<String>,
    pub autoscalers: Vec<AutoscalerConfig>,
}

const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

fn parse_document(path: &Path) -> Result<Document> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
}

fn convert_autoscaler(raw: RawAutoscaler, global: &GlobalSection) -> Result<AutoscalerConfig> {
    let mut inputters = Vec::with_capacity(raw.inputters.len());
    for i in raw.inputters {
        inputters.push(InputterConfig {
            name: i.name,
            description: i.description,
            gather: raw_block_to_config(i.gather)?,
            arrange: i.arrange.map(raw_block_to_config).transpose()?,
        });
    }

    Ok(AutoscalerConfig {
        name: raw.name,
        description: raw.description,
        disabled: raw.disabled,
        interval: raw.interval.or(global.interval).unwrap_or(DEFAULT_INTERVAL),
        warmup: raw.warmup.or(global.warmup).unwrap_or(Duration::ZERO),
        scaling_wait_timeout: raw.scaling_wait_timeout.or(global.scaling_wait_timeout).unwrap_or(Duration::ZERO),
        scale: raw_block_to_config(raw.scale)?,
        solve: raw.solve.map(raw_block_to_config).transpose()?,
        filters: raw.filters.into_iter().map(raw_block_to_config).collect::<Result<Vec<_>>>()?,
        inputters,
    })
}

/// Loads the main config file and every file matched by its
/// `autoscaler_files` glob patterns. Matched files are resolved relative to
/// the main file's directory and are expected to contain their own
/// `autoscalers` array; their own `global`/`autoscaler_files` entries, if
/// present, are ignored (one level of referencing only).
pub fn load(path: &Path) -> Result<LoadedConfig> {
    let doc = parse_document(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut raw_autoscalers = doc.autoscalers;

    for pattern in &doc.autoscaler_files {
        let full_pattern = base_dir.join(pattern);
        let full_pattern = full_pattern.to_str().with_context(|| format!("non-UTF-8 glob pattern '{pattern}'"))?;
        let matches = glob::glob(full_pattern).with_context(|| format!("invalid glob pattern '{pattern}'"))?;
        for entry in matches {
            let file_path: PathBuf = entry.with_context(|| format!("reading a path matched by '{pattern}'"))?;
            let nested = parse_document(&file_path)?;
            raw_autoscalers.extend(nested.autoscalers);
        }
    }

    let mut autoscalers = Vec::with_capacity(raw_autoscalers.len());
    for raw in raw_autoscalers {
        autoscalers.push(convert_autoscaler(raw, &doc.global)?);
    }

    Ok(LoadedConfig {
        listen_address: doc.global.listen_address,
        autoscalers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_integer_converts() {
        let v = toml::Value::Integer(42);
        assert_eq!(toml_to_config_value(&v).unwrap(), ConfigValue::Integer(42));
    }

    #[test]
    fn datetime_is_rejected() {
        let v = toml::Value::Datetime("2024-01-01T00:00:00Z".parse().unwrap());
        assert!(toml_to_config_value(&v).is_err());
    }
}
