// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_MEMORY_BUDGET_BYTES, DEFAULT_POOL_GROWTH_INCREMENT, DEFAULT_POOL_INITIAL_CAPACITY,
};
use crate::errors::ConfigError;
use crate::trace::PoolSettings;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Engine-wide settings, independent of any particular flow.
///
/// Every field is optional; missing values fall back to the defaults in
/// [`crate::config::consts`]. Loaded from YAML or TOML depending on the file extension.
///
/// # Example
/// ```yaml
/// memory_budget_bytes: 1073741824
/// log_warnings_as_errors: true
/// pool:
///   initial_capacity: 64
///   growth_increment: 32
/// ```
///
/// The same in TOML:
/// ```toml
/// memory_budget_bytes = 1073741824
/// log_warnings_as_errors = true
///
/// [pool]
/// initial_capacity = 64
/// growth_increment = 32
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Ceiling for sample bytes held by live traces.
    pub memory_budget_bytes: Option<u64>,
    #[serde(default)]
    pub pool: PoolConfig,
    /// Fail the initialization pass if any module logged a warning.
    pub log_warnings_as_errors: Option<bool>,
}

/// Growth schedule of the trace pool.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    pub initial_capacity: Option<usize>,
    pub growth_increment: Option<usize>,
}

impl EngineConfig {
    pub fn memory_budget_bytes(&self) -> u64 {
        self.memory_budget_bytes.unwrap_or(DEFAULT_MEMORY_BUDGET_BYTES)
    }

    /// Override the memory budget with a size in MiB.
    pub fn set_memory_budget_mb(&mut self, megabytes: u64) -> Result<(), ConfigError> {
        let bytes = megabytes
            .checked_mul(1024 * 1024)
            .ok_or(ConfigError::MemoryBudgetOverflow(megabytes))?;
        self.memory_budget_bytes = Some(bytes);
        Ok(())
    }

    pub fn warnings_as_errors(&self) -> bool {
        self.log_warnings_as_errors.unwrap_or(false)
    }

    /// Pool settings with defaults filled in.
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            budget_bytes: self.memory_budget_bytes(),
            initial_capacity: self
                .pool
                .initial_capacity
                .unwrap_or(DEFAULT_POOL_INITIAL_CAPACITY),
            growth_increment: self
                .pool
                .growth_increment
                .unwrap_or(DEFAULT_POOL_GROWTH_INCREMENT),
        }
    }
}

/// Format of an engine configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are TOML; everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Load an engine configuration, choosing the format from the extension.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content, ConfigFormat::from_path(path))
}

pub fn parse_config(content: &str, format: ConfigFormat) -> Result<EngineConfig, ConfigError> {
    // An empty YAML document deserializes to null rather than an empty map.
    if content.trim().is_empty() {
        return Ok(EngineConfig::default());
    }
    let config = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_yaml_config() {
        let yaml = r#"
memory_budget_bytes: 1048576
log_warnings_as_errors: true
pool:
  initial_capacity: 4
"#;
        let cfg = parse_config(yaml, ConfigFormat::Yaml).unwrap();
        let settings = cfg.pool_settings();

        assert_eq!(settings.budget_bytes, 1_048_576);
        assert_eq!(settings.initial_capacity, 4);
        assert_eq!(settings.growth_increment, DEFAULT_POOL_GROWTH_INCREMENT);
        assert!(cfg.warnings_as_errors());
    }

    #[test]
    fn parse_toml_config() {
        let toml = r#"
memory_budget_bytes = 2048

[pool]
growth_increment = 8
"#;
        let cfg = parse_config(toml, ConfigFormat::Toml).unwrap();

        assert_eq!(cfg.memory_budget_bytes(), 2048);
        assert_eq!(cfg.pool.growth_increment, Some(8));
        assert!(!cfg.warnings_as_errors());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = parse_config("\n", ConfigFormat::Yaml).unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.pool_settings(), PoolSettings::default());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = parse_config("memory_budget: 10\n", ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));

        let err = parse_config("[pool]\nsize = 3\n", ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_load_config_picks_format_from_extension() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "log_warnings_as_errors = true").unwrap();

        let cfg = load_config(file.path()).unwrap();
        assert!(cfg.warnings_as_errors());
    }

    #[test]
    fn test_memory_budget_in_megabytes() {
        let mut cfg = EngineConfig::default();
        cfg.set_memory_budget_mb(3).unwrap();
        assert_eq!(cfg.memory_budget_bytes(), 3 * 1024 * 1024);

        let err = cfg.set_memory_budget_mb(u64::MAX / 1024).unwrap_err();
        assert!(matches!(err, ConfigError::MemoryBudgetOverflow(_)));
        assert_eq!(cfg.memory_budget_bytes(), 3 * 1024 * 1024);
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err = load_config("/nonexistent/seisflow.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
