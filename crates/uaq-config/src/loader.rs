// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading.
//!
//! # Loading Pipeline
//!
//! 1. Read the file and pick the format from its extension
//! 2. Resolve `${VAR}` / `${VAR:default}` placeholders in the raw text
//! 3. Parse into [`UaqConfig`]
//! 4. Apply `UAQ_*` environment overrides
//! 5. Resolve relative paths against the config file directory
//! 6. Validate
//!
//! # Environment Variable Override
//!
//! ```text
//! UAQ_UNKNOWN_READ_TYPE=strict
//! UAQ_MAX_EVENTS=5000
//! UAQ_NAMESPACES=urn:plant,urn:line2
//! UAQ_SERVER_FIXTURE=/srv/uaq/plant.json
//! UAQ_LOG_LEVEL=debug
//! UAQ_LOG_FORMAT=json
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{LogFormat, LogLevel, UaqConfig};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "UAQ";

// =============================================================================
// ConfigLoader
// =============================================================================

/// Configuration loader.
///
/// # Examples
///
/// ```no_run
/// use uaq_config::loader::ConfigLoader;
///
/// let config = ConfigLoader::new().load("uaq.yaml").unwrap();
/// println!("{} namespaces", config.namespaces.len());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Base directory for resolving relative paths.
    base_path: Option<PathBuf>,

    /// Environment variable prefix.
    env_prefix: String,

    /// Whether placeholders and overrides are applied.
    resolve_env_vars: bool,

    /// Whether relative paths are resolved.
    resolve_paths: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader with default settings.
    pub fn new() -> Self {
        Self {
            base_path: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            resolve_env_vars: true,
            resolve_paths: true,
        }
    }

    /// Creates a builder.
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::default()
    }

    /// Sets the base path for relative path resolution.
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables environment variable handling.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Enables or disables relative path resolution.
    pub fn with_path_resolution(mut self, enabled: bool) -> Self {
        self.resolve_paths = enabled;
        self
    }

    /// Loads configuration from a file.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<UaqConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let base_path = self.base_path.clone().unwrap_or_else(|| {
            path.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        });

        let content = self.read_file(path)?;
        let format = ConfigFormat::from_path(path)?;
        let mut config = self.parse_content(&content, format, path)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config, env_lookup)?;
        }

        if self.resolve_paths {
            resolve_relative_paths(&mut config, &base_path);
        }

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!(
            namespaces = config.namespaces.len(),
            unknown_read_type = %config.dispatch.unknown_read_type,
            max_events = config.dispatch.max_events,
            "Configuration summary"
        );

        Ok(config)
    }

    /// Loads configuration from a string.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<UaqConfig> {
        let content = if self.resolve_env_vars {
            resolve_placeholders(content, env_lookup)
        } else {
            content.to_string()
        };
        let mut config = parse_str(&content, format)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config, env_lookup)?;
        }

        if self.resolve_paths {
            if let Some(base_path) = &self.base_path {
                resolve_relative_paths(&mut config, base_path);
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn read_file(&self, path: &Path) -> ConfigResult<String> {
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
    }

    fn parse_content(
        &self,
        content: &str,
        format: ConfigFormat,
        path: &Path,
    ) -> ConfigResult<UaqConfig> {
        let content = if self.resolve_env_vars {
            resolve_placeholders(content, env_lookup)
        } else {
            content.to_string()
        };

        parse_str(&content, format).map_err(|e| match e {
            ConfigError::Serialization { message } => ConfigError::parse(path, message),
            other => other,
        })
    }

    /// Applies `<PREFIX>_*` overrides read through `lookup`.
    fn apply_env_overrides<F>(&self, config: &mut UaqConfig, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{}_{}", self.env_prefix, suffix);
            lookup(&name).map(|value| (name, value))
        };

        if let Some((name, value)) = var("UNKNOWN_READ_TYPE") {
            config.dispatch.unknown_read_type = value
                .parse()
                .map_err(|_| ConfigError::invalid_env_var(name, "expected 'permissive' or 'strict'"))?;
        }
        if let Some((name, value)) = var("MAX_EVENTS") {
            config.dispatch.max_events = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_env_var(name, "expected a positive integer"))?;
        }

        if let Some((_, value)) = var("NAMESPACES") {
            config.namespaces = value
                .split(',')
                .map(str::trim)
                .filter(|uri| !uri.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some((_, value)) = var("SERVER_FIXTURE") {
            config.server.fixture = if value.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }

        if let Some((name, value)) = var("LOG_LEVEL") {
            match parse_log_level(&value) {
                Some(level) => config.logging.level = level,
                None => warn!(variable = %name, value = %value, "Ignoring unknown log level"),
            }
        }
        if let Some((name, value)) = var("LOG_FORMAT") {
            config.logging.format = value
                .parse::<LogFormat>()
                .map_err(|_| ConfigError::invalid_env_var(name, "expected text, compact or json"))?;
        }

        Ok(())
    }
}

fn env_lookup(name: &str) -> Option<String> {
    env::var(name).ok()
}

/// Parses a string based on format.
fn parse_str(content: &str, format: ConfigFormat) -> ConfigResult<UaqConfig> {
    match format {
        ConfigFormat::Yaml => config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Yaml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::serialization(e.to_string())),
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
    }
}

/// Resolves `${VAR}` and `${VAR:default}` placeholders.
///
/// Unknown variables without a default are left in place.
fn resolve_placeholders<F>(content: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find('}') else {
            result.push_str(&rest[start..]);
            return result;
        };

        let body = &after[..end];
        let (name, default) = match body.split_once(':') {
            Some((name, default)) => (name, Some(default)),
            None => (body, None),
        };

        match (lookup(name), default) {
            (Some(value), _) => result.push_str(&value),
            (None, Some(default)) => result.push_str(default),
            (None, None) => {
                warn!("Environment variable '{}' not found", name);
                result.push_str(&rest[start..start + 2 + end + 1]);
            }
        }
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}

fn resolve_relative_paths(config: &mut UaqConfig, base_path: &Path) {
    if let Some(fixture) = &mut config.server.fixture {
        if fixture.is_relative() {
            *fixture = base_path.join(&*fixture);
        }
    }
}

// =============================================================================
// ConfigLoaderBuilder
// =============================================================================

/// Builder for [`ConfigLoader`].
#[derive(Debug, Default)]
pub struct ConfigLoaderBuilder {
    base_path: Option<PathBuf>,
    env_prefix: Option<String>,
    resolve_env_vars: Option<bool>,
    resolve_paths: Option<bool>,
}

impl ConfigLoaderBuilder {
    /// Sets the base path.
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Sets the environment variable prefix.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Enables or disables environment variable handling.
    pub fn resolve_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = Some(enabled);
        self
    }

    /// Enables or disables path resolution.
    pub fn resolve_paths(mut self, enabled: bool) -> Self {
        self.resolve_paths = Some(enabled);
        self
    }

    /// Builds the loader.
    pub fn build(self) -> ConfigLoader {
        let mut loader = ConfigLoader::new();

        if let Some(base_path) = self.base_path {
            loader.base_path = Some(base_path);
        }
        if let Some(prefix) = self.env_prefix {
            loader.env_prefix = prefix;
        }
        if let Some(resolve_env_vars) = self.resolve_env_vars {
            loader.resolve_env_vars = resolve_env_vars;
        }
        if let Some(resolve_paths) = self.resolve_paths {
            loader.resolve_paths = resolve_paths;
        }

        loader
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match extension.as_deref() {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// Returns the canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Parses a log level, accepting common aliases.
pub fn parse_log_level(s: &str) -> Option<LogLevel> {
    s.parse().ok()
}

/// Loads configuration from a file with default settings.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<UaqConfig> {
    ConfigLoader::new().load(path)
}

/// Loads configuration from a string with default settings.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<UaqConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use uaq_query::UnknownReadTypePolicy;

    const YAML: &str = r#"
dispatch:
  unknown_read_type: strict
  max_events: 250
namespaces:
  - urn:example:plant
  - urn:example:line2
server:
  fixture: fixtures/plant.json
logging:
  level: debug
  format: json
"#;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let loader = ConfigLoader::new().with_env_vars(false);
        let config = loader.load(file.path()).unwrap();

        assert_eq!(config.dispatch.unknown_read_type, UnknownReadTypePolicy::Strict);
        assert_eq!(config.dispatch.max_events, 250);
        assert_eq!(config.namespaces, ["urn:example:plant", "urn:example:line2"]);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);

        let fixture = config.server.fixture.unwrap();
        assert!(fixture.is_absolute() || fixture.starts_with(file.path().parent().unwrap()));
        assert!(fixture.ends_with("fixtures/plant.json"));
    }

    #[test]
    fn test_load_toml_str() {
        let toml = r#"
namespaces = ["urn:a"]

[dispatch]
max_events = 10
"#;
        let config = ConfigLoader::new()
            .with_env_vars(false)
            .load_from_str(toml, ConfigFormat::Toml)
            .unwrap();
        assert_eq!(config.dispatch.max_events, 10);
        assert_eq!(config.dispatch.unknown_read_type, UnknownReadTypePolicy::Permissive);
    }

    #[test]
    fn test_load_json_str() {
        let json = r#"{"namespaces": ["urn:a", "urn:b"], "logging": {"level": "warn"}}"#;
        let config = ConfigLoader::new()
            .with_env_vars(false)
            .load_from_str(json, ConfigFormat::Json)
            .unwrap();
        assert_eq!(config.namespace_table().len(), 3);
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ConfigLoader::new()
            .with_env_vars(false)
            .load_from_str(r#"{"dispatch": {"retries": 3}}"#, ConfigFormat::Json)
            .unwrap_err();
        assert_eq!(err.error_type(), "serialization");
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let err = ConfigLoader::new()
            .with_env_vars(false)
            .load_from_str(r#"{"namespaces": ["urn:a", "urn:a"]}"#, ConfigFormat::Json)
            .unwrap_err();
        assert_eq!(err.error_type(), "validation");
    }

    #[test]
    fn test_parse_error_carries_path() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        file.write_all(b"{ not json").unwrap();

        let err = ConfigLoader::new().with_env_vars(false).load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_placeholder_default() {
        let env = vars(&[("UAQ_TEST_NS", "urn:from-env")]);
        let lookup = |name: &str| env.get(name).cloned();

        let content = "a: ${UAQ_TEST_NS}\nb: ${UAQ_TEST_MISSING:urn:fallback}\nc: ${UAQ_TEST_MISSING}";
        let resolved = resolve_placeholders(content, lookup);

        assert_eq!(
            resolved,
            "a: urn:from-env\nb: urn:fallback\nc: ${UAQ_TEST_MISSING}"
        );
    }

    #[test]
    fn test_placeholder_unterminated_kept() {
        let resolved = resolve_placeholders("value: ${OPEN", |_| None);
        assert_eq!(resolved, "value: ${OPEN");
    }

    #[test]
    fn test_env_overrides() {
        let env = vars(&[
            ("UAQ_UNKNOWN_READ_TYPE", "Strict"),
            ("UAQ_MAX_EVENTS", "42"),
            ("UAQ_NAMESPACES", "urn:x, urn:y,"),
            ("UAQ_LOG_LEVEL", "trace"),
            ("UAQ_LOG_FORMAT", "compact"),
        ]);
        let mut config = UaqConfig::default();
        ConfigLoader::new()
            .apply_env_overrides(&mut config, |name| env.get(name).cloned())
            .unwrap();

        assert_eq!(config.dispatch.unknown_read_type, UnknownReadTypePolicy::Strict);
        assert_eq!(config.dispatch.max_events, 42);
        assert_eq!(config.namespaces, ["urn:x", "urn:y"]);
        assert_eq!(config.logging.level, LogLevel::Trace);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_env_override_invalid_number() {
        let env = vars(&[("APP_MAX_EVENTS", "lots")]);
        let mut config = UaqConfig::default();
        let err = ConfigLoader::builder()
            .env_prefix("APP")
            .build()
            .apply_env_overrides(&mut config, |name| env.get(name).cloned())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { ref name, .. } if name == "APP_MAX_EVENTS"));
    }

    #[test]
    fn test_file_not_found() {
        let err = ConfigLoader::new().load("/nonexistent/uaq.yaml").unwrap_err();
        assert!(err.is_io_error());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.YML")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")).unwrap(), ConfigFormat::Toml);
        assert!(ConfigFormat::from_path(Path::new("a.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("uaq")).is_err());
    }

    #[test]
    fn test_builder() {
        let loader = ConfigLoader::builder()
            .base_path("/etc/uaq")
            .resolve_env_vars(false)
            .build();
        let config = loader
            .load_from_str(r#"{"server": {"fixture": "plant.json"}}"#, ConfigFormat::Json)
            .unwrap();
        assert_eq!(
            config.server.fixture.unwrap(),
            PathBuf::from("/etc/uaq/plant.json")
        );
    }
}
