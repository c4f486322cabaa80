// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema.
//!
//! ```yaml
//! dispatch:
//!   unknown_read_type: permissive   # or strict
//!   max_events: 10000
//!
//! namespaces:
//!   - urn:example:plant
//!   - urn:example:line2
//!
//! server:
//!   fixture: fixtures/plant.json
//!
//! logging:
//!   level: info
//!   format: text
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use uaq_opcua::{NamespaceTable, OPC_UA_NAMESPACE_URI};
use uaq_query::{DispatchOptions, UnknownReadTypePolicy};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Root Configuration
// =============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UaqConfig {
    /// Dispatcher behavior.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Namespace URIs from index 1 on, used by offline tooling.
    #[serde(default)]
    pub namespaces: Vec<String>,

    /// Offline server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl UaqConfig {
    /// Validates the whole configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.dispatch.validate()?;

        let mut seen = HashSet::new();
        for (index, uri) in self.namespaces.iter().enumerate() {
            let field = format!("namespaces[{}]", index);
            if uri.trim().is_empty() {
                return Err(ConfigError::validation(field, "cannot be empty"));
            }
            if uri == OPC_UA_NAMESPACE_URI {
                return Err(ConfigError::validation(
                    field,
                    "the standard namespace is always index 0 and must not be listed",
                ));
            }
            if !seen.insert(uri.as_str()) {
                return Err(ConfigError::validation(
                    field,
                    format!("duplicate namespace URI '{}'", uri),
                ));
            }
        }

        self.server.validate()?;
        Ok(())
    }

    /// Returns the dispatcher options.
    pub fn dispatch_options(&self) -> DispatchOptions {
        self.dispatch.to_options()
    }

    /// Returns the namespace table built from `namespaces`.
    pub fn namespace_table(&self) -> NamespaceTable {
        NamespaceTable::from_uris(self.namespaces.iter().cloned())
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Dispatcher configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Handling of read types without a handler.
    #[serde(default)]
    pub unknown_read_type: UnknownReadTypePolicy,

    /// Event limit per `ReadEvents` query.
    #[serde(default = "default_max_events")]
    pub max_events: u32,
}

fn default_max_events() -> u32 {
    u32::MAX
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            unknown_read_type: UnknownReadTypePolicy::default(),
            max_events: default_max_events(),
        }
    }
}

impl DispatchConfig {
    /// Validates the dispatch configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_events == 0 {
            return Err(ConfigError::out_of_range(
                "dispatch.max_events",
                self.max_events,
                1,
                u32::MAX,
            ));
        }
        Ok(())
    }

    /// Converts to dispatcher options.
    pub fn to_options(&self) -> DispatchOptions {
        DispatchOptions::new()
            .with_unknown_read_type(self.unknown_read_type)
            .with_max_events(self.max_events)
    }
}

// =============================================================================
// Server
// =============================================================================

/// Offline server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Fixture document loaded into the in-memory server.
    #[serde(default)]
    pub fixture: Option<PathBuf>,
}

impl ServerConfig {
    /// Validates the server configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(fixture) = &self.fixture {
            if fixture.as_os_str().is_empty() {
                return Err(ConfigError::validation("server.fixture", "cannot be empty"));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warn level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the level name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(ConfigError::validation(
                "logging.level",
                format!("unknown log level '{}'", other),
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-field lines.
    #[default]
    #[serde(alias = "pretty")]
    Text,
    /// Condensed single lines.
    Compact,
    /// JSON lines.
    Json,
}

impl LogFormat {
    /// Returns the format name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Compact => "compact",
            Self::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::validation(
                "logging.format",
                format!("unknown log format '{}'", other),
            )),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use uaq_opcua::NamespaceResolver;

    #[test]
    fn test_defaults() {
        let config = UaqConfig::default();
        assert_eq!(config.dispatch.max_events, u32::MAX);
        assert_eq!(config.dispatch.unknown_read_type, UnknownReadTypePolicy::Permissive);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_namespace_rejected() {
        let config = UaqConfig {
            namespaces: vec!["urn:a".into(), "urn:b".into(), "urn:a".into()],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("namespaces[2]"));
    }

    #[test]
    fn test_standard_namespace_rejected() {
        let config = UaqConfig {
            namespaces: vec![OPC_UA_NAMESPACE_URI.into()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_max_events_rejected() {
        let mut config = UaqConfig::default();
        config.dispatch.max_events = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_namespace_table_indices() {
        let config = UaqConfig {
            namespaces: vec!["urn:a".into(), "urn:b".into()],
            ..Default::default()
        };
        let table = config.namespace_table();
        assert_eq!(table.len(), 3);
        assert_eq!(table.index_of("urn:b"), Some(2));
    }

    #[test]
    fn test_dispatch_options() {
        let mut config = UaqConfig::default();
        config.dispatch.unknown_read_type = UnknownReadTypePolicy::Strict;
        config.dispatch.max_events = 500;
        let options = config.dispatch_options();
        assert_eq!(options.unknown_read_type, UnknownReadTypePolicy::Strict);
        assert_eq!(options.max_events, 500);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("loud".parse::<LogLevel>().is_err());
    }
}
