// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uaq-config
//!
//! Configuration for the UAQ query layer and its command line tool.
//!
//! ## Features
//!
//! - **Schema**: dispatcher policy, namespace table, offline server, logging
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Environment Overrides**: `UAQ_*` variables and `${VAR:default}` placeholders
//! - **Validation**: duplicate namespaces, empty values, out of range limits
//!
//! ## Quick Start
//!
//! ```
//! use uaq_config::{ConfigFormat, ConfigLoader};
//!
//! let yaml = r#"
//! dispatch:
//!   unknown_read_type: strict
//! namespaces:
//!   - urn:example:plant
//! "#;
//!
//! let config = ConfigLoader::new()
//!     .with_env_vars(false)
//!     .load_from_str(yaml, ConfigFormat::Yaml)
//!     .unwrap();
//!
//! assert_eq!(config.namespace_table().len(), 2);
//! ```
//!
//! ## Environment Variables
//!
//! ```text
//! UAQ_UNKNOWN_READ_TYPE=strict
//! UAQ_MAX_EVENTS=5000
//! UAQ_LOG_LEVEL=debug
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod error;
pub mod loader;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigFormat, ConfigLoader, ConfigLoaderBuilder, load_config, load_config_str};
pub use schema::{DispatchConfig, LogFormat, LogLevel, LoggingConfig, ServerConfig, UaqConfig};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
