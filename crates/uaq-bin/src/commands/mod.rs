// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `run`: Answer a query batch against a fixture server
//! - `plan`: Show the dispatch plan of a query batch
//! - `browse`: List the children of a node
//! - `validate`: Validate configuration file
//! - `version`: Show version information

mod browse;
mod plan;
mod run;
mod validate;
mod version;

pub use browse::browse;
pub use plan::{plan, render_plan};
pub use run::run;
pub use validate::validate;
pub use version::version;

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use tracing::{debug, warn};

use uaq_config::{ConfigFormat, ConfigLoader, UaqConfig};
use uaq_opcua::{MemoryServer, NamespaceTable, ServerFixture};
use uaq_query::QueryDataRequest;

use crate::cli::{Cli, Commands};
use crate::error::{BinError, BinResult};
use crate::logging::init_logging;

/// Configuration file picked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "uaq.yaml";

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli) -> BinResult<()> {
    if let Commands::Version = cli.command {
        init_logging(cli.effective_log_level("warn"), cli.effective_log_format(Default::default()));
        return version::version(&cli);
    }

    let config = load_settings(&cli)?;
    init_logging(
        cli.effective_log_level(config.logging.level.as_str()),
        cli.effective_log_format(config.logging.format),
    );

    match cli.command.clone() {
        Commands::Run(args) => run::run(&cli, &config, args).await,
        Commands::Plan(args) => plan::plan(&cli, &config, args),
        Commands::Browse(args) => browse::browse(&cli, &config, args).await,
        Commands::Validate(args) => validate::validate(&cli, &config, args),
        Commands::Version => version::version(&cli),
    }
}

/// Loads the configuration named on the command line.
///
/// Without `--config`, `uaq.yaml` is used when present; otherwise defaults
/// plus `UAQ_*` overrides apply.
pub fn load_settings(cli: &Cli) -> BinResult<UaqConfig> {
    match &cli.config {
        Some(path) => uaq_config::load_config(path)
            .map_err(|e| BinError::from(e).with_context(format!("loading {}", path.display()))),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            Ok(uaq_config::load_config(DEFAULT_CONFIG_FILE)?)
        }
        None => Ok(ConfigLoader::new().load_from_str("{}", ConfigFormat::Json)?),
    }
}

/// Reads a request document; `-` reads stdin.
pub fn read_request(path: &Path) -> BinResult<QueryDataRequest> {
    let text = read_input(path)?;
    let request = QueryDataRequest::from_json(&text)
        .map_err(|e| BinError::request(format!("{}: {}", path.display(), e)))?;
    debug!(queries = request.queries.len(), "Request loaded");
    Ok(request)
}

/// Reads and parses a fixture document.
pub fn read_fixture(path: &Path) -> BinResult<ServerFixture> {
    let text = read_input(path)?;
    serde_json::from_str(&text)
        .map_err(|e| BinError::config(format!("invalid fixture {}: {}", path.display(), e)))
}

/// Builds the in-memory server from `fixture` or the configured fixture.
///
/// Without any fixture an empty server over the configured namespaces is
/// returned.
pub fn load_server(fixture: Option<&Path>, config: &UaqConfig) -> BinResult<MemoryServer> {
    match fixture.or(config.server.fixture.as_deref()) {
        Some(path) => {
            let server = MemoryServer::from_fixture(read_fixture(path)?)?;
            debug!(fixture = %path.display(), "Fixture server loaded");
            Ok(server)
        }
        None => {
            warn!("No fixture configured, serving an empty address space");
            Ok(MemoryServer::new(config.namespace_table()))
        }
    }
}

/// Returns the namespace table of `fixture` or the configured fixture,
/// falling back to the configured namespaces.
pub fn namespace_table(fixture: Option<&Path>, config: &UaqConfig) -> BinResult<NamespaceTable> {
    match fixture.or(config.server.fixture.as_deref()) {
        Some(path) => Ok(NamespaceTable::from_uris(read_fixture(path)?.namespaces)),
        None => Ok(config.namespace_table()),
    }
}

fn read_input(path: &Path) -> BinResult<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| BinError::io(format!("Failed to read from stdin: {}", e)))?;
        return Ok(text);
    }
    fs::read_to_string(path)
        .map_err(|e| BinError::io(format!("Failed to read {}: {}", path.display(), e)))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use uaq_opcua::NamespaceResolver;

    fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(suffix).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_request() {
        let file = temp_file(
            ".json",
            r#"{"queries": [{"refId": "A", "readType": "ReadNode", "nodeId": "i=2258"}]}"#,
        );
        let request = read_request(file.path()).unwrap();
        assert_eq!(request.queries.len(), 1);
        assert_eq!(request.queries[0].ref_id, "A");
    }

    #[test]
    fn test_read_request_invalid() {
        let file = temp_file(".json", "[1, 2, 3]");
        let err = read_request(file.path()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_namespace_table_from_fixture() {
        let file = temp_file(".json", r#"{"namespaces": ["urn:plant", "urn:line2"]}"#);
        let table = namespace_table(Some(file.path()), &UaqConfig::default()).unwrap();
        assert_eq!(table.index_of("urn:line2"), Some(2));
    }

    #[test]
    fn test_load_server_without_fixture() {
        let config = UaqConfig {
            namespaces: vec!["urn:plant".into()],
            ..Default::default()
        };
        let server = load_server(None, &config).unwrap();
        assert!(!server.contains(&uaq_opcua::NodeId::string(1, "Anything")));
    }
}
