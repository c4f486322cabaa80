// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use uaq_config::UaqConfig;
use uaq_query::UnknownReadTypePolicy;

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::commands::{DEFAULT_CONFIG_FILE, read_fixture};
use crate::error::BinResult;

/// Executes the `validate` command.
///
/// The configuration has already been loaded and validated by the time this
/// runs; this reports the result and checks the fixture file.
pub fn validate(cli: &Cli, config: &UaqConfig, args: ValidateArgs) -> BinResult<()> {
    let source = cli
        .config
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| format!("{} (or defaults)", DEFAULT_CONFIG_FILE));

    let warnings = collect_warnings(config);

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", source);
            println!();
            println!("Summary:");
            println!("  Unknown read types: {}", config.dispatch.unknown_read_type);
            println!("  Max events:         {}", config.dispatch.max_events);
            println!("  Namespaces:         {}", config.namespaces.len());
            println!(
                "  Fixture:            {}",
                config
                    .server
                    .fixture
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(none)".to_string())
            );
            println!(
                "  Logging:            {} / {}",
                config.logging.level, config.logging.format
            );

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!(
                    "{}",
                    serde_json::to_string_pretty(config)
                        .unwrap_or_else(|_| "(serialization error)".to_string())
                );
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": source,
                "summary": {
                    "unknown_read_type": config.dispatch.unknown_read_type.as_str(),
                    "max_events": config.dispatch.max_events,
                    "namespace_count": config.namespaces.len(),
                    "fixture": config.server.fixture,
                },
                "warnings": warnings,
                "config": if args.show_config { Some(config) } else { None },
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output)
                    .unwrap_or_else(|_| "(serialization error)".to_string())
            );
        }
    }

    Ok(())
}

/// Returns non-fatal findings about `config`.
pub fn collect_warnings(config: &UaqConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    match &config.server.fixture {
        Some(path) if !path.exists() => {
            warnings.push(format!("Fixture file does not exist: {}", path.display()));
        }
        Some(path) => match read_fixture(path) {
            Ok(fixture) => {
                for uri in &config.namespaces {
                    if !fixture.namespaces.contains(uri) {
                        warnings.push(format!("Namespace '{}' is not served by the fixture", uri));
                    }
                }
            }
            Err(e) => warnings.push(e.to_string()),
        },
        None => {}
    }

    if config.dispatch.unknown_read_type == UnknownReadTypePolicy::Permissive {
        warnings.push(
            "Queries with unknown read types are skipped without a response entry".to_string(),
        );
    }

    warnings
}
