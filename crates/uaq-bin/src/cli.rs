// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `run`: Answer a query batch against a fixture server
//! - `plan`: Show how a query batch would be partitioned and batched
//! - `browse`: List the children of a node with portable ids
//! - `validate`: Validate the configuration file
//! - `version`: Show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// UAQ - OPC UA query translation layer
///
/// Answers batches of namespace-portable queries through an OPC UA session.
#[derive(Parser, Debug)]
#[command(
    name = "uaq",
    author = "Sylvex <contact@sylvex.io>",
    version = uaq_query::VERSION,
    about = "OPC UA query translation layer",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    ///
    /// When omitted, `uaq.yaml` in the working directory is used if present,
    /// otherwise built-in defaults apply.
    #[arg(short, long, env = "UAQ_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json, compact); overrides the config file
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the UAQ CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Answer a query batch against an in-memory server
    ///
    /// Loads the fixture server, dispatches the request and prints the
    /// per-refId response as JSON.
    Run(RunArgs),

    /// Show the dispatch plan of a query batch
    ///
    /// Prints partitions, batched calls and queries that would be rejected
    /// before reaching the server. Nothing is executed.
    Plan(PlanArgs),

    /// List the children of a node
    ///
    /// Node ids and browse names are printed in namespace-portable form.
    Browse(BrowseArgs),

    /// Validate the configuration file
    Validate(ValidateArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `run` command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Request JSON file (`-` reads stdin)
    pub request: PathBuf,

    /// Fixture document; overrides `server.fixture`
    #[arg(short, long)]
    pub fixture: Option<PathBuf>,

    /// Pretty-print the response
    #[arg(short, long)]
    pub pretty: bool,
}

/// Arguments for the `plan` command.
#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Request JSON file (`-` reads stdin)
    pub request: PathBuf,

    /// Fixture document whose namespace table is used instead of `namespaces`
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `browse` command.
#[derive(Args, Debug, Clone)]
pub struct BrowseArgs {
    /// Node to browse, native or portable form
    #[arg(default_value = "i=85")]
    pub node: String,

    /// Fixture document; overrides `server.fixture`
    #[arg(short, long)]
    pub fixture: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<uaq_config::LogFormat> for LogFormat {
    fn from(format: uaq_config::LogFormat) -> Self {
        match format {
            uaq_config::LogFormat::Text => Self::Text,
            uaq_config::LogFormat::Json => Self::Json,
            uaq_config::LogFormat::Compact => Self::Compact,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Check if verbose logging is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose && !self.quiet
    }

    /// Get the effective log level, falling back to `configured`.
    pub fn effective_log_level<'a>(&'a self, configured: &'a str) -> &'a str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            self.log_level.as_deref().unwrap_or(configured)
        }
    }

    /// Get the effective log format, falling back to `configured`.
    pub fn effective_log_format(&self, configured: uaq_config::LogFormat) -> LogFormat {
        self.log_format.unwrap_or_else(|| configured.into())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_command() {
        let cli = Cli::parse_from(["uaq", "run", "request.json", "-f", "plant.json", "-p"]);
        if let Commands::Run(args) = cli.command {
            assert_eq!(args.request, PathBuf::from("request.json"));
            assert_eq!(args.fixture, Some(PathBuf::from("plant.json")));
            assert!(args.pretty);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_plan_command() {
        let cli = Cli::parse_from(["uaq", "plan", "-", "--format", "json"]);
        if let Commands::Plan(args) = cli.command {
            assert_eq!(args.request, PathBuf::from("-"));
            assert_eq!(args.format, OutputFormat::Json);
        } else {
            panic!("Expected Plan command");
        }
    }

    #[test]
    fn test_browse_defaults_to_objects_folder() {
        let cli = Cli::parse_from(["uaq", "browse"]);
        if let Commands::Browse(args) = cli.command {
            assert_eq!(args.node, "i=85");
        } else {
            panic!("Expected Browse command");
        }
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["uaq", "validate", "--show-config"]);
        if let Commands::Validate(args) = cli.command {
            assert!(args.show_config);
        } else {
            panic!("Expected Validate command");
        }
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["uaq", "-c", "/etc/uaq/uaq.yaml", "version"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/uaq/uaq.yaml")));
    }

    #[test]
    fn test_log_level_fallback() {
        let cli = Cli::parse_from(["uaq", "version"]);
        assert_eq!(cli.effective_log_level("error"), "error");

        let cli = Cli::parse_from(["uaq", "-l", "debug", "version"]);
        assert_eq!(cli.effective_log_level("error"), "debug");
    }

    #[test]
    fn test_quiet_and_verbose() {
        let cli = Cli::parse_from(["uaq", "-q", "version"]);
        assert_eq!(cli.effective_log_level("trace"), "warn");

        let cli = Cli::parse_from(["uaq", "-v", "version"]);
        assert!(cli.is_verbose());
        assert_eq!(cli.effective_log_level("info"), "debug");
    }

    #[test]
    fn test_log_format_fallback() {
        let cli = Cli::parse_from(["uaq", "version"]);
        assert_eq!(cli.effective_log_format(uaq_config::LogFormat::Json), LogFormat::Json);

        let cli = Cli::parse_from(["uaq", "--log-format", "compact", "version"]);
        assert_eq!(cli.effective_log_format(uaq_config::LogFormat::Json), LogFormat::Compact);
    }
}
