// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uaq-bin
//!
//! Command-line front end for the UAQ query layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────────────┐
//! │   main.rs    │────▶│    cli.rs    │────▶│  commands::execute   │
//! └──────────────┘     └──────────────┘     └──────────┬───────────┘
//!                                                      │
//!                       ┌──────────────┬───────────────┼──────────────┐
//!                       ▼              ▼               ▼              ▼
//!                   uaq-config     logging       MemoryServer    QueryDispatcher
//!                   (uaq.yaml)   (tracing)      (fixture)       / plan_request
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Answer a request against a fixture server
//! uaq run request.json --fixture plant.json --pretty
//!
//! # Show partitions and batched calls without executing
//! uaq plan request.json
//!
//! # List the children of the Objects folder
//! uaq browse --fixture plant.json
//!
//! # Validate configuration
//! uaq -c /etc/uaq/uaq.yaml validate
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
