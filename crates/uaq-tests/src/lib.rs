// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # UAQ Integration Tests
//!
//! Test utilities and integration tests for the UAQ query layer.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: A small plant address space with history and events
//!   - `builders`: Builders for queries, event queries and requests
//!   - `mocks`: Recording session, subscriptions and connection provider
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p uaq-tests
//! cargo test -p uaq-tests --test integration_dispatch
//! cargo test -p uaq-tests --test integration_codec
//! cargo test -p uaq-tests --test integration_config
//! ```
//!
//! ## Test Categories
//!
//! ### Codec Tests (`integration_codec.rs`)
//! - Portable node ids across sessions with different namespace tables
//! - Browse paths and browse entries
//! - Event filter compilation against a live namespace table
//!
//! ### Dispatch Tests (`integration_dispatch.rs`)
//! - Grouping: call counts per batch
//! - Partition failure isolation
//! - Unknown read types under both policies
//! - Reordering invariance
//!
//! ### Config Tests (`integration_config.rs`)
//! - Loading YAML, TOML and JSON files
//! - Dispatcher options and namespace tables from configuration
//!
//! ## Writing New Tests
//!
//! ```rust,ignore
//! use uaq_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let session = MockSession::new(PlantFixture::server());
//!     let query = QueryBuilder::raw("A", PlantFixture::pump_speed()).build();
//!     // ... test logic
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::builders::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::mocks::*;
    pub use crate::common::{init_test_logging, temp_test_dir};
}
