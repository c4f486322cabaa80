// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA client-side abstractions.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     OpcUaSession (trait)                        │
//! │     namespace table · read · history raw/processed · events     │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//!      real server session              MemoryServer
//!      (provided by the host)       (fixtures, tests, offline CLI)
//! ```

mod memory;
mod session;
mod values;

pub use memory::{
    Aggregate, EventFixture, MemoryEvent, MemoryServer, NodeFixture, SampleFixture, ServerFixture,
};
pub use session::{OpcUaSession, ReadEventDetails, ReadProcessedDetails, ReadRawDetails};
pub use values::{DataValue, EventFields, EventResults, HistoryValues, OpcUaValue};
