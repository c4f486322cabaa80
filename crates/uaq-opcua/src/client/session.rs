// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA session abstraction.
//!
//! The query layer never talks to the wire directly. Everything it needs
//! from a server goes through [`OpcUaSession`]: the namespace table plus
//! the four batched read services.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::browse::BrowseNode;
use crate::client::values::{DataValue, EventResults, HistoryValues};
use crate::error::{OpcUaError, OpcUaResult, OperationError};
use crate::filter::EventFilter;
use crate::namespace::NamespaceTable;
use crate::types::NodeId;

// =============================================================================
// Read Details
// =============================================================================

/// Parameters of a raw history read.
///
/// Reads with equal details can share one service call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReadRawDetails {
    /// Start of the time range.
    pub start: DateTime<Utc>,
    /// End of the time range.
    pub end: DateTime<Utc>,
    /// Maximum values per node; 0 means no limit.
    pub max_values: u32,
}

/// Parameters of a processed (aggregated) history read.
///
/// Reads with equal details can share one service call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReadProcessedDetails {
    /// Start of the time range.
    pub start: DateTime<Utc>,
    /// End of the time range.
    pub end: DateTime<Utc>,
    /// Aggregate function node.
    pub aggregate: NodeId,
    /// Processing interval; zero means one interval over the whole range.
    pub interval: Duration,
}

/// Parameters of an event history read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReadEventDetails {
    /// Start of the time range.
    pub start: DateTime<Utc>,
    /// End of the time range.
    pub end: DateTime<Utc>,
    /// Maximum events per node; 0 means no limit.
    pub max_events: u32,
}

// =============================================================================
// OpcUaSession
// =============================================================================

/// An active OPC UA session.
///
/// Batched calls return exactly one result per requested node, in request
/// order. Per-node failures are reported through each result's status; an
/// `Err` means the whole call failed.
#[async_trait]
pub trait OpcUaSession: Send + Sync {
    /// Returns the session's namespace table.
    fn namespace_table(&self) -> &NamespaceTable;

    /// Reads the current values of `node_ids`.
    async fn read_values(&self, node_ids: &[NodeId]) -> OpcUaResult<Vec<DataValue>>;

    /// Reads raw history of `node_ids`.
    async fn read_history_raw(
        &self,
        details: &ReadRawDetails,
        node_ids: &[NodeId],
    ) -> OpcUaResult<Vec<HistoryValues>>;

    /// Reads aggregated history of `node_ids`.
    async fn read_history_processed(
        &self,
        details: &ReadProcessedDetails,
        node_ids: &[NodeId],
    ) -> OpcUaResult<Vec<HistoryValues>>;

    /// Reads event history of the notifiers `node_ids`.
    async fn read_events(
        &self,
        details: &ReadEventDetails,
        filter: &EventFilter,
        node_ids: &[NodeId],
    ) -> OpcUaResult<Vec<EventResults>>;

    /// Lists the forward hierarchical references of `node_id`.
    async fn browse(&self, node_id: &NodeId) -> OpcUaResult<Vec<BrowseNode>> {
        let _ = node_id;
        Err(OpcUaError::operation(OperationError::not_supported("Browse")))
    }
}
