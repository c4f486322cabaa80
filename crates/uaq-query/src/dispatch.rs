// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Query dispatch and result aggregation.
//!
//! # Request lifecycle
//!
//! ```text
//!  Received ──> acquire connection ──fail──> connection_error, return
//!      │
//!      ▼
//!  partition by readType (first-appearance order)
//!      │
//!      ├── known type ──> handler ──Ok──> write each result under its refId
//!      │                      └───Err──> same error under every refId of the partition
//!      │
//!      └── unknown type ──> Permissive: skipped, nothing written
//!                           Strict:     BadNotSupported under every refId
//!      ▼
//!  Terminal: response returned
//! ```
//!
//! A partition failure never reaches a sibling partition. There is no retry
//! at this layer.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use uaq_opcua::{ConfigurationError, OpcUaError, OpcUaResult, OperationError, StatusError};

use crate::connection::{Connection, ConnectionProvider};
use crate::handlers::{self, PartitionResults};
use crate::query::{OpcUaQuery, QueryDataRequest, ReadType};
use crate::response::QueryDataResponse;

// =============================================================================
// Options
// =============================================================================

/// What to do with queries whose read type has no handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownReadTypePolicy {
    /// Skip them; no entry is written for their reference ids.
    #[default]
    Permissive,
    /// Answer each with a `BadNotSupported` error.
    Strict,
}

impl UnknownReadTypePolicy {
    /// Returns the policy name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Permissive => "permissive",
            Self::Strict => "strict",
        }
    }
}

impl FromStr for UnknownReadTypePolicy {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "permissive" => Ok(Self::Permissive),
            "strict" => Ok(Self::Strict),
            other => Err(OpcUaError::configuration(ConfigurationError::invalid_value(
                "unknown_read_type",
                format!("expected 'permissive' or 'strict', got '{}'", other),
            ))),
        }
    }
}

impl fmt::Display for UnknownReadTypePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Handling of unknown read types.
    pub unknown_read_type: UnknownReadTypePolicy,

    /// Event limit per `ReadEvents` query.
    pub max_events: u32,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            unknown_read_type: UnknownReadTypePolicy::Permissive,
            max_events: u32::MAX,
        }
    }
}

impl DispatchOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the unknown read type policy.
    pub fn with_unknown_read_type(mut self, policy: UnknownReadTypePolicy) -> Self {
        self.unknown_read_type = policy;
        self
    }

    /// Sets the event limit.
    pub fn with_max_events(mut self, max_events: u32) -> Self {
        self.max_events = max_events;
        self
    }
}

// =============================================================================
// Partitioning
// =============================================================================

/// Queries of one request that share a read type name.
#[derive(Debug, Clone)]
pub struct Partition<'a> {
    /// Read type name as sent.
    pub read_type: &'a str,

    /// Member queries in request order.
    pub queries: Vec<&'a OpcUaQuery>,
}

impl Partition<'_> {
    /// Returns the read type, if it has a handler.
    pub fn kind(&self) -> Option<ReadType> {
        ReadType::from_name(self.read_type)
    }
}

/// Splits queries by read type name, in first-appearance order.
pub fn partition_queries(queries: &[OpcUaQuery]) -> Vec<Partition<'_>> {
    let mut partitions: Vec<Partition<'_>> = Vec::new();
    for query in queries {
        match partitions
            .iter_mut()
            .find(|p| p.read_type == query.read_type)
        {
            Some(partition) => partition.queries.push(query),
            None => partitions.push(Partition {
                read_type: &query.read_type,
                queries: vec![query],
            }),
        }
    }
    partitions
}

// =============================================================================
// Isolation boundary
// =============================================================================

/// Runs one partition's handler and always returns one result per query.
///
/// A handler error, or a handler answering with the wrong number of
/// results, becomes the same error on every query of the partition.
pub async fn run_partition(
    connection: &dyn Connection,
    read_type: ReadType,
    queries: &[&OpcUaQuery],
    options: &DispatchOptions,
) -> PartitionResults {
    let outcome = match execute_handler(connection, read_type, queries, options).await {
        Ok(results) if results.len() == queries.len() => Ok(results),
        Ok(results) => Err(OpcUaError::operation(OperationError::result_count_mismatch(
            read_type.as_str(),
            queries.len(),
            results.len(),
        ))),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(results) => results,
        Err(e) => {
            e.log(read_type.as_str());
            fan_out(queries.len(), e.to_status_error())
        }
    }
}

async fn execute_handler(
    connection: &dyn Connection,
    read_type: ReadType,
    queries: &[&OpcUaQuery],
    options: &DispatchOptions,
) -> OpcUaResult<PartitionResults> {
    let session = connection.session();
    match read_type {
        ReadType::ReadNode => handlers::read_nodes(session, queries).await,
        ReadType::Subscribe => {
            handlers::subscribe_data_values(
                connection.data_value_subscription(),
                session.namespace_table(),
                queries,
            )
            .await
        }
        ReadType::ReadDataRaw => handlers::read_history_raw(session, queries).await,
        ReadType::ReadDataProcessed => handlers::read_history_processed(session, queries).await,
        ReadType::ReadEvents => handlers::read_events(session, queries, options.max_events).await,
        ReadType::SubscribeEvents => {
            handlers::subscribe_events(
                connection.event_subscription(),
                session.namespace_table(),
                queries,
            )
            .await
        }
    }
}

fn fan_out(count: usize, error: StatusError) -> PartitionResults {
    (0..count).map(|_| Err(error.clone())).collect()
}

// =============================================================================
// QueryDispatcher
// =============================================================================

/// Entry point: turns a request into a response keyed by `refId`.
#[derive(Clone)]
pub struct QueryDispatcher {
    provider: Arc<dyn ConnectionProvider>,
    options: DispatchOptions,
}

impl QueryDispatcher {
    /// Creates a dispatcher with default options.
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Self {
            provider,
            options: DispatchOptions::default(),
        }
    }

    /// Sets the options.
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the options.
    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Answers a request.
    ///
    /// Never fails: connection failures are reported on the response and
    /// every other failure is attached to the queries it affects.
    #[instrument(skip(self, request), fields(data_source = %request.plugin_context.data_source, queries = request.queries.len()))]
    pub async fn query_data(&self, request: &QueryDataRequest) -> QueryDataResponse {
        let mut response = QueryDataResponse::new();

        let connection = match self.provider.get(&request.plugin_context).await {
            Ok(connection) => connection,
            Err(e) => {
                error!(error = %e, "Failed to acquire connection");
                response.connection_error = Some(e.to_status_error());
                return response;
            }
        };

        for partition in partition_queries(&request.queries) {
            let Some(read_type) = partition.kind() else {
                self.reject_unknown(&partition, &mut response);
                continue;
            };

            debug!(read_type = %read_type, count = partition.queries.len(), "Dispatching partition");
            let results =
                run_partition(connection.as_ref(), read_type, &partition.queries, &self.options)
                    .await;

            for (query, result) in partition.queries.iter().zip(results) {
                if let Err(e) = &result {
                    debug!(ref_id = %query.ref_id, status = %e.status, "Query failed");
                }
                response.insert(query.ref_id.clone(), result);
            }
        }

        info!(
            responses = response.len(),
            errors = response.error_count(),
            "Request completed"
        );
        response
    }

    fn reject_unknown(&self, partition: &Partition<'_>, response: &mut QueryDataResponse) {
        match self.options.unknown_read_type {
            UnknownReadTypePolicy::Permissive => {
                warn!(
                    read_type = partition.read_type,
                    count = partition.queries.len(),
                    "Skipping queries with unknown read type"
                );
            }
            UnknownReadTypePolicy::Strict => {
                let error = OpcUaError::configuration(ConfigurationError::unsupported_read_type(
                    partition.read_type,
                ))
                .to_status_error();
                for query in &partition.queries {
                    response.insert(query.ref_id.clone(), Err(error.clone()));
                }
            }
        }
    }
}

impl fmt::Debug for QueryDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryDispatcher")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
