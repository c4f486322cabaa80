// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Query translation for UAQ.
//!
//! Takes batches of transport-neutral queries and answers them through an
//! OPC UA session, one result per `refId`.
//!
//! # Architecture
//!
//! ```text
//! QueryDataRequest
//!       │
//!       ▼
//! ┌───────────────────┐   partition by readType   ┌──────────────────────┐
//! │  QueryDispatcher  │──────────────────────────▶│  handlers            │
//! │  (dispatch)       │                           │  read_nodes          │
//! └─────────┬─────────┘                           │  read_history_raw    │──▶ grouping
//!           │                                     │  read_events         │──▶ event_filter
//!           │ ConnectionProvider                  └──────────┬───────────┘
//!           ▼                                                │
//! ┌───────────────────┐                                      ▼
//! │  Connection       │◀──────────── session / subscriptions calls
//! └───────────────────┘
//!           │
//!           ▼
//! QueryDataResponse (refId -> DataResponse | StatusError)
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use uaq_opcua::{MemoryServer, NamespaceTable, NodeId, OpcUaValue, QualifiedName};
//! use uaq_query::{
//!     MemoryConnection, OpcUaQuery, PluginContext, QueryDataRequest, QueryDispatcher,
//!     SingleConnectionProvider,
//! };
//!
//! # tokio_test_block(async {
//! let server = MemoryServer::new(NamespaceTable::from_uris(["urn:plant"]));
//! server.add_variable(NodeId::string(1, "Speed"), QualifiedName::new(1, "Speed"), OpcUaValue::Double(1450.0));
//!
//! let connection = Arc::new(MemoryConnection::new(Arc::new(server)));
//! let dispatcher = QueryDispatcher::new(Arc::new(SingleConnectionProvider::new(connection)));
//!
//! let request = QueryDataRequest::new(
//!     PluginContext::for_data_source("plant"),
//!     vec![OpcUaQuery::new("A", "ReadNode", r#"{"id":"s=Speed","namespaceUrl":"urn:plant"}"#)],
//! );
//! let response = dispatcher.query_data(&request).await;
//! assert!(response.get("A").unwrap().is_ok());
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod connection;
pub mod dispatch;
pub mod event_filter;
pub mod grouping;
pub mod handlers;
pub mod memory;
pub mod plan;
pub mod query;
pub mod response;

// Re-export commonly used types
pub use query::{
    ElementOp, EventColumn, EventFilterClause, EventQuery, FilterOperandSpec, LiteralOp,
    NodeDefinition, OpcUaQuery, OperandTag, PluginContext, QueryDataRequest, QueryResult,
    ReadType, SimpleAttributeOp, TimeRange,
};

pub use event_filter::{compile_event_filter, compile_operand};

pub use grouping::{
    GroupPlan, QueryGroup, QueryGroups, ResultSlots, plan_groups, plan_processed_reads,
    plan_raw_reads, processed_read_key, raw_read_key,
};

pub use response::{DataResponse, Field, FieldType, Frame, QueryDataResponse};

pub use connection::{
    Connection, ConnectionProvider, DataValueSubscription, EventSubscription,
    SingleConnectionProvider,
};

pub use dispatch::{
    DispatchOptions, Partition, QueryDispatcher, UnknownReadTypePolicy, partition_queries,
    run_partition,
};

pub use handlers::PartitionResults;
pub use memory::MemoryConnection;
pub use plan::{GroupSummary, PartitionPlan, RejectedQuery, RequestPlan, plan_request};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
