// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Connection collaborators.
//!
//! A [`Connection`] bundles what the dispatcher needs from one data source:
//!
//! ```text
//! ConnectionProvider::get(context)
//!         │
//!         ▼
//! Connection
//! ├── session()                  -> OpcUaSession          (reads, history, events)
//! ├── data_value_subscription()  -> DataValueSubscription (latest values)
//! └── event_subscription()       -> EventSubscription     (latest events)
//! ```
//!
//! Pooling, reconnects and subscription delivery live behind these traits.

use std::sync::Arc;

use async_trait::async_trait;

use uaq_opcua::{DataValue, EventFilter, EventResults, NodeId, OpcUaResult, OpcUaSession};

use crate::query::{OpcUaQuery, PluginContext, QueryResult};

/// Latest values of monitored nodes.
#[async_trait]
pub trait DataValueSubscription: Send + Sync {
    /// Returns the latest value of each node, in request order.
    ///
    /// Per-node failures are reported in place; an `Err` means the whole
    /// lookup failed.
    async fn get_values(&self, node_ids: &[NodeId]) -> OpcUaResult<Vec<QueryResult<DataValue>>>;
}

/// Events delivered to event subscriptions.
#[async_trait]
pub trait EventSubscription: Send + Sync {
    /// Returns the events collected for `query` on the notifier `node_id`.
    async fn get_event_data(
        &self,
        query: &OpcUaQuery,
        node_id: &NodeId,
        filter: &EventFilter,
    ) -> QueryResult<EventResults>;
}

/// A live connection to one data source.
pub trait Connection: Send + Sync {
    /// Returns the session.
    fn session(&self) -> &dyn OpcUaSession;

    /// Returns the data value subscription.
    fn data_value_subscription(&self) -> &dyn DataValueSubscription;

    /// Returns the event subscription.
    fn event_subscription(&self) -> &dyn EventSubscription;
}

/// Hands out connections for request contexts.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Returns the connection for the data source named in `context`.
    async fn get(&self, context: &PluginContext) -> OpcUaResult<Arc<dyn Connection>>;
}

/// Provider that serves every context with the same connection.
#[derive(Clone)]
pub struct SingleConnectionProvider {
    connection: Arc<dyn Connection>,
}

impl SingleConnectionProvider {
    /// Creates a provider around `connection`.
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl ConnectionProvider for SingleConnectionProvider {
    async fn get(&self, _context: &PluginContext) -> OpcUaResult<Arc<dyn Connection>> {
        Ok(Arc::clone(&self.connection))
    }
}
