// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Connection backed by a [`MemoryServer`].
//!
//! Subscriptions are answered from the server's current state: the data
//! value subscription returns current values and the event subscription
//! returns the events raised inside the query's time range.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use uaq_opcua::{
    DataValue, EventFilter, EventResults, MemoryServer, NodeId, OpcUaResult, OpcUaSession,
    ReadEventDetails, StatusError,
};

use crate::connection::{Connection, DataValueSubscription, EventSubscription};
use crate::query::{OpcUaQuery, QueryResult};

/// Connection over an in-memory server.
#[derive(Debug, Clone)]
pub struct MemoryConnection {
    server: Arc<MemoryServer>,
}

impl MemoryConnection {
    /// Creates a connection to `server`.
    pub fn new(server: Arc<MemoryServer>) -> Self {
        Self { server }
    }

    /// Returns the backing server.
    pub fn server(&self) -> &Arc<MemoryServer> {
        &self.server
    }
}

impl Connection for MemoryConnection {
    fn session(&self) -> &dyn OpcUaSession {
        self.server.as_ref()
    }

    fn data_value_subscription(&self) -> &dyn DataValueSubscription {
        self
    }

    fn event_subscription(&self) -> &dyn EventSubscription {
        self
    }
}

#[async_trait]
impl DataValueSubscription for MemoryConnection {
    async fn get_values(&self, node_ids: &[NodeId]) -> OpcUaResult<Vec<QueryResult<DataValue>>> {
        let values = self.server.read_values(node_ids).await?;
        Ok(values
            .into_iter()
            .zip(node_ids)
            .map(|(value, node_id)| {
                if value.is_bad() {
                    Err(StatusError::new(
                        value.status,
                        format!("No subscribed value for node {}", node_id),
                    ))
                } else {
                    Ok(value)
                }
            })
            .collect())
    }
}

#[async_trait]
impl EventSubscription for MemoryConnection {
    async fn get_event_data(
        &self,
        query: &OpcUaQuery,
        node_id: &NodeId,
        filter: &EventFilter,
    ) -> QueryResult<EventResults> {
        let details = ReadEventDetails {
            start: query.time_range.start().map_err(StatusError::from)?,
            end: query.time_range.end().map_err(StatusError::from)?,
            max_events: 0,
        };
        trace!(ref_id = %query.ref_id, node_id = %node_id, "Collecting subscribed events");

        let mut results = self
            .server
            .read_events(&details, filter, std::slice::from_ref(node_id))
            .await
            .map_err(StatusError::from)?;
        results
            .pop()
            .ok_or_else(|| StatusError::new(uaq_opcua::StatusCode::BAD_NO_DATA, "No event data"))
    }
}

// =============================================================================
// Tests
// =============================================================================
