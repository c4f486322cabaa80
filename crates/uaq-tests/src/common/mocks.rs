// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! Mock collaborators for testing the dispatcher in isolation.
//!
//! - [`MockSession`] forwards to a [`MemoryServer`], recording every call and
//!   failing chosen services on demand
//! - [`MockDataValueSubscription`] and [`MockEventSubscription`] serve
//!   canned subscription data
//! - [`MockConnectionProvider`] hands out one [`MockConnection`] or fails

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use uaq_opcua::{
    BrowseNode, ConnectionError, DataValue, EventFilter, EventResults, HistoryValues, MemoryServer,
    NamespaceTable, NodeId, OpcUaError, OpcUaResult, OpcUaSession, OperationError,
    ReadEventDetails, ReadProcessedDetails, ReadRawDetails, StatusCode, StatusError,
};
use uaq_query::{
    Connection, ConnectionProvider, DataValueSubscription, EventSubscription, OpcUaQuery,
    PluginContext, QueryResult,
};

// =============================================================================
// Mock Session
// =============================================================================

/// Session services a [`MockSession`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// `read_values`.
    Read,
    /// `read_history_raw`.
    HistoryReadRaw,
    /// `read_history_processed`.
    HistoryReadProcessed,
    /// `read_events`.
    HistoryReadEvents,
    /// `browse`.
    Browse,
}

/// A recorded session call.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCall {
    /// `read_values`.
    Read {
        /// Requested nodes.
        node_ids: Vec<NodeId>,
    },
    /// `read_history_raw`.
    HistoryReadRaw {
        /// Read details.
        details: ReadRawDetails,
        /// Requested nodes.
        node_ids: Vec<NodeId>,
    },
    /// `read_history_processed`.
    HistoryReadProcessed {
        /// Read details.
        details: ReadProcessedDetails,
        /// Requested nodes.
        node_ids: Vec<NodeId>,
    },
    /// `read_events`.
    HistoryReadEvents {
        /// Read details.
        details: ReadEventDetails,
        /// Compiled filter.
        filter: EventFilter,
        /// Requested notifiers.
        node_ids: Vec<NodeId>,
    },
    /// `browse`.
    Browse {
        /// Browsed node.
        node_id: NodeId,
    },
}

impl SessionCall {
    /// Returns the service of this call.
    pub fn service(&self) -> Service {
        match self {
            Self::Read { .. } => Service::Read,
            Self::HistoryReadRaw { .. } => Service::HistoryReadRaw,
            Self::HistoryReadProcessed { .. } => Service::HistoryReadProcessed,
            Self::HistoryReadEvents { .. } => Service::HistoryReadEvents,
            Self::Browse { .. } => Service::Browse,
        }
    }

    /// Returns the nodes of this call.
    pub fn node_ids(&self) -> Vec<NodeId> {
        match self {
            Self::Read { node_ids }
            | Self::HistoryReadRaw { node_ids, .. }
            | Self::HistoryReadProcessed { node_ids, .. }
            | Self::HistoryReadEvents { node_ids, .. } => node_ids.clone(),
            Self::Browse { node_id } => vec![node_id.clone()],
        }
    }
}

/// A recording session over a [`MemoryServer`].
#[derive(Debug)]
pub struct MockSession {
    server: Arc<MemoryServer>,
    calls: Mutex<Vec<SessionCall>>,
    failing: Mutex<HashSet<Service>>,
    truncate: Mutex<HashSet<Service>>,
}

impl MockSession {
    /// Creates a session over `server`.
    pub fn new(server: MemoryServer) -> Self {
        Self::shared(Arc::new(server))
    }

    /// Creates a session over a shared server.
    pub fn shared(server: Arc<MemoryServer>) -> Self {
        Self {
            server,
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            truncate: Mutex::new(HashSet::new()),
        }
    }

    /// Returns the underlying server.
    pub fn server(&self) -> &Arc<MemoryServer> {
        &self.server
    }

    /// Makes every call to `service` fail with a communication error.
    pub fn fail(&self, service: Service) {
        self.failing.lock().insert(service);
    }

    /// Makes `service` drop the last result of every batch.
    pub fn truncate_results(&self, service: Service) {
        self.truncate.lock().insert(service);
    }

    /// Clears injected failures.
    pub fn heal(&self) {
        self.failing.lock().clear();
        self.truncate.lock().clear();
    }

    /// Returns all recorded calls.
    pub fn calls(&self) -> Vec<SessionCall> {
        self.calls.lock().clone()
    }

    /// Returns the recorded calls of `service`.
    pub fn calls_to(&self, service: Service) -> Vec<SessionCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.service() == service)
            .cloned()
            .collect()
    }

    /// Returns the number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn record(&self, call: SessionCall) -> OpcUaResult<()> {
        let service = call.service();
        self.calls.lock().push(call);
        if self.failing.lock().contains(&service) {
            return Err(OpcUaError::operation(OperationError::read_failed(
                format!("{:?}", service),
                "injected failure",
            )));
        }
        Ok(())
    }

    fn shape<T>(&self, service: Service, mut results: Vec<T>) -> Vec<T> {
        if self.truncate.lock().contains(&service) {
            results.pop();
        }
        results
    }
}

#[async_trait]
impl OpcUaSession for MockSession {
    fn namespace_table(&self) -> &NamespaceTable {
        self.server.namespace_table()
    }

    async fn read_values(&self, node_ids: &[NodeId]) -> OpcUaResult<Vec<DataValue>> {
        self.record(SessionCall::Read {
            node_ids: node_ids.to_vec(),
        })?;
        let results = self.server.read_values(node_ids).await?;
        Ok(self.shape(Service::Read, results))
    }

    async fn read_history_raw(
        &self,
        details: &ReadRawDetails,
        node_ids: &[NodeId],
    ) -> OpcUaResult<Vec<HistoryValues>> {
        self.record(SessionCall::HistoryReadRaw {
            details: details.clone(),
            node_ids: node_ids.to_vec(),
        })?;
        let results = self.server.read_history_raw(details, node_ids).await?;
        Ok(self.shape(Service::HistoryReadRaw, results))
    }

    async fn read_history_processed(
        &self,
        details: &ReadProcessedDetails,
        node_ids: &[NodeId],
    ) -> OpcUaResult<Vec<HistoryValues>> {
        self.record(SessionCall::HistoryReadProcessed {
            details: details.clone(),
            node_ids: node_ids.to_vec(),
        })?;
        let results = self.server.read_history_processed(details, node_ids).await?;
        Ok(self.shape(Service::HistoryReadProcessed, results))
    }

    async fn read_events(
        &self,
        details: &ReadEventDetails,
        filter: &EventFilter,
        node_ids: &[NodeId],
    ) -> OpcUaResult<Vec<EventResults>> {
        self.record(SessionCall::HistoryReadEvents {
            details: details.clone(),
            filter: filter.clone(),
            node_ids: node_ids.to_vec(),
        })?;
        let results = self.server.read_events(details, filter, node_ids).await?;
        Ok(self.shape(Service::HistoryReadEvents, results))
    }

    async fn browse(&self, node_id: &NodeId) -> OpcUaResult<Vec<BrowseNode>> {
        self.record(SessionCall::Browse {
            node_id: node_id.clone(),
        })?;
        self.server.browse(node_id).await
    }
}

// =============================================================================
// Mock Subscriptions
// =============================================================================

/// Data value subscription serving a fixed value table.
#[derive(Debug, Default)]
pub struct MockDataValueSubscription {
    values: Mutex<HashMap<NodeId, DataValue>>,
    lookups: Mutex<Vec<Vec<NodeId>>>,
    fail: Mutex<bool>,
}

impl MockDataValueSubscription {
    /// Creates an empty subscription.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the latest value of `node_id`.
    pub fn set(&self, node_id: NodeId, value: DataValue) {
        self.values.lock().insert(node_id, value);
    }

    /// Makes every lookup fail.
    pub fn fail(&self) {
        *self.fail.lock() = true;
    }

    /// Returns the recorded lookups.
    pub fn lookups(&self) -> Vec<Vec<NodeId>> {
        self.lookups.lock().clone()
    }
}

#[async_trait]
impl DataValueSubscription for MockDataValueSubscription {
    async fn get_values(&self, node_ids: &[NodeId]) -> OpcUaResult<Vec<QueryResult<DataValue>>> {
        self.lookups.lock().push(node_ids.to_vec());
        if *self.fail.lock() {
            return Err(OpcUaError::connection(ConnectionError::closed(Some(
                "subscription lost".to_string(),
            ))));
        }
        let values = self.values.lock();
        Ok(node_ids
            .iter()
            .map(|node_id| {
                values.get(node_id).cloned().ok_or_else(|| {
                    StatusError::new(
                        StatusCode::BAD_NODE_ID_UNKNOWN,
                        format!("Node {} is not monitored", node_id),
                    )
                })
            })
            .collect())
    }
}

/// Event subscription serving canned results per reference id.
#[derive(Debug, Default)]
pub struct MockEventSubscription {
    results: Mutex<HashMap<String, QueryResult<EventResults>>>,
    requests: Mutex<Vec<(String, NodeId, EventFilter)>>,
}

impl MockEventSubscription {
    /// Creates an empty subscription.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the result returned for `ref_id`.
    pub fn set(&self, ref_id: impl Into<String>, result: QueryResult<EventResults>) {
        self.results.lock().insert(ref_id.into(), result);
    }

    /// Returns the recorded requests as `(ref_id, notifier, filter)`.
    pub fn requests(&self) -> Vec<(String, NodeId, EventFilter)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl EventSubscription for MockEventSubscription {
    async fn get_event_data(
        &self,
        query: &OpcUaQuery,
        node_id: &NodeId,
        filter: &EventFilter,
    ) -> QueryResult<EventResults> {
        self.requests
            .lock()
            .push((query.ref_id.clone(), node_id.clone(), filter.clone()));
        self.results
            .lock()
            .get(&query.ref_id)
            .cloned()
            .unwrap_or_else(|| Ok(EventResults::new(Vec::new())))
    }
}

// =============================================================================
// Mock Connection
// =============================================================================

/// Connection bundling the mocks.
#[derive(Debug)]
pub struct MockConnection {
    /// Session.
    pub session: MockSession,
    /// Data value subscription.
    pub values: MockDataValueSubscription,
    /// Event subscription.
    pub events: MockEventSubscription,
}

impl MockConnection {
    /// Creates a connection whose session serves `server`.
    pub fn new(server: MemoryServer) -> Self {
        Self {
            session: MockSession::new(server),
            values: MockDataValueSubscription::new(),
            events: MockEventSubscription::new(),
        }
    }
}

impl Connection for MockConnection {
    fn session(&self) -> &dyn OpcUaSession {
        &self.session
    }

    fn data_value_subscription(&self) -> &dyn DataValueSubscription {
        &self.values
    }

    fn event_subscription(&self) -> &dyn EventSubscription {
        &self.events
    }
}

/// Provider handing out one mock connection, or failing.
#[derive(Debug)]
pub struct MockConnectionProvider {
    connection: Arc<MockConnection>,
    fail: Mutex<bool>,
    get_count: AtomicU64,
    contexts: Mutex<Vec<PluginContext>>,
}

impl MockConnectionProvider {
    /// Creates a provider for `connection`.
    pub fn new(connection: Arc<MockConnection>) -> Self {
        Self {
            connection,
            fail: Mutex::new(false),
            get_count: AtomicU64::new(0),
            contexts: Mutex::new(Vec::new()),
        }
    }

    /// Makes every acquisition fail.
    pub fn fail(&self) {
        *self.fail.lock() = true;
    }

    /// Returns the number of acquisitions.
    pub fn get_count(&self) -> u64 {
        self.get_count.load(Ordering::SeqCst)
    }

    /// Returns the contexts passed to the provider.
    pub fn contexts(&self) -> Vec<PluginContext> {
        self.contexts.lock().clone()
    }
}

#[async_trait]
impl ConnectionProvider for MockConnectionProvider {
    async fn get(&self, context: &PluginContext) -> OpcUaResult<Arc<dyn Connection>> {
        self.get_count.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().push(context.clone());
        if *self.fail.lock() {
            return Err(OpcUaError::connection(ConnectionError::acquire_failed(
                context.data_source.clone(),
                "endpoint unreachable",
            )));
        }
        let connection: Arc<dyn Connection> = self.connection.clone();
        Ok(connection)
    }
}
