// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Builders
//!
//! Builders for queries, event queries and requests.
//!
//! ```rust,ignore
//! let query = QueryBuilder::raw("A", PlantFixture::pump_speed())
//!     .minutes(0, 5)
//!     .max_data_points(100)
//!     .build();
//! ```

use uaq_opcua::{FilterOperator, PortableQualifiedName};
use uaq_query::{
    EventColumn, EventFilterClause, EventQuery, FilterOperandSpec, NodeDefinition, OpcUaQuery,
    PluginContext, QueryDataRequest, ReadType,
};

use crate::common::fixtures::{HISTORY_MINUTES, epoch_ms};

// =============================================================================
// QueryBuilder
// =============================================================================

/// Builder for [`OpcUaQuery`].
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    query: OpcUaQuery,
}

impl QueryBuilder {
    /// Starts a query with an arbitrary read type name.
    pub fn new(ref_id: impl Into<String>, read_type: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            query: OpcUaQuery::new(ref_id, read_type, node_id)
                .with_time_range(epoch_ms(0), epoch_ms(HISTORY_MINUTES)),
        }
    }

    /// Starts a query of a known read type.
    pub fn of(ref_id: impl Into<String>, read_type: ReadType, node_id: impl Into<String>) -> Self {
        Self::new(ref_id, read_type.as_str(), node_id)
    }

    /// Starts a `ReadNode` query.
    pub fn read_node(ref_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self::of(ref_id, ReadType::ReadNode, node_id)
    }

    /// Starts a `Subscribe` query.
    pub fn subscribe(ref_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self::of(ref_id, ReadType::Subscribe, node_id)
    }

    /// Starts a `ReadDataRaw` query.
    pub fn raw(ref_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self::of(ref_id, ReadType::ReadDataRaw, node_id)
    }

    /// Starts a `ReadDataProcessed` query.
    pub fn processed(ref_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self::of(ref_id, ReadType::ReadDataProcessed, node_id)
    }

    /// Starts a `ReadEvents` query.
    pub fn events(ref_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self::of(ref_id, ReadType::ReadEvents, node_id)
    }

    /// Starts a `SubscribeEvents` query.
    pub fn subscribe_events(ref_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self::of(ref_id, ReadType::SubscribeEvents, node_id)
    }

    /// Sets the time range in fixture minutes.
    pub fn minutes(mut self, from: u32, to: u32) -> Self {
        self.query = self.query.with_time_range(epoch_ms(from), epoch_ms(to));
        self
    }

    /// Sets the time range in epoch milliseconds.
    pub fn time_range(mut self, from_ms: i64, to_ms: i64) -> Self {
        self.query = self.query.with_time_range(from_ms, to_ms);
        self
    }

    /// Sets the maximum number of data points.
    pub fn max_data_points(mut self, max: i64) -> Self {
        self.query = self.query.with_max_data_points(max);
        self
    }

    /// Sets the processing interval.
    pub fn interval_ms(mut self, interval: i64) -> Self {
        self.query = self.query.with_interval_ms(interval);
        self
    }

    /// Sets the aggregate by standard function node id.
    pub fn aggregate(mut self, name: &str, node_id: &str) -> Self {
        self.query = self.query.with_aggregate(NodeDefinition::new(name, node_id));
        self
    }

    /// Sets the event query.
    pub fn event_query(mut self, event_query: EventQuery) -> Self {
        self.query = self.query.with_event_query(event_query);
        self
    }

    /// Builds the query.
    pub fn build(self) -> OpcUaQuery {
        self.query
    }
}

// =============================================================================
// EventQueryBuilder
// =============================================================================

/// Builder for [`EventQuery`].
#[derive(Debug, Clone, Default)]
pub struct EventQueryBuilder {
    event_query: EventQuery,
}

impl EventQueryBuilder {
    /// Starts an empty event query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects a standard-namespace field, e.g. `"Message"`.
    pub fn select(mut self, name: &str) -> Self {
        self.event_query
            .event_columns
            .push(EventColumn::new(vec![PortableQualifiedName::standard(name)]));
        self
    }

    /// Selects a column with an explicit browse path and alias.
    pub fn select_path(mut self, path: Vec<PortableQualifiedName>, alias: &str) -> Self {
        self.event_query
            .event_columns
            .push(EventColumn::new(path).with_alias(alias));
        self
    }

    /// Adds a where clause element.
    pub fn clause(mut self, operator: FilterOperator, operands: Vec<FilterOperandSpec>) -> Self {
        self.event_query
            .event_filters
            .push(EventFilterClause::new(operator.value(), operands));
        self
    }

    /// Adds `field <op> literal` on a standard-namespace field.
    pub fn compare(self, field: &str, operator: FilterOperator, literal: &str) -> Self {
        self.clause(
            operator,
            vec![field_operand(field), FilterOperandSpec::literal("", literal)],
        )
    }

    /// Builds the event query.
    pub fn build(self) -> EventQuery {
        self.event_query
    }
}

/// Simple attribute operand for a standard-namespace event field.
pub fn field_operand(name: &str) -> FilterOperandSpec {
    FilterOperandSpec::simple_attribute(None, vec![PortableQualifiedName::standard(name)])
}

/// The usual event columns: Time, Message, Severity.
pub fn standard_event_query() -> EventQueryBuilder {
    EventQueryBuilder::new()
        .select("Time")
        .select("Message")
        .select("Severity")
}

// =============================================================================
// Requests
// =============================================================================

/// Wraps `queries` in a request for the `plant` data source.
pub fn request(queries: Vec<OpcUaQuery>) -> QueryDataRequest {
    QueryDataRequest::new(PluginContext::for_data_source("plant"), queries)
}
