// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Query model.
//!
//! A query arrives as JSON and is never mutated afterwards:
//!
//! ```text
//! {
//!   "refId": "A",
//!   "readType": "ReadDataProcessed",
//!   "nodeId": "{\"id\":\"i=1001\",\"namespaceUrl\":\"urn:plant\"}",
//!   "timeRange": { "fromEpochMs": 0, "toEpochMs": 3600000 },
//!   "maxDataPoints": 1000,
//!   "intervalMs": 60000,
//!   "aggregate": { "name": "Average", "nodeId": "i=2342" },
//!   "eventQuery": { "eventColumns": [..], "eventFilters": [..] }
//! }
//! ```
//!
//! Node ids stay unparsed strings until a handler decodes them against the
//! session's namespace table.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use uaq_opcua::{
    ConfigurationError, ConversionError, FilterError, OpcUaError, OpcUaResult,
    PortableQualifiedName, StatusError,
};

/// Per-query outcome: a value or a status error.
pub type QueryResult<T> = Result<T, StatusError>;

// =============================================================================
// ReadType
// =============================================================================

/// Read modes with a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadType {
    /// Point read of current values.
    ReadNode,
    /// Latest values from the data value subscription.
    Subscribe,
    /// Raw history.
    ReadDataRaw,
    /// Aggregated history.
    ReadDataProcessed,
    /// Event history.
    ReadEvents,
    /// Latest events from the event subscription.
    SubscribeEvents,
}

impl ReadType {
    /// All read types, in dispatch documentation order.
    pub const ALL: [ReadType; 6] = [
        Self::ReadNode,
        Self::Subscribe,
        Self::ReadDataRaw,
        Self::ReadDataProcessed,
        Self::ReadEvents,
        Self::SubscribeEvents,
    ];

    /// Returns the wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ReadNode => "ReadNode",
            Self::Subscribe => "Subscribe",
            Self::ReadDataRaw => "ReadDataRaw",
            Self::ReadDataProcessed => "ReadDataProcessed",
            Self::ReadEvents => "ReadEvents",
            Self::SubscribeEvents => "SubscribeEvents",
        }
    }

    /// Looks up a read type by its wire name. Matching is case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl FromStr for ReadType {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
            .ok_or_else(|| OpcUaError::configuration(ConfigurationError::unsupported_read_type(s)))
    }
}

impl fmt::Display for ReadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// TimeRange
// =============================================================================

/// Query time range in Unix epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    /// Range start.
    #[serde(alias = "fromEpochMS")]
    pub from_epoch_ms: i64,

    /// Range end.
    #[serde(alias = "toEpochMS")]
    pub to_epoch_ms: i64,
}

impl TimeRange {
    /// Creates a time range.
    pub fn new(from_epoch_ms: i64, to_epoch_ms: i64) -> Self {
        Self {
            from_epoch_ms,
            to_epoch_ms,
        }
    }

    /// Returns the start as a UTC timestamp.
    pub fn start(&self) -> OpcUaResult<DateTime<Utc>> {
        epoch_ms_to_utc(self.from_epoch_ms)
    }

    /// Returns the end as a UTC timestamp.
    pub fn end(&self) -> OpcUaResult<DateTime<Utc>> {
        epoch_ms_to_utc(self.to_epoch_ms)
    }
}

fn epoch_ms_to_utc(epoch_ms: i64) -> OpcUaResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(epoch_ms)
        .ok_or_else(|| OpcUaError::conversion(ConversionError::invalid_timestamp(epoch_ms)))
}

// =============================================================================
// Aggregate
// =============================================================================

/// An aggregate function picked by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Portable node id of the aggregate function.
    pub node_id: String,
}

impl NodeDefinition {
    /// Creates a node definition.
    pub fn new(name: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_id: node_id.into(),
        }
    }
}

// =============================================================================
// Event Query
// =============================================================================

/// Event columns and filter clauses of an event query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    /// Event fields to return, in output column order.
    #[serde(default)]
    pub event_columns: Vec<EventColumn>,

    /// Where clause elements, in element order.
    #[serde(default)]
    pub event_filters: Vec<EventFilterClause>,
}

/// One selected event field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventColumn {
    /// Browse path from the base event type.
    pub browse_path: Vec<PortableQualifiedName>,

    /// Column name in the response; defaults to the browse path.
    #[serde(default)]
    pub alias: String,
}

impl EventColumn {
    /// Creates a column.
    pub fn new(browse_path: Vec<PortableQualifiedName>) -> Self {
        Self {
            browse_path,
            alias: String::new(),
        }
    }

    /// Sets the alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Returns the column name: the alias, else the joined browse path.
    pub fn display_name(&self) -> String {
        if !self.alias.trim().is_empty() {
            return self.alias.clone();
        }
        self.browse_path
            .iter()
            .map(|q| q.name.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// One where clause element: an operator and its operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFilterClause {
    /// Numeric filter operator.
    pub oper: u32,

    /// Operands in order.
    #[serde(default)]
    pub operands: Vec<FilterOperandSpec>,
}

impl EventFilterClause {
    /// Creates a clause.
    pub fn new(oper: u32, operands: Vec<FilterOperandSpec>) -> Self {
        Self { oper, operands }
    }
}

/// A filter operand as sent by the client: a type tag plus a JSON payload.
///
/// The payload is either a JSON document encoded as a string or an inline
/// JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOperandSpec {
    /// Operand type tag.
    #[serde(rename = "type")]
    pub kind: u32,

    /// Operand payload.
    pub value: serde_json::Value,
}

impl FilterOperandSpec {
    /// Creates a literal operand.
    pub fn literal(type_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self::tagged(OperandTag::Literal, &LiteralOp::new(type_id, value))
    }

    /// Creates an element operand.
    pub fn element(index: u32) -> Self {
        Self::tagged(OperandTag::Element, &ElementOp { index })
    }

    /// Creates a simple attribute operand.
    pub fn simple_attribute(
        type_id: Option<String>,
        browse_path: Vec<PortableQualifiedName>,
    ) -> Self {
        Self::tagged(
            OperandTag::SimpleAttribute,
            &SimpleAttributeOp {
                type_id,
                browse_path,
            },
        )
    }

    fn tagged<T: Serialize>(tag: OperandTag, payload: &T) -> Self {
        let text = serde_json::to_string(payload).unwrap_or_default();
        Self {
            kind: tag.value(),
            value: serde_json::Value::String(text),
        }
    }

    /// Returns the payload as text, for diagnostics.
    pub fn payload_text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Decodes the payload into `T`.
    pub fn decode_payload<T: DeserializeOwned>(&self, kind: &'static str) -> OpcUaResult<T> {
        let decoded = match &self.value {
            serde_json::Value::String(s) => serde_json::from_str(s),
            other => serde_json::from_value(other.clone()),
        };
        decoded.map_err(|e| {
            OpcUaError::filter(FilterError::invalid_operand(
                kind,
                self.payload_text(),
                e.to_string(),
            ))
        })
    }
}

/// Operand type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandTag {
    /// Constant value.
    Literal,
    /// Reference to another element.
    Element,
    /// Full attribute operand.
    Attribute,
    /// Event field reference.
    SimpleAttribute,
}

impl OperandTag {
    /// Returns the numeric tag.
    pub const fn value(&self) -> u32 {
        match self {
            Self::Literal => 0,
            Self::Element => 1,
            Self::Attribute => 2,
            Self::SimpleAttribute => 3,
        }
    }

    /// Creates from the numeric tag.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Literal),
            1 => Some(Self::Element),
            2 => Some(Self::Attribute),
            3 => Some(Self::SimpleAttribute),
            _ => None,
        }
    }
}

/// Literal operand payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiteralOp {
    /// Data type node id.
    #[serde(default)]
    pub type_id: String,

    /// Value text.
    #[serde(default)]
    pub value: String,
}

impl LiteralOp {
    /// Creates a literal payload.
    pub fn new(type_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            value: value.into(),
        }
    }
}

/// Element operand payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementOp {
    /// Index of the referenced element.
    pub index: u32,
}

/// Simple attribute operand payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleAttributeOp {
    /// Event type node id; blank or absent means any type.
    #[serde(default)]
    pub type_id: Option<String>,

    /// Browse path to the field.
    #[serde(default)]
    pub browse_path: Vec<PortableQualifiedName>,
}

// =============================================================================
// OpcUaQuery
// =============================================================================

/// One query of a request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpcUaQuery {
    /// Caller's reference id; keys the response.
    pub ref_id: String,

    /// Read mode name. Unknown names are kept so dispatch can decide.
    pub read_type: String,

    /// Portable or native node id string.
    #[serde(default)]
    pub node_id: String,

    /// Time range for history and event reads.
    #[serde(default)]
    pub time_range: TimeRange,

    /// Maximum values per node for raw history; 0 or less means no limit.
    #[serde(default)]
    pub max_data_points: i64,

    /// Processing interval for aggregated history.
    #[serde(default)]
    pub interval_ms: i64,

    /// Aggregate definition, inline or as a JSON string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<serde_json::Value>,

    /// Event columns and filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_query: Option<EventQuery>,
}

impl OpcUaQuery {
    /// Creates a query.
    pub fn new(
        ref_id: impl Into<String>,
        read_type: impl Into<String>,
        node_id: impl Into<String>,
    ) -> Self {
        Self {
            ref_id: ref_id.into(),
            read_type: read_type.into(),
            node_id: node_id.into(),
            ..Default::default()
        }
    }

    /// Sets the time range.
    pub fn with_time_range(mut self, from_epoch_ms: i64, to_epoch_ms: i64) -> Self {
        self.time_range = TimeRange::new(from_epoch_ms, to_epoch_ms);
        self
    }

    /// Sets the maximum data points.
    pub fn with_max_data_points(mut self, max: i64) -> Self {
        self.max_data_points = max;
        self
    }

    /// Sets the processing interval.
    pub fn with_interval_ms(mut self, interval_ms: i64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Sets the aggregate.
    pub fn with_aggregate(mut self, aggregate: NodeDefinition) -> Self {
        self.aggregate = serde_json::to_value(aggregate).ok();
        self
    }

    /// Sets the event query.
    pub fn with_event_query(mut self, event_query: EventQuery) -> Self {
        self.event_query = Some(event_query);
        self
    }

    /// Returns the read type, if it is a known one.
    pub fn kind(&self) -> Option<ReadType> {
        ReadType::from_name(&self.read_type)
    }

    /// Returns the raw history value limit; 0 means no limit.
    pub fn max_values(&self) -> u32 {
        u32::try_from(self.max_data_points.max(0)).unwrap_or(u32::MAX)
    }

    /// Returns the processing interval. Negative intervals become zero.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.interval_ms).unwrap_or(0))
    }

    /// Decodes the aggregate definition.
    ///
    /// # Errors
    ///
    /// Fails if the aggregate is absent or malformed.
    pub fn aggregate_definition(&self) -> OpcUaResult<NodeDefinition> {
        let value = self
            .aggregate
            .as_ref()
            .ok_or_else(|| OpcUaError::configuration(ConfigurationError::missing_field("aggregate")))?;
        let decoded = match value {
            serde_json::Value::String(s) => serde_json::from_str(s),
            other => serde_json::from_value(other.clone()),
        };
        decoded.map_err(|e| {
            OpcUaError::configuration(ConfigurationError::invalid_value("aggregate", e.to_string()))
        })
    }
}

// =============================================================================
// Request
// =============================================================================

/// Identifies the caller and the data source a request targets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginContext {
    /// Organization id.
    #[serde(default)]
    pub org_id: i64,

    /// Data source name or uid.
    #[serde(default)]
    pub data_source: String,

    /// Requesting user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl PluginContext {
    /// Creates a context for a data source.
    pub fn for_data_source(data_source: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            ..Default::default()
        }
    }
}

/// A batch of queries plus the caller context.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDataRequest {
    /// Caller context.
    #[serde(default)]
    pub plugin_context: PluginContext,

    /// Queries in request order.
    pub queries: Vec<OpcUaQuery>,
}

impl QueryDataRequest {
    /// Creates a request.
    pub fn new(plugin_context: PluginContext, queries: Vec<OpcUaQuery>) -> Self {
        Self {
            plugin_context,
            queries,
        }
    }

    /// Parses a request from JSON text.
    pub fn from_json(text: &str) -> OpcUaResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

// =============================================================================
// Tests
// =============================================================================
