// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory OPC UA server.
//!
//! [`MemoryServer`] implements [`OpcUaSession`] over an address space held
//! in memory. It backs the command line tool's offline mode and the
//! integration tests. It supports current values, raw and processed
//! history, and event history with select and where clause evaluation.
//!
//! # Fixture Format
//!
//! ```json
//! {
//!   "namespaces": ["urn:example"],
//!   "nodes": [
//!     { "nodeId": "ns=1;s=Boiler", "browseName": "1:Boiler", "nodeClass": "object" },
//!     { "nodeId": "ns=1;s=Boiler.Temp", "browseName": "1:Temp", "parent": "ns=1;s=Boiler",
//!       "value": 21.5,
//!       "history": [ { "timestamp": "2025-01-01T00:00:00Z", "value": 20.0 } ] }
//!   ],
//!   "events": [
//!     { "notifier": "i=2253", "time": "2025-01-01T00:00:00Z",
//!       "fields": { "Message": "Overheat", "Severity": 800 } }
//!   ]
//! }
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Deserialize;

use crate::browse::{BrowseNode, QualifiedName};
use crate::client::session::{OpcUaSession, ReadEventDetails, ReadProcessedDetails, ReadRawDetails};
use crate::client::values::{DataValue, EventFields, EventResults, HistoryValues, OpcUaValue};
use crate::error::OpcUaResult;
use crate::filter::{ContentFilter, EventFilter, FilterOperand, FilterOperator, SimpleAttributeOperand};
use crate::namespace::NamespaceTable;
use crate::types::{NodeClass, NodeId, StatusCode};

// =============================================================================
// Aggregate
// =============================================================================

/// Standard aggregate functions understood by the memory server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregate {
    /// Average of good values (i=2342).
    Average,
    /// Sum of good values (i=2344).
    Total,
    /// Minimum good value (i=2346).
    Minimum,
    /// Maximum good value (i=2347).
    Maximum,
    /// Number of good values (i=2352).
    Count,
}

impl Aggregate {
    /// Returns the aggregate function node id.
    pub fn node_id(&self) -> NodeId {
        NodeId::numeric(
            0,
            match self {
                Self::Average => 2342,
                Self::Total => 2344,
                Self::Minimum => 2346,
                Self::Maximum => 2347,
                Self::Count => 2352,
            },
        )
    }

    /// Looks up an aggregate by its function node id.
    pub fn from_node_id(node_id: &NodeId) -> Option<Self> {
        if node_id.namespace_index != 0 {
            return None;
        }
        match node_id.as_numeric()? {
            2342 => Some(Self::Average),
            2344 => Some(Self::Total),
            2346 => Some(Self::Minimum),
            2347 => Some(Self::Maximum),
            2352 => Some(Self::Count),
            _ => None,
        }
    }

    fn apply(&self, samples: &[f64]) -> Option<f64> {
        if samples.is_empty() {
            return match self {
                Self::Count => Some(0.0),
                _ => None,
            };
        }
        let total: f64 = samples.iter().sum();
        Some(match self {
            Self::Average => total / samples.len() as f64,
            Self::Total => total,
            Self::Minimum => samples.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Maximum => samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Count => samples.len() as f64,
        })
    }
}

// =============================================================================
// MemoryEvent
// =============================================================================

/// An event stored in the memory server.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEvent {
    /// Event type.
    pub event_type: NodeId,
    /// Time the event occurred.
    pub time: DateTime<Utc>,
    /// Event fields keyed by `/`-joined browse path.
    pub fields: HashMap<String, OpcUaValue>,
}

impl MemoryEvent {
    /// Creates a BaseEventType event.
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            event_type: NodeId::BASE_EVENT_TYPE,
            time,
            fields: HashMap::new(),
        }
    }

    /// Sets the event type.
    pub fn with_type(mut self, event_type: NodeId) -> Self {
        self.event_type = event_type;
        self
    }

    /// Sets a field.
    pub fn with_field(mut self, path: impl Into<String>, value: OpcUaValue) -> Self {
        self.fields.insert(path.into(), value);
        self
    }

    /// Returns the value of the field at `path`.
    ///
    /// `EventType` and `Time` are always available.
    pub fn field(&self, path: &str) -> OpcUaValue {
        match path {
            "EventType" => OpcUaValue::NodeId(self.event_type.clone()),
            "Time" => OpcUaValue::DateTime(self.time),
            _ => self.fields.get(path).cloned().unwrap_or_default(),
        }
    }
}

// =============================================================================
// MemoryServer
// =============================================================================

#[derive(Debug, Clone)]
struct MemoryNode {
    reference: BrowseNode,
    parent: Option<NodeId>,
    value: Option<DataValue>,
    history: Vec<DataValue>,
}

/// In-memory OPC UA server session.
#[derive(Debug, Default)]
pub struct MemoryServer {
    namespaces: NamespaceTable,
    nodes: RwLock<HashMap<NodeId, MemoryNode>>,
    events: RwLock<HashMap<NodeId, Vec<MemoryEvent>>>,
}

impl MemoryServer {
    /// Creates an empty server with the given namespace table.
    pub fn new(namespaces: NamespaceTable) -> Self {
        Self {
            namespaces,
            nodes: RwLock::new(HashMap::new()),
            events: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a node under `parent` (the Objects folder when `None`).
    pub fn add_node(&self, reference: BrowseNode, parent: Option<NodeId>) {
        let node_id = reference.node_id.clone();
        self.nodes.write().insert(
            node_id,
            MemoryNode {
                reference,
                parent: Some(parent.unwrap_or(NodeId::OBJECTS_FOLDER)),
                value: None,
                history: Vec::new(),
            },
        );
    }

    /// Adds a variable with a current value.
    pub fn add_variable(&self, node_id: NodeId, browse_name: QualifiedName, value: OpcUaValue) {
        let display_name = browse_name.name.clone();
        self.add_node(
            BrowseNode::new(node_id.clone(), browse_name, display_name, NodeClass::Variable),
            None,
        );
        self.set_value(&node_id, DataValue::new(value));
    }

    /// Sets the current value of a node, creating it if needed.
    pub fn set_value(&self, node_id: &NodeId, value: DataValue) {
        let mut nodes = self.nodes.write();
        let node = nodes
            .entry(node_id.clone())
            .or_insert_with(|| placeholder(node_id));
        node.value = Some(value);
    }

    /// Appends a history sample, keeping history in time order.
    pub fn append_history(&self, node_id: &NodeId, value: DataValue) {
        let mut nodes = self.nodes.write();
        let node = nodes
            .entry(node_id.clone())
            .or_insert_with(|| placeholder(node_id));
        node.history.push(value);
        node.history.sort_by_key(|v| v.timestamp());
    }

    /// Records an event raised by `notifier`.
    pub fn add_event(&self, notifier: &NodeId, event: MemoryEvent) {
        let mut events = self.events.write();
        let list = events.entry(notifier.clone()).or_default();
        list.push(event);
        list.sort_by_key(|e| e.time);
    }

    /// Returns `true` if the node or notifier exists.
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.read().contains_key(node_id) || self.events.read().contains_key(node_id)
    }

    /// Loads a server from a fixture document.
    pub fn from_fixture(fixture: ServerFixture) -> OpcUaResult<Self> {
        let server = Self::new(NamespaceTable::from_uris(fixture.namespaces));

        for node in fixture.nodes {
            let node_id: NodeId = node.node_id.parse()?;
            let parent = node.parent.as_deref().map(str::parse::<NodeId>).transpose()?;
            let browse_name = QualifiedName::from(node.browse_name.as_str());
            let display_name = node.display_name.unwrap_or_else(|| browse_name.name.clone());
            let mut reference =
                BrowseNode::new(node_id.clone(), browse_name, display_name, node.node_class);
            if let Some(type_definition) = node.type_definition {
                reference = reference.with_type_definition(type_definition.parse()?);
            }
            server.add_node(reference, parent);

            if let Some(value) = node.value {
                server.set_value(&node_id, DataValue::new(OpcUaValue::from_json(&value)));
            }
            for sample in node.history {
                server.append_history(
                    &node_id,
                    DataValue::at(OpcUaValue::from_json(&sample.value), sample.timestamp),
                );
            }
        }

        for event in fixture.events {
            let notifier: NodeId = event.notifier.parse()?;
            let mut memory_event = MemoryEvent::new(event.time);
            if let Some(event_type) = event.event_type {
                memory_event = memory_event.with_type(event_type.parse()?);
            }
            for (path, value) in event.fields {
                memory_event = memory_event.with_field(path, OpcUaValue::from_json(&value));
            }
            server.add_event(&notifier, memory_event);
        }

        tracing::debug!(
            namespaces = server.namespaces.len(),
            nodes = server.nodes.read().len(),
            "Memory server loaded from fixture"
        );
        Ok(server)
    }

    fn raw_history(&self, node_id: &NodeId, details: &ReadRawDetails) -> HistoryValues {
        let nodes = self.nodes.read();
        let Some(node) = nodes.get(node_id) else {
            return HistoryValues::bad(StatusCode::BAD_NODE_ID_UNKNOWN);
        };
        let (start, end) = ordered(details.start, details.end);
        let mut values: Vec<DataValue> = node
            .history
            .iter()
            .filter(|v| v.timestamp().is_some_and(|t| t >= start && t <= end))
            .cloned()
            .collect();
        if details.start > details.end {
            values.reverse();
        }
        if details.max_values > 0 {
            values.truncate(details.max_values as usize);
        }
        HistoryValues::new(values)
    }

    fn processed_history(&self, node_id: &NodeId, details: &ReadProcessedDetails) -> HistoryValues {
        let Some(aggregate) = Aggregate::from_node_id(&details.aggregate) else {
            return HistoryValues::bad(StatusCode::BAD_AGGREGATE_NOT_SUPPORTED);
        };
        let nodes = self.nodes.read();
        let Some(node) = nodes.get(node_id) else {
            return HistoryValues::bad(StatusCode::BAD_NODE_ID_UNKNOWN);
        };

        let (start, end) = ordered(details.start, details.end);
        let span = end - start;
        let interval = chrono::Duration::from_std(details.interval)
            .ok()
            .filter(|i| *i > chrono::Duration::zero() && *i < span)
            .unwrap_or(span);

        let mut values = Vec::new();
        let mut bucket_start = start;
        loop {
            let bucket_end = bucket_start + interval;
            let samples: Vec<f64> = node
                .history
                .iter()
                .filter(|v| v.is_good())
                .filter(|v| {
                    v.timestamp()
                        .is_some_and(|t| t >= bucket_start && t < bucket_end)
                })
                .filter_map(|v| v.value.as_f64())
                .collect();
            values.push(match aggregate.apply(&samples) {
                Some(result) => DataValue::at(OpcUaValue::Double(result), bucket_start),
                None => DataValue {
                    status: StatusCode::BAD_NO_DATA,
                    ..DataValue::at(OpcUaValue::Null, bucket_start)
                },
            });
            bucket_start = bucket_end;
            if bucket_start >= end || interval.is_zero() {
                break;
            }
        }
        HistoryValues::new(values)
    }

    fn event_history(
        &self,
        notifier: &NodeId,
        details: &ReadEventDetails,
        filter: &EventFilter,
    ) -> EventResults {
        let events = self.events.read();
        let Some(list) = events.get(notifier) else {
            return if self.nodes.read().contains_key(notifier) {
                EventResults::new(Vec::new())
            } else {
                EventResults::bad(StatusCode::BAD_NODE_ID_UNKNOWN)
            };
        };

        let (start, end) = ordered(details.start, details.end);
        let mut selected: Vec<EventFields> = Vec::new();
        for event in list.iter().filter(|e| e.time >= start && e.time <= end) {
            match matches_where(&filter.where_clause, event) {
                Ok(true) => selected.push(select_fields(&filter.select_clauses, event)),
                Ok(false) => {}
                Err(status) => return EventResults::bad(status),
            }
            if details.max_events > 0 && selected.len() >= details.max_events as usize {
                break;
            }
        }
        EventResults::new(selected)
    }
}

#[async_trait]
impl OpcUaSession for MemoryServer {
    fn namespace_table(&self) -> &NamespaceTable {
        &self.namespaces
    }

    async fn read_values(&self, node_ids: &[NodeId]) -> OpcUaResult<Vec<DataValue>> {
        let nodes = self.nodes.read();
        Ok(node_ids
            .iter()
            .map(|id| match nodes.get(id).and_then(|n| n.value.clone()) {
                Some(value) => value,
                None => DataValue::bad(StatusCode::BAD_NODE_ID_UNKNOWN),
            })
            .collect())
    }

    async fn read_history_raw(
        &self,
        details: &ReadRawDetails,
        node_ids: &[NodeId],
    ) -> OpcUaResult<Vec<HistoryValues>> {
        Ok(node_ids.iter().map(|id| self.raw_history(id, details)).collect())
    }

    async fn read_history_processed(
        &self,
        details: &ReadProcessedDetails,
        node_ids: &[NodeId],
    ) -> OpcUaResult<Vec<HistoryValues>> {
        Ok(node_ids
            .iter()
            .map(|id| self.processed_history(id, details))
            .collect())
    }

    async fn read_events(
        &self,
        details: &ReadEventDetails,
        filter: &EventFilter,
        node_ids: &[NodeId],
    ) -> OpcUaResult<Vec<EventResults>> {
        Ok(node_ids
            .iter()
            .map(|id| self.event_history(id, details, filter))
            .collect())
    }

    async fn browse(&self, node_id: &NodeId) -> OpcUaResult<Vec<BrowseNode>> {
        let nodes = self.nodes.read();
        let mut children: Vec<BrowseNode> = nodes
            .values()
            .filter(|n| n.parent.as_ref() == Some(node_id))
            .map(|n| n.reference.clone())
            .collect();
        children.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(children)
    }
}

fn placeholder(node_id: &NodeId) -> MemoryNode {
    let name = node_id.to_opc_string();
    MemoryNode {
        reference: BrowseNode::new(
            node_id.clone(),
            QualifiedName::new(node_id.namespace_index, name.clone()),
            name,
            NodeClass::Variable,
        ),
        parent: Some(NodeId::OBJECTS_FOLDER),
        value: None,
        history: Vec::new(),
    }
}

fn ordered(a: DateTime<Utc>, b: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    if a <= b { (a, b) } else { (b, a) }
}

// =============================================================================
// Event Filter Evaluation
// =============================================================================

fn select_fields(clauses: &[SimpleAttributeOperand], event: &MemoryEvent) -> EventFields {
    clauses
        .iter()
        .map(|clause| event.field(&clause.path_string()))
        .collect()
}

fn matches_where(filter: &ContentFilter, event: &MemoryEvent) -> Result<bool, StatusCode> {
    if filter.is_empty() {
        return Ok(true);
    }
    WhereEvaluator::new(filter, event).element(0)
}

#[derive(Clone, Copy)]
enum Slot {
    Pending,
    Visiting,
    Done(bool),
}

/// Evaluates a where clause against one event.
///
/// Each element is computed at most once per event, so operands that share
/// sub-expressions stay linear. Revisiting an element that is still being
/// evaluated means the element references form a cycle.
struct WhereEvaluator<'a> {
    filter: &'a ContentFilter,
    event: &'a MemoryEvent,
    slots: Vec<Slot>,
}

impl<'a> WhereEvaluator<'a> {
    fn new(filter: &'a ContentFilter, event: &'a MemoryEvent) -> Self {
        Self {
            filter,
            event,
            slots: vec![Slot::Pending; filter.len()],
        }
    }

    fn element(&mut self, index: u32) -> Result<bool, StatusCode> {
        let slot = self
            .slots
            .get(index as usize)
            .copied()
            .ok_or(StatusCode::BAD_FILTER_OPERAND_INVALID)?;
        match slot {
            Slot::Done(result) => Ok(result),
            Slot::Visiting => Err(StatusCode::BAD_CONTENT_FILTER_INVALID),
            Slot::Pending => {
                self.slots[index as usize] = Slot::Visiting;
                let result = self.evaluate(index)?;
                self.slots[index as usize] = Slot::Done(result);
                Ok(result)
            }
        }
    }

    fn operand(&mut self, operand: &FilterOperand) -> Result<OpcUaValue, StatusCode> {
        match operand {
            FilterOperand::Literal(value) => Ok(value.clone()),
            FilterOperand::Element(index) => self.element(*index).map(OpcUaValue::Boolean),
            FilterOperand::SimpleAttribute(attribute) => {
                Ok(self.event.field(&attribute.path_string()))
            }
        }
    }

    fn evaluate(&mut self, index: u32) -> Result<bool, StatusCode> {
        let filter = self.filter;
        let event = self.event;
        let element = filter
            .element(index)
            .ok_or(StatusCode::BAD_FILTER_OPERAND_INVALID)?;
        let values = element
            .operands
            .iter()
            .map(|operand| self.operand(operand))
            .collect::<Result<Vec<_>, _>>()?;
        let arg = |i: usize| values.get(i).ok_or(StatusCode::BAD_FILTER_OPERAND_INVALID);
        let cmp = |a: &OpcUaValue, b: &OpcUaValue| a.compare(b);

        Ok(match element.operator {
            FilterOperator::Equals => cmp(arg(0)?, arg(1)?) == Some(Ordering::Equal),
            FilterOperator::IsNull => arg(0)?.is_null(),
            FilterOperator::GreaterThan => cmp(arg(0)?, arg(1)?) == Some(Ordering::Greater),
            FilterOperator::LessThan => cmp(arg(0)?, arg(1)?) == Some(Ordering::Less),
            FilterOperator::GreaterThanOrEqual => {
                matches!(cmp(arg(0)?, arg(1)?), Some(Ordering::Greater | Ordering::Equal))
            }
            FilterOperator::LessThanOrEqual => {
                matches!(cmp(arg(0)?, arg(1)?), Some(Ordering::Less | Ordering::Equal))
            }
            FilterOperator::Like => match (arg(0)?.as_str(), arg(1)?.as_str()) {
                (Some(text), Some(pattern)) => like(text, pattern),
                _ => false,
            },
            FilterOperator::Not => !arg(0)?.as_bool().unwrap_or(false),
            FilterOperator::Between => {
                let value = arg(0)?;
                matches!(cmp(value, arg(1)?), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(cmp(value, arg(2)?), Some(Ordering::Less | Ordering::Equal))
            }
            FilterOperator::InList => {
                let value = arg(0)?;
                values[1..]
                    .iter()
                    .any(|candidate| cmp(value, candidate) == Some(Ordering::Equal))
            }
            FilterOperator::And => {
                arg(0)?.as_bool().unwrap_or(false) && arg(1)?.as_bool().unwrap_or(false)
            }
            FilterOperator::Or => {
                arg(0)?.as_bool().unwrap_or(false) || arg(1)?.as_bool().unwrap_or(false)
            }
            FilterOperator::OfType => {
                OpcUaValue::NodeId(event.event_type.clone()).compare(arg(0)?)
                    == Some(Ordering::Equal)
            }
            FilterOperator::BitwiseAnd | FilterOperator::BitwiseOr => {
                let (a, b) = (arg(0)?.as_i64(), arg(1)?.as_i64());
                match (a, b, element.operator) {
                    (Some(a), Some(b), FilterOperator::BitwiseAnd) => a & b != 0,
                    (Some(a), Some(b), _) => a | b != 0,
                    _ => false,
                }
            }
            FilterOperator::Cast | FilterOperator::InView | FilterOperator::RelatedTo => {
                return Err(StatusCode::BAD_CONTENT_FILTER_INVALID);
            }
        })
    }
}

/// SQL-style pattern match: `%` any run, `_` any single character.
fn like(text: &str, pattern: &str) -> bool {
    fn go(text: &[char], pattern: &[char]) -> bool {
        match pattern.split_first() {
            None => text.is_empty(),
            Some(('%', rest)) => (0..=text.len()).any(|skip| go(&text[skip..], rest)),
            Some(('_', rest)) => !text.is_empty() && go(&text[1..], rest),
            Some((c, rest)) => text.first() == Some(c) && go(&text[1..], rest),
        }
    }
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    go(&text, &pattern)
}

// =============================================================================
// Fixtures
// =============================================================================

/// Fixture document for [`MemoryServer::from_fixture`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerFixture {
    /// Namespace URIs from index 1 on.
    #[serde(default)]
    pub namespaces: Vec<String>,
    /// Address space nodes.
    #[serde(default)]
    pub nodes: Vec<NodeFixture>,
    /// Event history.
    #[serde(default)]
    pub events: Vec<EventFixture>,
}

/// A node in a [`ServerFixture`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFixture {
    /// Native node id.
    pub node_id: String,
    /// Browse name in `<ns>:<name>` form.
    pub browse_name: String,
    /// Display name; defaults to the browse name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Node class.
    #[serde(default = "default_node_class")]
    pub node_class: NodeClass,
    /// Parent node id; defaults to the Objects folder.
    #[serde(default)]
    pub parent: Option<String>,
    /// Type definition node id.
    #[serde(default)]
    pub type_definition: Option<String>,
    /// Current value.
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    /// History samples.
    #[serde(default)]
    pub history: Vec<SampleFixture>,
}

fn default_node_class() -> NodeClass {
    NodeClass::Variable
}

/// A history sample in a [`NodeFixture`].
#[derive(Debug, Clone, Deserialize)]
pub struct SampleFixture {
    /// Source timestamp.
    pub timestamp: DateTime<Utc>,
    /// Value.
    pub value: serde_json::Value,
}

/// An event in a [`ServerFixture`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFixture {
    /// Notifier node id.
    pub notifier: String,
    /// Event type node id; defaults to BaseEventType.
    #[serde(default)]
    pub event_type: Option<String>,
    /// Event time.
    pub time: DateTime<Utc>,
    /// Fields keyed by `/`-joined browse path.
    #[serde(default)]
    pub fields: HashMap<String, serde_json::Value>,
}

// =============================================================================
// Tests
// =============================================================================
