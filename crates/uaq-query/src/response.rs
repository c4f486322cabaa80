// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Response frames.
//!
//! Each successful query produces a [`DataResponse`] made of named frames.
//! Data reads produce one frame with a `Time` and a `Value` column; event
//! reads produce one frame with a column per selected event field.
//!
//! ```text
//! QueryDataResponse
//! ├── responses: refId -> Ok(DataResponse) | Err(StatusError)
//! │                       └── frames: [Frame]
//! │                                   └── fields: [Field { name, type, values }]
//! └── connection_error: Option<StatusError>
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use uaq_opcua::{DataValue, EventResults, HistoryValues, NodeId, OpcUaValue, StatusError};

use crate::query::{OpcUaQuery, QueryResult};

// =============================================================================
// Frames
// =============================================================================

/// Column type of a frame field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Timestamps in epoch milliseconds.
    Time,
    /// Numbers.
    Number,
    /// Strings.
    String,
    /// Booleans.
    Boolean,
    /// Anything else.
    Other,
}

impl FieldType {
    /// Infers the column type from a sample value.
    pub fn of(value: &OpcUaValue) -> Self {
        match value {
            OpcUaValue::Boolean(_) => Self::Boolean,
            OpcUaValue::DateTime(_) => Self::Time,
            OpcUaValue::String(_) | OpcUaValue::NodeId(_) | OpcUaValue::Guid(_) => Self::String,
            v if v.is_numeric() => Self::Number,
            _ => Self::Other,
        }
    }
}

/// One column of a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Column name.
    pub name: String,

    /// Column type.
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Column values.
    pub values: Vec<Value>,
}

impl Field {
    /// Creates an empty field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            values: Vec::new(),
        }
    }

    /// Sets the values.
    pub fn with_values(mut self, values: Vec<Value>) -> Self {
        self.values = values;
        self
    }
}

/// A named table of equally long fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Frame name.
    pub name: String,

    /// Reference id of the query that produced the frame.
    pub ref_id: String,

    /// Columns.
    pub fields: Vec<Field>,
}

impl Frame {
    /// Creates an empty frame.
    pub fn new(name: impl Into<String>, ref_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ref_id: ref_id.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.fields.first().map(|f| f.values.len()).unwrap_or(0)
    }

    /// Returns the field named `name`.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Successful result of one query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataResponse {
    /// Frames.
    pub frames: Vec<Frame>,
}

impl DataResponse {
    /// Creates a response with a single frame.
    pub fn single(frame: Frame) -> Self {
        Self {
            frames: vec![frame],
        }
    }

    /// Returns the first frame.
    pub fn frame(&self) -> Option<&Frame> {
        self.frames.first()
    }
}

// =============================================================================
// Builders
// =============================================================================

fn time_value(timestamp: Option<DateTime<Utc>>) -> Value {
    timestamp.map_or(Value::Null, |t| json!(t.timestamp_millis()))
}

fn value_frame(values: &[DataValue], node_id: &str, query: &OpcUaQuery) -> Frame {
    let field_type = values
        .iter()
        .map(|dv| &dv.value)
        .find(|v| !v.is_null())
        .map(FieldType::of)
        .unwrap_or(FieldType::Number);

    let times = values.iter().map(|dv| time_value(dv.timestamp())).collect();
    let data = values.iter().map(|dv| dv.value.to_json()).collect();

    Frame::new(node_id, &query.ref_id)
        .with_field(Field::new("Time", FieldType::Time).with_values(times))
        .with_field(Field::new("Value", field_type).with_values(data))
}

/// Builds the response for a point read.
///
/// A bad status becomes a per-query error.
pub fn data_value_response(
    value: &DataValue,
    node_id: &NodeId,
    query: &OpcUaQuery,
) -> QueryResult<DataResponse> {
    if value.is_bad() {
        return Err(StatusError::new(
            value.status,
            format!("Bad status reading node {}", node_id),
        ));
    }
    Ok(DataResponse::single(value_frame(
        std::slice::from_ref(value),
        &node_id.to_opc_string(),
        query,
    )))
}

/// Builds the response for one node's history read.
///
/// A bad per-node status becomes a per-query error.
pub fn history_response(history: &HistoryValues, query: &OpcUaQuery) -> QueryResult<DataResponse> {
    if history.status.is_bad() {
        return Err(StatusError::new(
            history.status,
            format!("History read failed for query {}", query.ref_id),
        ));
    }
    Ok(DataResponse::single(value_frame(
        &history.values,
        &query.ref_id,
        query,
    )))
}

/// Builds the response for one notifier's events.
///
/// Columns follow the query's event columns; each event row holds one value
/// per column.
pub fn event_response(results: &EventResults, query: &OpcUaQuery) -> QueryResult<DataResponse> {
    if results.status.is_bad() {
        return Err(StatusError::new(
            results.status,
            format!("Event read failed for query {}", query.ref_id),
        ));
    }

    let columns = query
        .event_query
        .as_ref()
        .map(|q| q.event_columns.as_slice())
        .unwrap_or_default();

    let mut frame = Frame::new("Events", &query.ref_id);
    for (i, column) in columns.iter().enumerate() {
        let field_type = results
            .events
            .iter()
            .filter_map(|row| row.get(i))
            .find(|v| !v.is_null())
            .map(FieldType::of)
            .unwrap_or(FieldType::Other);
        let values = results
            .events
            .iter()
            .map(|row| row.get(i).map_or(Value::Null, OpcUaValue::to_json))
            .collect();
        frame = frame.with_field(Field::new(column.display_name(), field_type).with_values(values));
    }
    Ok(DataResponse::single(frame))
}

// =============================================================================
// QueryDataResponse
// =============================================================================

/// Aggregated response to a request, keyed by `refId`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryDataResponse {
    /// Per-query outcomes.
    pub responses: BTreeMap<String, QueryResult<DataResponse>>,

    /// Failure that prevented dispatch altogether.
    pub connection_error: Option<StatusError>,
}

impl QueryDataResponse {
    /// Creates an empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of a query, replacing any earlier entry for the
    /// same `ref_id`.
    pub fn insert(&mut self, ref_id: impl Into<String>, result: QueryResult<DataResponse>) {
        self.responses.insert(ref_id.into(), result);
    }

    /// Returns the outcome for `ref_id`.
    pub fn get(&self, ref_id: &str) -> Option<&QueryResult<DataResponse>> {
        self.responses.get(ref_id)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Returns `true` if no entry was written.
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Returns the number of failed entries.
    pub fn error_count(&self) -> usize {
        self.responses.values().filter(|r| r.is_err()).count()
    }

    /// Renders the response as JSON.
    ///
    /// ```text
    /// { "responses": { "A": { "frames": [..] },
    ///                  "B": { "error": "..", "status": 2150891520, "statusName": "BadNodeIdUnknown" } },
    ///   "connectionError": null }
    /// ```
    pub fn to_json(&self) -> Value {
        let responses: serde_json::Map<String, Value> = self
            .responses
            .iter()
            .map(|(ref_id, result)| {
                let entry = match result {
                    Ok(response) => json!({ "frames": response.frames }),
                    Err(error) => error_json(error),
                };
                (ref_id.clone(), entry)
            })
            .collect();

        json!({
            "responses": responses,
            "connectionError": self.connection_error.as_ref().map(error_json),
        })
    }
}

fn error_json(error: &StatusError) -> Value {
    json!({
        "error": error.message,
        "status": error.status.value(),
        "statusName": error.status.name(),
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{EventColumn, EventQuery};
    use uaq_opcua::{PortableQualifiedName, StatusCode};

    fn ts(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn test_data_value_response() {
        let query = OpcUaQuery::new("A", "ReadNode", "i=2258");
        let value = DataValue::at(OpcUaValue::Double(21.5), ts(1_000));
        let response = data_value_response(&value, &NodeId::numeric(0, 2258), &query).unwrap();

        let frame = response.frame().unwrap();
        assert_eq!(frame.name, "i=2258");
        assert_eq!(frame.ref_id, "A");
        assert_eq!(frame.row_count(), 1);
        assert_eq!(frame.field("Time").unwrap().values[0], json!(1_000));
        assert_eq!(frame.field("Value").unwrap().field_type, FieldType::Number);
    }

    #[test]
    fn test_bad_status_becomes_error() {
        let query = OpcUaQuery::new("A", "ReadNode", "i=1");
        let value = DataValue::bad(StatusCode::BAD_NODE_ID_UNKNOWN);
        let err = data_value_response(&value, &NodeId::numeric(0, 1), &query).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_NODE_ID_UNKNOWN);

        let history = HistoryValues::bad(StatusCode::BAD_NO_DATA);
        assert_eq!(
            history_response(&history, &query).unwrap_err().status,
            StatusCode::BAD_NO_DATA
        );
    }

    #[test]
    fn test_history_response_rows() {
        let query = OpcUaQuery::new("B", "ReadDataRaw", "i=1");
        let history = HistoryValues::new(vec![
            DataValue::at(OpcUaValue::Int32(1), ts(0)),
            DataValue::at(OpcUaValue::Int32(2), ts(500)),
        ]);
        let response = history_response(&history, &query).unwrap();
        let frame = response.frame().unwrap();
        assert_eq!(frame.row_count(), 2);
        assert_eq!(frame.field("Value").unwrap().values, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_event_response_columns() {
        let query = OpcUaQuery::new("E", "ReadEvents", "i=2253").with_event_query(EventQuery {
            event_columns: vec![
                EventColumn::new(vec![PortableQualifiedName::standard("Time")]),
                EventColumn::new(vec![PortableQualifiedName::standard("Message")])
                    .with_alias("Text"),
            ],
            event_filters: vec![],
        });
        let results = EventResults::new(vec![
            vec![OpcUaValue::DateTime(ts(10)), OpcUaValue::String("start".into())],
            vec![OpcUaValue::DateTime(ts(20))],
        ]);
        let response = event_response(&results, &query).unwrap();
        let frame = response.frame().unwrap();

        let names: Vec<&str> = frame.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Time", "Text"]);
        assert_eq!(frame.fields[0].field_type, FieldType::Time);
        assert_eq!(frame.fields[1].values, vec![json!("start"), Value::Null]);
    }

    #[test]
    fn test_response_json() {
        let mut response = QueryDataResponse::new();
        response.insert("A", Ok(DataResponse::default()));
        response.insert(
            "B",
            Err(StatusError::new(StatusCode::BAD_NODE_ID_UNKNOWN, "missing")),
        );
        assert_eq!(response.len(), 2);
        assert_eq!(response.error_count(), 1);

        let json = response.to_json();
        assert_eq!(json["responses"]["A"]["frames"], json!([]));
        assert_eq!(json["responses"]["B"]["error"], "missing");
        assert_eq!(json["responses"]["B"]["statusName"], "BadNodeIdUnknown");
        assert!(json["connectionError"].is_null());
    }
}
