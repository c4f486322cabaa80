// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Values returned by session and subscription calls.

use std::cmp::Ordering;
use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};

use crate::types::{NodeId, StatusCode};

// =============================================================================
// OpcUaValue
// =============================================================================

/// OPC UA variant value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OpcUaValue {
    /// Boolean value.
    Boolean(bool),

    /// Signed byte.
    SByte(i8),

    /// Unsigned byte.
    Byte(u8),

    /// 16-bit signed integer.
    Int16(i16),

    /// 16-bit unsigned integer.
    UInt16(u16),

    /// 32-bit signed integer.
    Int32(i32),

    /// 32-bit unsigned integer.
    UInt32(u32),

    /// 64-bit signed integer.
    Int64(i64),

    /// 64-bit unsigned integer.
    UInt64(u64),

    /// 32-bit float.
    Float(f32),

    /// 64-bit double.
    Double(f64),

    /// String value.
    String(String),

    /// Date/time value.
    DateTime(DateTime<Utc>),

    /// GUID value.
    Guid(uuid::Uuid),

    /// Byte string.
    ByteString(Vec<u8>),

    /// Node id value.
    NodeId(NodeId),

    /// Array of values.
    Array(Vec<OpcUaValue>),

    /// Null value.
    #[default]
    Null,
}

impl OpcUaValue {
    /// Returns the variant type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "Boolean",
            Self::SByte(_) => "SByte",
            Self::Byte(_) => "Byte",
            Self::Int16(_) => "Int16",
            Self::UInt16(_) => "UInt16",
            Self::Int32(_) => "Int32",
            Self::UInt32(_) => "UInt32",
            Self::Int64(_) => "Int64",
            Self::UInt64(_) => "UInt64",
            Self::Float(_) => "Float",
            Self::Double(_) => "Double",
            Self::String(_) => "String",
            Self::DateTime(_) => "DateTime",
            Self::Guid(_) => "Guid",
            Self::ByteString(_) => "ByteString",
            Self::NodeId(_) => "NodeId",
            Self::Array(_) => "Array",
            Self::Null => "Null",
        }
    }

    /// Returns `true` if this is a null value.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` if this value has a numeric representation.
    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some() && !matches!(self, Self::Boolean(_))
    }

    /// Attempts to get the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            Self::SByte(v) => Some(*v != 0),
            Self::Byte(v) => Some(*v != 0),
            Self::Int16(v) => Some(*v != 0),
            Self::UInt16(v) => Some(*v != 0),
            Self::Int32(v) => Some(*v != 0),
            Self::UInt32(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Attempts to get the value as an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Boolean(v) => Some(i64::from(*v)),
            Self::SByte(v) => Some(*v as i64),
            Self::Byte(v) => Some(*v as i64),
            Self::Int16(v) => Some(*v as i64),
            Self::UInt16(v) => Some(*v as i64),
            Self::Int32(v) => Some(*v as i64),
            Self::UInt32(v) => Some(*v as i64),
            Self::Int64(v) => Some(*v),
            Self::UInt64(v) => i64::try_from(*v).ok(),
            Self::Float(v) => Some(*v as i64),
            Self::Double(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Attempts to get the value as an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            Self::SByte(v) => Some(*v as f64),
            Self::Byte(v) => Some(*v as f64),
            Self::Int16(v) => Some(*v as f64),
            Self::UInt16(v) => Some(*v as f64),
            Self::Int32(v) => Some(*v as f64),
            Self::UInt32(v) => Some(*v as f64),
            Self::Int64(v) => Some(*v as f64),
            Self::UInt64(v) => Some(*v as f64),
            Self::Float(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to get the value as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Compares two values for filtering.
    ///
    /// Numbers compare numerically across widths. A string compared with a
    /// number is parsed first, since literal operands arrive as strings.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::DateTime(a), Self::DateTime(b)) => Some(a.cmp(b)),
            (Self::NodeId(a), Self::NodeId(b)) => (a == b).then_some(Ordering::Equal),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::String(s), n) if n.is_numeric() => s.trim().parse::<f64>().ok()?.partial_cmp(&n.as_f64()?),
            (n, Self::String(s)) if n.is_numeric() => n.as_f64()?.partial_cmp(&s.trim().parse::<f64>().ok()?),
            (Self::String(s), Self::NodeId(n)) | (Self::NodeId(n), Self::String(s)) => {
                (s.trim() == n.to_opc_string()).then_some(Ordering::Equal)
            }
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }

    /// Converts to a JSON value for response frames.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Self::Boolean(v) => Value::Bool(*v),
            Self::SByte(v) => Value::from(*v),
            Self::Byte(v) => Value::from(*v),
            Self::Int16(v) => Value::from(*v),
            Self::UInt16(v) => Value::from(*v),
            Self::Int32(v) => Value::from(*v),
            Self::UInt32(v) => Value::from(*v),
            Self::Int64(v) => Value::from(*v),
            Self::UInt64(v) => Value::from(*v),
            Self::Float(v) => Value::from(*v as f64),
            Self::Double(v) => Value::from(*v),
            Self::String(v) => Value::String(v.clone()),
            Self::DateTime(v) => Value::String(v.to_rfc3339()),
            Self::Guid(v) => Value::String(v.to_string()),
            Self::ByteString(v) => Value::String(BASE64.encode(v)),
            Self::NodeId(v) => Value::String(v.to_opc_string()),
            Self::Array(v) => Value::Array(v.iter().map(Self::to_json).collect()),
            Self::Null => Value::Null,
        }
    }

    /// Builds a value from JSON fixture data.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(v) => Self::Boolean(*v),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Self::Int64(i),
                (None, Some(f)) => Self::Double(f),
                (None, None) => Self::Null,
            },
            Value::String(s) => Self::String(s.clone()),
            Value::Array(items) => Self::Array(items.iter().map(Self::from_json).collect()),
            Value::Object(_) => Self::String(value.to_string()),
        }
    }
}

impl fmt::Display for OpcUaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{}", v),
            Self::SByte(v) => write!(f, "{}", v),
            Self::Byte(v) => write!(f, "{}", v),
            Self::Int16(v) => write!(f, "{}", v),
            Self::UInt16(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::UInt64(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
            Self::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Guid(v) => write!(f, "{}", v),
            Self::ByteString(v) => write!(f, "<{} bytes>", v.len()),
            Self::NodeId(v) => write!(f, "{}", v),
            Self::Array(v) => write!(f, "[{} items]", v.len()),
            Self::Null => write!(f, "null"),
        }
    }
}

// =============================================================================
// DataValue
// =============================================================================

/// A value with its status and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct DataValue {
    /// The value.
    pub value: OpcUaValue,

    /// Status code of the value.
    pub status: StatusCode,

    /// Source timestamp.
    pub source_timestamp: Option<DateTime<Utc>>,

    /// Server timestamp.
    pub server_timestamp: Option<DateTime<Utc>>,
}

impl DataValue {
    /// Creates a good data value stamped now.
    pub fn new(value: OpcUaValue) -> Self {
        let now = Utc::now();
        Self {
            value,
            status: StatusCode::GOOD,
            source_timestamp: Some(now),
            server_timestamp: Some(now),
        }
    }

    /// Creates a good data value with a source timestamp.
    pub fn at(value: OpcUaValue, timestamp: DateTime<Utc>) -> Self {
        Self {
            value,
            status: StatusCode::GOOD,
            source_timestamp: Some(timestamp),
            server_timestamp: Some(timestamp),
        }
    }

    /// Creates a value-less data value carrying a status.
    pub fn bad(status: StatusCode) -> Self {
        Self {
            value: OpcUaValue::Null,
            status,
            source_timestamp: None,
            server_timestamp: Some(Utc::now()),
        }
    }

    /// Returns the best available timestamp.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.source_timestamp.or(self.server_timestamp)
    }

    /// Returns `true` if the status is good.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }

    /// Returns `true` if the status is bad.
    #[inline]
    pub fn is_bad(&self) -> bool {
        self.status.is_bad()
    }
}

// =============================================================================
// History / Event Results
// =============================================================================

/// History read result for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryValues {
    /// Per-node status.
    pub status: StatusCode,

    /// Values in time order.
    pub values: Vec<DataValue>,
}

impl HistoryValues {
    /// Creates a good result.
    pub fn new(values: Vec<DataValue>) -> Self {
        Self {
            status: StatusCode::GOOD,
            values,
        }
    }

    /// Creates a failed result.
    pub fn bad(status: StatusCode) -> Self {
        Self {
            status,
            values: Vec::new(),
        }
    }
}

/// Selected fields of one event, in select clause order.
pub type EventFields = Vec<OpcUaValue>;

/// Event read result for one notifier node.
#[derive(Debug, Clone, PartialEq)]
pub struct EventResults {
    /// Per-node status.
    pub status: StatusCode,

    /// Matching events.
    pub events: Vec<EventFields>,
}

impl EventResults {
    /// Creates a good result.
    pub fn new(events: Vec<EventFields>) -> Self {
        Self {
            status: StatusCode::GOOD,
            events,
        }
    }

    /// Creates a failed result.
    pub fn bad(status: StatusCode) -> Self {
        Self {
            status,
            events: Vec::new(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        assert_eq!(OpcUaValue::Boolean(true).as_bool(), Some(true));
        assert_eq!(OpcUaValue::Int32(42).as_i64(), Some(42));
        assert_eq!(OpcUaValue::Double(2.5).as_f64(), Some(2.5));
        assert!(OpcUaValue::Null.is_null());
        assert_eq!(OpcUaValue::String("x".into()).as_str(), Some("x"));
    }

    #[test]
    fn test_value_compare() {
        let ten = OpcUaValue::Int32(10);
        assert_eq!(ten.compare(&OpcUaValue::Double(10.0)), Some(Ordering::Equal));
        assert_eq!(ten.compare(&OpcUaValue::String("5".into())), Some(Ordering::Greater));
        assert_eq!(ten.compare(&OpcUaValue::String("abc".into())), None);
        assert_eq!(
            OpcUaValue::NodeId(NodeId::numeric(2, 1)).compare(&OpcUaValue::String("ns=2;i=1".into())),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_value_json() {
        assert_eq!(OpcUaValue::Int16(-3).to_json(), serde_json::json!(-3));
        assert_eq!(
            OpcUaValue::NodeId(NodeId::numeric(2, 7)).to_json(),
            serde_json::json!("ns=2;i=7")
        );
        assert_eq!(
            OpcUaValue::from_json(&serde_json::json!([1, 2.5, "a", null])),
            OpcUaValue::Array(vec![
                OpcUaValue::Int64(1),
                OpcUaValue::Double(2.5),
                OpcUaValue::String("a".into()),
                OpcUaValue::Null,
            ])
        );
    }

    #[test]
    fn test_data_value_status() {
        let dv = DataValue::new(OpcUaValue::Double(1.0));
        assert!(dv.is_good());
        assert!(dv.timestamp().is_some());

        let bad = DataValue::bad(StatusCode::BAD_NODE_ID_UNKNOWN);
        assert!(bad.is_bad());
        assert!(bad.value.is_null());
    }
}
