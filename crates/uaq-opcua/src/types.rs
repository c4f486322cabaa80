// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core OPC UA types used by the query layer.
//!
//! - **NodeId**: All four OPC UA node identifier types with parsing
//! - **NodeClass / AttributeId**: Address space enumerations
//! - **StatusCode**: OPC UA status codes with severity helpers
//! - **StatusError**: Status/message pair attached to failed queries
//!
//! # Examples
//!
//! ```
//! use uaq_opcua::types::{NodeId, StatusCode};
//!
//! let node_id: NodeId = "ns=2;s=Boiler.Temperature".parse().unwrap();
//! assert_eq!(node_id.namespace_index, 2);
//!
//! assert!(StatusCode::BAD_NODE_ID_UNKNOWN.is_bad());
//! ```

use std::fmt;
use std::str::FromStr;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BrowseError, OpcUaError};

// =============================================================================
// NodeId
// =============================================================================

/// OPC UA Node Identifier.
///
/// A NodeId uniquely identifies a node within an OPC UA server session.
/// The namespace index is only meaningful against that session's namespace
/// table; use [`crate::codec`] to move node ids across sessions.
///
/// # Examples
///
/// ```
/// use uaq_opcua::types::NodeId;
///
/// let numeric = NodeId::numeric(2, 1001);
/// let string = NodeId::string(2, "MyDevice.Temperature");
///
/// let parsed: NodeId = "ns=2;s=MyDevice.Temperature".parse().unwrap();
/// assert_eq!(parsed, string);
/// assert_eq!(numeric.to_opc_string(), "ns=2;i=1001");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 = OPC UA standard namespace).
    pub namespace_index: u16,

    /// The node identifier.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates a node ID from its parts.
    #[inline]
    pub fn new(namespace_index: u16, identifier: NodeIdentifier) -> Self {
        Self {
            namespace_index,
            identifier,
        }
    }

    /// Creates a numeric node ID.
    #[inline]
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self::new(namespace_index, NodeIdentifier::Numeric(value))
    }

    /// Creates a string node ID.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self::new(namespace_index, NodeIdentifier::String(value.into()))
    }

    /// Creates a GUID node ID.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self::new(namespace_index, NodeIdentifier::Guid(value))
    }

    /// Creates an opaque (byte string) node ID.
    #[inline]
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self::new(namespace_index, NodeIdentifier::Opaque(value))
    }

    // =========================================================================
    // Standard Node IDs
    // =========================================================================

    /// Root folder node (ns=0, i=84).
    pub const ROOT_FOLDER: NodeId = NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(84),
    };

    /// Objects folder node (ns=0, i=85).
    pub const OBJECTS_FOLDER: NodeId = NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(85),
    };

    /// NodeId data type (ns=0, i=17).
    ///
    /// A literal operand declared with this type carries a node id.
    pub const NODE_ID_DATA_TYPE: NodeId = NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(17),
    };

    /// BaseEventType (ns=0, i=2041).
    pub const BASE_EVENT_TYPE: NodeId = NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(2041),
    };

    /// Server node (ns=0, i=2253).
    pub const SERVER: NodeId = NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(2253),
    };

    // =========================================================================
    // Properties
    // =========================================================================

    /// Returns `true` if this is a numeric identifier.
    #[inline]
    pub const fn is_numeric(&self) -> bool {
        matches!(self.identifier, NodeIdentifier::Numeric(_))
    }

    /// Returns `true` if this is a string identifier.
    #[inline]
    pub const fn is_string(&self) -> bool {
        matches!(self.identifier, NodeIdentifier::String(_))
    }

    /// Returns `true` if this is in the standard namespace (ns=0).
    #[inline]
    pub const fn is_standard(&self) -> bool {
        self.namespace_index == 0
    }

    /// Returns `true` if this is a null node ID (ns=0, i=0).
    #[inline]
    pub fn is_null(&self) -> bool {
        self.namespace_index == 0 && matches!(self.identifier, NodeIdentifier::Numeric(0))
    }

    /// Returns the null node ID (ns=0, i=0).
    #[inline]
    pub const fn null() -> Self {
        Self {
            namespace_index: 0,
            identifier: NodeIdentifier::Numeric(0),
        }
    }

    /// Returns the numeric value if this is a numeric identifier.
    #[inline]
    pub fn as_numeric(&self) -> Option<u32> {
        match &self.identifier {
            NodeIdentifier::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string value if this is a string identifier.
    #[inline]
    pub fn as_string(&self) -> Option<&str> {
        match &self.identifier {
            NodeIdentifier::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a copy of this node id moved to another namespace index.
    pub fn with_namespace(&self, namespace_index: u16) -> Self {
        Self::new(namespace_index, self.identifier.clone())
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    /// Converts to the OPC UA string format.
    ///
    /// Format: `ns=<namespace>;{i|s|g|b}=<identifier>`, with the `ns=` part
    /// omitted for namespace 0.
    pub fn to_opc_string(&self) -> String {
        if self.namespace_index == 0 {
            self.identifier.to_string()
        } else {
            format!("ns={};{}", self.namespace_index, self.identifier)
        }
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_opc_string())
    }
}

impl FromStr for NodeId {
    type Err = OpcUaError;

    /// Parses a NodeId from OPC UA string format.
    ///
    /// Supported formats:
    /// - `ns=2;i=1001` (numeric)
    /// - `ns=2;s=MyNode` (string)
    /// - `ns=2;g=550e8400-e29b-41d4-a716-446655440000` (GUID)
    /// - `ns=2;b=SGVsbG8=` (opaque, base64 encoded)
    /// - `i=1001` (numeric, namespace 0)
    ///
    /// Leading whitespace is skipped; a string identifier keeps everything
    /// after `s=`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_start();

        let (namespace_index, identifier_part) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let Some((ns_str, identifier)) = rest.split_once(';') else {
                    return Err(invalid(s, "Missing identifier after namespace"));
                };
                let ns: u16 = ns_str
                    .parse()
                    .map_err(|_| invalid(s, "Invalid namespace index"))?;
                (ns, identifier)
            }
            None => (0, s),
        };

        let identifier = NodeIdentifier::parse(identifier_part).map_err(|reason| invalid(s, reason))?;

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

fn invalid(node_id: &str, reason: impl Into<String>) -> OpcUaError {
    OpcUaError::browse(BrowseError::invalid_node_id(node_id, reason))
}

// =============================================================================
// NodeIdentifier
// =============================================================================

/// OPC UA node identifier types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum NodeIdentifier {
    /// Numeric identifier.
    Numeric(u32),

    /// String identifier.
    String(String),

    /// GUID identifier.
    Guid(Uuid),

    /// Opaque identifier (application-specific byte array).
    Opaque(Vec<u8>),
}

impl NodeIdentifier {
    /// Returns the identifier type prefix for OPC UA string format.
    pub const fn type_prefix(&self) -> char {
        match self {
            Self::Numeric(_) => 'i',
            Self::String(_) => 's',
            Self::Guid(_) => 'g',
            Self::Opaque(_) => 'b',
        }
    }

    /// Parses the identifier part of a node id (`i=`, `s=`, `g=` or `b=`).
    ///
    /// Returns the failure reason on error.
    pub fn parse(s: &str) -> Result<Self, String> {
        if let Some(id) = s.strip_prefix("i=") {
            id.trim_end()
                .parse::<u32>()
                .map(Self::Numeric)
                .map_err(|_| "Invalid numeric identifier".to_string())
        } else if let Some(id) = s.strip_prefix("s=") {
            Ok(Self::String(id.to_string()))
        } else if let Some(id) = s.strip_prefix("g=") {
            Uuid::parse_str(id)
                .map(Self::Guid)
                .map_err(|e| format!("Invalid GUID: {}", e))
        } else if let Some(id) = s.strip_prefix("b=") {
            BASE64
                .decode(id)
                .map(Self::Opaque)
                .map_err(|e| format!("Invalid base64: {}", e))
        } else {
            Err("Unknown identifier type. Expected i=, s=, g=, or b=".to_string())
        }
    }

    /// Returns `true` if `s` begins with an identifier type prefix.
    pub fn has_type_prefix(s: &str) -> bool {
        ["i=", "s=", "g=", "b="].iter().any(|p| s.starts_with(p))
    }
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={}", v),
            Self::String(v) => write!(f, "s={}", v),
            Self::Guid(v) => write!(f, "g={}", v),
            Self::Opaque(v) => write!(f, "b={}", BASE64.encode(v)),
        }
    }
}

// =============================================================================
// NodeClass
// =============================================================================

/// OPC UA node class, numbered by its `NodeClass` mask bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum NodeClass {
    /// Folders, devices and other containers.
    Object = 1,
    /// Anything with a value; the only class the read services target.
    Variable = 2,
    /// Callable method.
    Method = 4,
    /// Object type definition.
    ObjectType = 8,
    /// Variable type definition.
    VariableType = 16,
    /// Reference type definition.
    ReferenceType = 32,
    /// Data type definition.
    DataType = 64,
    /// View over the address space.
    View = 128,
}

impl NodeClass {
    /// Returns the mask bit sent in browse results.
    pub const fn value(self) -> u32 {
        self as u32
    }
}

// =============================================================================
// AttributeId
// =============================================================================

/// OPC UA attribute IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttributeId {
    /// Node ID attribute.
    NodeId,
    /// Node class attribute.
    NodeClass,
    /// Browse name attribute.
    BrowseName,
    /// Display name attribute.
    DisplayName,
    /// Description attribute.
    Description,
    /// Event notifier attribute.
    EventNotifier,
    /// Value attribute.
    #[default]
    Value,
    /// Data type attribute.
    DataType,
}

impl AttributeId {
    /// Returns the OPC UA numeric value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::NodeId => 1,
            Self::NodeClass => 2,
            Self::BrowseName => 3,
            Self::DisplayName => 4,
            Self::Description => 5,
            Self::EventNotifier => 12,
            Self::Value => 13,
            Self::DataType => 14,
        }
    }
}

// =============================================================================
// StatusCode
// =============================================================================

/// OPC UA status code.
///
/// The top two bits carry severity: `00` good, `01` uncertain, `10` bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    /// Good.
    pub const GOOD: Self = Self(0x0000_0000);
    /// An unexpected error occurred.
    pub const BAD_UNEXPECTED_ERROR: Self = Self(0x8001_0000);
    /// An internal error occurred.
    pub const BAD_INTERNAL_ERROR: Self = Self(0x8002_0000);
    /// A low level communication error occurred.
    pub const BAD_COMMUNICATION_ERROR: Self = Self(0x8005_0000);
    /// Decoding halted because of invalid data in the stream.
    pub const BAD_DECODING_ERROR: Self = Self(0x8007_0000);
    /// An unrecognized response was received.
    pub const BAD_UNKNOWN_RESPONSE: Self = Self(0x8009_0000);
    /// The operation timed out.
    pub const BAD_TIMEOUT: Self = Self(0x800A_0000);
    /// The operation could not complete because the client is not connected.
    pub const BAD_SERVER_NOT_CONNECTED: Self = Self(0x800D_0000);
    /// There was nothing to do because the client passed a list of operations
    /// with no elements.
    pub const BAD_NOTHING_TO_DO: Self = Self(0x800F_0000);
    /// The session was closed by the client.
    pub const BAD_SESSION_CLOSED: Self = Self(0x8026_0000);
    /// The syntax of the node id is not valid.
    pub const BAD_NODE_ID_INVALID: Self = Self(0x8033_0000);
    /// The node id refers to a node that does not exist.
    pub const BAD_NODE_ID_UNKNOWN: Self = Self(0x8034_0000);
    /// The value was out of range.
    pub const BAD_OUT_OF_RANGE: Self = Self(0x803C_0000);
    /// The requested operation is not supported.
    pub const BAD_NOT_SUPPORTED: Self = Self(0x803D_0000);
    /// A requested item was not found.
    pub const BAD_NOT_FOUND: Self = Self(0x803E_0000);
    /// The event filter is not valid.
    pub const BAD_EVENT_FILTER_INVALID: Self = Self(0x8047_0000);
    /// The content filter is not valid.
    pub const BAD_CONTENT_FILTER_INVALID: Self = Self(0x8048_0000);
    /// The operand used in a content filter is not valid.
    pub const BAD_FILTER_OPERAND_INVALID: Self = Self(0x8049_0000);
    /// The browse name is invalid.
    pub const BAD_BROWSE_NAME_INVALID: Self = Self(0x8060_0000);
    /// The server does not support the requested history operation.
    pub const BAD_HISTORY_OPERATION_UNSUPPORTED: Self = Self(0x8072_0000);
    /// The value supplied for the attribute is not of the same type.
    pub const BAD_TYPE_MISMATCH: Self = Self(0x8074_0000);
    /// No data exists for the requested time range or event filter.
    pub const BAD_NO_DATA: Self = Self(0x809B_0000);
    /// The requested aggregate is not supported by the server.
    pub const BAD_AGGREGATE_NOT_SUPPORTED: Self = Self(0x80D5_0000);

    /// Returns the raw status code value.
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Returns `true` if the severity is good.
    #[inline]
    pub const fn is_good(&self) -> bool {
        self.0 & 0xC000_0000 == 0
    }

    /// Returns `true` if the severity is uncertain.
    #[inline]
    pub const fn is_uncertain(&self) -> bool {
        self.0 & 0xC000_0000 == 0x4000_0000
    }

    /// Returns `true` if the severity is bad.
    #[inline]
    pub const fn is_bad(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Returns the symbolic name of a well-known status code.
    pub fn name(&self) -> &'static str {
        match *self {
            Self::GOOD => "Good",
            Self::BAD_UNEXPECTED_ERROR => "BadUnexpectedError",
            Self::BAD_INTERNAL_ERROR => "BadInternalError",
            Self::BAD_COMMUNICATION_ERROR => "BadCommunicationError",
            Self::BAD_DECODING_ERROR => "BadDecodingError",
            Self::BAD_UNKNOWN_RESPONSE => "BadUnknownResponse",
            Self::BAD_TIMEOUT => "BadTimeout",
            Self::BAD_SERVER_NOT_CONNECTED => "BadServerNotConnected",
            Self::BAD_NOTHING_TO_DO => "BadNothingToDo",
            Self::BAD_SESSION_CLOSED => "BadSessionClosed",
            Self::BAD_NODE_ID_INVALID => "BadNodeIdInvalid",
            Self::BAD_NODE_ID_UNKNOWN => "BadNodeIdUnknown",
            Self::BAD_OUT_OF_RANGE => "BadOutOfRange",
            Self::BAD_NOT_SUPPORTED => "BadNotSupported",
            Self::BAD_NOT_FOUND => "BadNotFound",
            Self::BAD_EVENT_FILTER_INVALID => "BadEventFilterInvalid",
            Self::BAD_CONTENT_FILTER_INVALID => "BadContentFilterInvalid",
            Self::BAD_FILTER_OPERAND_INVALID => "BadFilterOperandInvalid",
            Self::BAD_BROWSE_NAME_INVALID => "BadBrowseNameInvalid",
            Self::BAD_HISTORY_OPERATION_UNSUPPORTED => "BadHistoryOperationUnsupported",
            Self::BAD_TYPE_MISMATCH => "BadTypeMismatch",
            Self::BAD_NO_DATA => "BadNoData",
            Self::BAD_AGGREGATE_NOT_SUPPORTED => "BadAggregateNotSupported",
            _ if self.is_good() => "Good",
            _ if self.is_uncertain() => "Uncertain",
            _ => "Bad",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:08X})", self.name(), self.0)
    }
}

impl From<u32> for StatusCode {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

// =============================================================================
// StatusError
// =============================================================================

/// Failure outcome attached to a single query: a status code and a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusError {
    /// Status code.
    pub status: StatusCode,
    /// Human-readable message.
    pub message: String,
}

impl StatusError {
    /// Creates a new status error.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for StatusError {}

// =============================================================================
// Tests
// =============================================================================
