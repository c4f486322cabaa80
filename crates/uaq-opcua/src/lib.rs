// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA protocol model for UAQ.
//!
//! This crate holds everything the query layer needs to know about OPC UA
//! without owning a wire connection:
//!
//! - Node ids, qualified names and status codes
//! - Namespace-portable encodings of node ids and browse names
//! - The native event filter model
//! - The [`OpcUaSession`] abstraction and an in-memory implementation
//!
//! # Error Handling
//!
//! ```text
//! OpcUaError
//! ├── Connection    - Connection acquisition issues
//! ├── Session       - Session service failures
//! ├── Filter        - Event filter construction errors
//! ├── Browse        - NodeId / QualifiedName / namespace resolution
//! ├── Operation     - Read and history failures
//! ├── Subscription  - Subscription errors
//! ├── Conversion    - Payload conversion errors
//! └── Configuration - Invalid query settings
//! ```
//!
//! Every error reduces to a [`StatusError`] (status code + message).
//!
//! # Example
//!
//! ```
//! use uaq_opcua::{NamespaceTable, NodeId, decode_node_id, encode_node_id};
//!
//! let server_a = NamespaceTable::from_uris(["urn:server", "urn:plant"]);
//! let server_b = NamespaceTable::from_uris(["urn:plant"]);
//!
//! let stored = encode_node_id(&NodeId::string(2, "Pump1.Speed"), &server_a).unwrap();
//! let node_id = decode_node_id(&stored, &server_b).unwrap();
//! assert_eq!(node_id, NodeId::string(1, "Pump1.Speed"));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod browse;
pub mod client;
pub mod codec;
pub mod error;
pub mod filter;
pub mod namespace;
pub mod types;

// Re-export commonly used types
pub use error::{
    BrowseError, ConfigurationError, ConnectionError, ConversionError, ErrorCode, ErrorSeverity,
    FilterError, OpcUaError, OpcUaResult, OperationError, SessionError,
    SubscriptionError,
};

pub use types::{AttributeId, NodeClass, NodeId, NodeIdentifier, StatusCode, StatusError};

pub use namespace::{
    INVALID_NAMESPACE_INDEX, NamespaceResolver, NamespaceTable, OPC_UA_NAMESPACE_URI,
};

pub use codec::{PortableNodeId, decode_node_id, encode_node_id, node_id_to_json, try_parse_tagged};

pub use browse::{
    BrowseEntry, BrowseNode, NodeInfo, PortableQualifiedName, QualifiedName,
    browse_path_to_native, browse_path_to_portable,
};

pub use filter::{
    ContentFilter, ContentFilterElement, EventFilter, FilterOperand, FilterOperator,
    SimpleAttributeOperand,
};

// Re-export client types
pub use client::{
    Aggregate, DataValue, EventFields, EventResults, HistoryValues, MemoryEvent, MemoryServer,
    OpcUaSession, OpcUaValue, ReadEventDetails, ReadProcessedDetails, ReadRawDetails,
    ServerFixture,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
