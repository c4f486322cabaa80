// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Namespace-portable NodeId codec.
//!
//! Node ids stored outside a session carry the namespace URI instead of
//! the session-local index:
//!
//! ```text
//!   native (session A)            portable                               native (session B)
//!   ───────────────────           ───────────────────────────────────    ───────────────────
//!   ns=2;i=1001          encode   {"id":"i=1001",                decode  ns=5;i=1001
//!                        ──────>   "namespaceUrl":"urn:example"}  ─────>
//! ```
//!
//! Decoding accepts either form. A string that is not a valid portable
//! document is parsed as a plain native node id, so ids written before the
//! portable form existed keep working.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BrowseError, OpcUaError, OpcUaResult};
use crate::namespace::NamespaceResolver;
use crate::types::{NodeId, NodeIdentifier};

// =============================================================================
// PortableNodeId
// =============================================================================

/// A node id that names its namespace by URI.
///
/// Two portable ids are equal when their identifiers and namespace URIs are
/// equal, regardless of which session produced them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PortableNodeIdRepr", into = "PortableNodeIdRepr")]
pub struct PortableNodeId {
    /// Identifier within the namespace.
    pub identifier: NodeIdentifier,
    /// Namespace URI.
    pub namespace_url: String,
}

/// Wire shape of a portable node id.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PortableNodeIdRepr {
    id: String,
    #[serde(rename = "namespaceUrl", default)]
    namespace_url: String,
}

impl TryFrom<PortableNodeIdRepr> for PortableNodeId {
    type Error = String;

    fn try_from(repr: PortableNodeIdRepr) -> Result<Self, Self::Error> {
        let identifier = NodeIdentifier::parse(strip_namespace_qualifier(&repr.id))?;
        Ok(Self {
            identifier,
            namespace_url: repr.namespace_url,
        })
    }
}

impl From<PortableNodeId> for PortableNodeIdRepr {
    fn from(node: PortableNodeId) -> Self {
        Self {
            id: node.identifier.to_string(),
            namespace_url: node.namespace_url,
        }
    }
}

impl PortableNodeId {
    /// Creates a portable node id.
    pub fn new(identifier: NodeIdentifier, namespace_url: impl Into<String>) -> Self {
        Self {
            identifier,
            namespace_url: namespace_url.into(),
        }
    }

    /// Builds the portable form of a session-native node id.
    ///
    /// # Errors
    ///
    /// Fails if the node's namespace index has no URI in `namespaces`.
    pub fn from_native<R>(node_id: &NodeId, namespaces: &R) -> OpcUaResult<Self>
    where
        R: NamespaceResolver + ?Sized,
    {
        let uri = namespaces.resolve_uri(node_id.namespace_index)?;
        Ok(Self::new(node_id.identifier.clone(), uri))
    }

    /// Resolves this id against a session's namespace table.
    ///
    /// # Errors
    ///
    /// Fails if the URI is not in `namespaces` or resolves to an index
    /// outside the 16-bit range.
    pub fn to_native<R>(&self, namespaces: &R) -> OpcUaResult<NodeId>
    where
        R: NamespaceResolver + ?Sized,
    {
        let index = namespaces.resolve_index(&self.namespace_url)?;
        Ok(NodeId::new(index, self.identifier.clone()))
    }

    /// Serializes to the JSON text form.
    pub fn to_json(&self) -> OpcUaResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for PortableNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nsu={};{}", self.namespace_url, self.identifier)
    }
}

impl FromStr for PortableNodeId {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).map_err(|e| {
            OpcUaError::browse(BrowseError::invalid_node_id(
                s,
                format!("Not a portable node id: {}", e),
            ))
        })
    }
}

// =============================================================================
// Codec Functions
// =============================================================================

/// Attempts to read `s` as a portable node id.
///
/// Returns `None` for anything that is not a well-formed portable
/// document with a parseable identifier.
pub fn try_parse_tagged(s: &str) -> Option<PortableNodeId> {
    serde_json::from_str(s).ok()
}

/// Encodes a session-native node id into portable JSON text.
///
/// # Errors
///
/// Fails if the node's namespace index has no URI in `namespaces`.
pub fn encode_node_id<R>(node_id: &NodeId, namespaces: &R) -> OpcUaResult<String>
where
    R: NamespaceResolver + ?Sized,
{
    PortableNodeId::from_native(node_id, namespaces)?.to_json()
}

/// Decodes a node id string into a session-native node id.
///
/// Portable JSON is resolved through `namespaces`. Anything else is parsed as
/// a native node id string, keeping its own `ns=` index (default 0).
///
/// # Errors
///
/// - The namespace URI is not in `namespaces`.
/// - The URI resolves to an index outside the 16-bit range.
/// - The string is neither portable JSON nor a native node id.
pub fn decode_node_id<R>(s: &str, namespaces: &R) -> OpcUaResult<NodeId>
where
    R: NamespaceResolver + ?Sized,
{
    match try_parse_tagged(s) {
        Some(portable) => portable.to_native(namespaces),
        None => s.parse(),
    }
}

/// Renders a native node id as portable JSON, falling back to the native
/// string when the namespace index is unknown to the session.
pub fn node_id_to_json<R>(node_id: &NodeId, namespaces: &R) -> String
where
    R: NamespaceResolver + ?Sized,
{
    encode_node_id(node_id, namespaces).unwrap_or_else(|_| node_id.to_opc_string())
}

/// Drops a leading namespace qualifier (`ns=2;`, `nsu=...;`, `n2;`) from an
/// id string.
///
/// The portable form names its namespace by URI, so any index written into
/// the id text is ignored. The identifier payload is kept byte for byte.
fn strip_namespace_qualifier(id: &str) -> &str {
    if NodeIdentifier::has_type_prefix(id) {
        return id;
    }
    match id.split_once(';') {
        Some((_, rest)) if NodeIdentifier::has_type_prefix(rest) => rest,
        _ => id,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::NamespaceTable;

    fn table() -> NamespaceTable {
        NamespaceTable::from_uris(["urn:server", "urn:example"])
    }

    #[test]
    fn test_encode_node_id() {
        let json = encode_node_id(&NodeId::numeric(2, 1001), &table()).unwrap();
        assert_eq!(json, r#"{"id":"i=1001","namespaceUrl":"urn:example"}"#);
    }

    #[test]
    fn test_encode_unknown_index() {
        assert!(encode_node_id(&NodeId::numeric(9, 1), &table()).is_err());
        assert_eq!(node_id_to_json(&NodeId::numeric(9, 1), &table()), "ns=9;i=1");
    }

    #[test]
    fn test_decode_tagged_across_sessions() {
        let json = encode_node_id(&NodeId::string(2, "Pump.Speed"), &table()).unwrap();

        let other = NamespaceTable::from_uris(["urn:a", "urn:b", "urn:c", "urn:d", "urn:example"]);
        let decoded = decode_node_id(&json, &other).unwrap();
        assert_eq!(decoded, NodeId::string(5, "Pump.Speed"));
    }

    #[test]
    fn test_decode_ignores_index_inside_id() {
        let decoded = decode_node_id(
            r#"{"id":"ns=7;i=1001","namespaceUrl":"urn:example"}"#,
            &table(),
        )
        .unwrap();
        assert_eq!(decoded, NodeId::numeric(2, 1001));

        let decoded = decode_node_id(
            r#"{"id":"n2;i=1001","namespaceUrl":"urn:example"}"#,
            &table(),
        )
        .unwrap();
        assert_eq!(decoded, NodeId::numeric(2, 1001));
    }

    #[test]
    fn test_decode_native_fallback() {
        assert_eq!(
            decode_node_id("ns=2;i=1001", &table()).unwrap(),
            NodeId::numeric(2, 1001)
        );
        assert_eq!(
            decode_node_id("i=85", &table()).unwrap(),
            NodeId::OBJECTS_FOLDER
        );
    }

    #[test]
    fn test_decode_unknown_namespace() {
        let err = decode_node_id(
            r#"{"id":"i=1","namespaceUrl":"urn:missing"}"#,
            &table(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("urn:missing"));
    }

    #[test]
    fn test_decode_malformed() {
        // Well-formed JSON with a bad identifier falls back to native parsing.
        assert!(decode_node_id(r#"{"id":"q=1","namespaceUrl":"urn:example"}"#, &table()).is_err());
        assert!(decode_node_id("not a node", &table()).is_err());
    }

    #[test]
    fn test_string_identifier_with_semicolon() {
        let decoded = decode_node_id(
            r#"{"id":"s=Line;1","namespaceUrl":"urn:example"}"#,
            &table(),
        )
        .unwrap();
        assert_eq!(decoded, NodeId::string(2, "Line;1"));
    }

    #[test]
    fn test_portable_equality() {
        let a: PortableNodeId = r#"{"id":"ns=2;i=5","namespaceUrl":"urn:x"}"#.parse().unwrap();
        let b: PortableNodeId = r#"{"id":"i=5","namespaceUrl":"urn:x"}"#.parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "nsu=urn:x;i=5");
    }

    #[test]
    fn test_round_trip_identifier_kinds() {
        let nodes = [
            NodeId::numeric(2, 1001),
            NodeId::string(2, "Pump "),
            NodeId::string(2, " Pump"),
            NodeId::string(1, "  "),
            NodeId::string(2, "ns=7;i=1"),
            NodeId::new(
                2,
                NodeIdentifier::Guid(
                    uuid::Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap(),
                ),
            ),
            NodeId::new(1, NodeIdentifier::Opaque(b"Hello".to_vec())),
            NodeId::new(2, NodeIdentifier::Opaque(Vec::new())),
        ];

        for node in nodes {
            let json = encode_node_id(&node, &table()).unwrap();
            assert_eq!(decode_node_id(&json, &table()).unwrap(), node, "{}", json);
        }
    }

    #[test]
    fn test_portable_string_keeps_whitespace() {
        let json = encode_node_id(&NodeId::string(2, "Pump "), &table()).unwrap();
        assert_eq!(json, r#"{"id":"s=Pump ","namespaceUrl":"urn:example"}"#);

        let decoded = decode_node_id(r#"{"id":"ns=3;s= Pump","namespaceUrl":"urn:example"}"#, &table())
            .unwrap();
        assert_eq!(decoded, NodeId::string(2, " Pump"));
    }

    #[test]
    fn test_try_parse_tagged() {
        assert!(try_parse_tagged("ns=2;i=1").is_none());
        assert!(try_parse_tagged(r#"{"id":"i=1","namespaceUrl":"urn:x"}"#).is_some());
    }
}
