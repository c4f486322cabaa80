// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Qualified names, browse paths and browse result conversions.
//!
//! Browse names are namespace-qualified like node ids, and the same
//! portability problem applies:
//!
//! ```text
//!   QualifiedName { 2, "Temperature" }
//!        │  to_portable                         ▲  to_native
//!        ▼                                      │
//!   { "name": "Temperature", "namespaceUrl": "urn:example" }
//! ```
//!
//! On the way in, `namespaceUrl` may also be a plain decimal index (used
//! as-is) or empty (namespace 0).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::node_id_to_json;
use crate::error::OpcUaResult;
use crate::namespace::NamespaceResolver;
use crate::types::{NodeClass, NodeId};

// =============================================================================
// QualifiedName
// =============================================================================

/// OPC UA qualified name (namespace index + name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Namespace index.
    pub namespace_index: u16,

    /// The name string.
    pub name: String,
}

impl QualifiedName {
    /// Creates a new qualified name.
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace_index,
            name: name.into(),
        }
    }

    /// Creates a qualified name in namespace 0.
    pub fn standard(name: impl Into<String>) -> Self {
        Self::new(0, name)
    }

    /// Returns the string representation.
    pub fn to_string_with_ns(&self) -> String {
        if self.namespace_index == 0 {
            self.name.clone()
        } else {
            format!("{}:{}", self.namespace_index, self.name)
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_with_ns())
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        if let Some((ns, name)) = s.split_once(':') {
            if let Ok(ns_idx) = ns.parse::<u16>() {
                return Self::new(ns_idx, name);
            }
        }
        Self::standard(s)
    }
}

// =============================================================================
// PortableQualifiedName
// =============================================================================

/// A qualified name that names its namespace by URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PortableQualifiedName {
    /// The name string.
    pub name: String,

    /// Namespace URI, a decimal namespace index, or empty for namespace 0.
    #[serde(default)]
    pub namespace_url: String,
}

impl PortableQualifiedName {
    /// Creates a portable qualified name.
    pub fn new(name: impl Into<String>, namespace_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace_url: namespace_url.into(),
        }
    }

    /// Creates a portable qualified name in the standard namespace.
    pub fn standard(name: impl Into<String>) -> Self {
        Self::new(name, "")
    }

    /// Resolves this name against a session's namespace table.
    ///
    /// # Errors
    ///
    /// Fails if `namespace_url` is a URI missing from `namespaces`.
    pub fn to_native<R>(&self, namespaces: &R) -> OpcUaResult<QualifiedName>
    where
        R: NamespaceResolver + ?Sized,
    {
        let namespace = self.namespace_url.trim();
        let index = if namespace.is_empty() {
            0
        } else if let Ok(index) = namespace.parse::<u16>() {
            index
        } else {
            namespaces.resolve_index(namespace)?
        };
        Ok(QualifiedName::new(index, self.name.clone()))
    }

    /// Builds the portable form of a session-native qualified name.
    ///
    /// # Errors
    ///
    /// Fails if the namespace index has no URI in `namespaces`.
    pub fn from_native<R>(name: &QualifiedName, namespaces: &R) -> OpcUaResult<Self>
    where
        R: NamespaceResolver + ?Sized,
    {
        let uri = namespaces.resolve_uri(name.namespace_index)?;
        Ok(Self::new(name.name.clone(), uri))
    }
}

/// Converts a portable browse path element by element.
///
/// Fails on the first element that cannot be resolved.
pub fn browse_path_to_native<R>(
    path: &[PortableQualifiedName],
    namespaces: &R,
) -> OpcUaResult<Vec<QualifiedName>>
where
    R: NamespaceResolver + ?Sized,
{
    path.iter().map(|element| element.to_native(namespaces)).collect()
}

/// Converts a native browse path element by element.
pub fn browse_path_to_portable<R>(
    path: &[QualifiedName],
    namespaces: &R,
) -> OpcUaResult<Vec<PortableQualifiedName>>
where
    R: NamespaceResolver + ?Sized,
{
    path.iter()
        .map(|element| PortableQualifiedName::from_native(element, namespaces))
        .collect()
}

/// Joins a browse path into `a/b/c` form using unqualified names.
pub fn browse_path_string(path: &[QualifiedName]) -> String {
    path.iter()
        .map(|q| q.name.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

// =============================================================================
// BrowseNode
// =============================================================================

/// A reference returned by a browse call, in session-native form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowseNode {
    /// The target node ID.
    pub node_id: NodeId,

    /// The browse name (namespace qualified).
    pub browse_name: QualifiedName,

    /// The display name (localized).
    pub display_name: String,

    /// The node class.
    pub node_class: NodeClass,

    /// Type definition node ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_definition: Option<NodeId>,

    /// Whether the reference is followed in the forward direction.
    #[serde(default = "default_true")]
    pub is_forward: bool,
}

fn default_true() -> bool {
    true
}

impl BrowseNode {
    /// Creates a new browse node with minimal information.
    pub fn new(
        node_id: NodeId,
        browse_name: QualifiedName,
        display_name: impl Into<String>,
        node_class: NodeClass,
    ) -> Self {
        Self {
            node_id,
            browse_name,
            display_name: display_name.into(),
            node_class,
            type_definition: None,
            is_forward: true,
        }
    }

    /// Sets the type definition.
    pub fn with_type_definition(mut self, type_def: NodeId) -> Self {
        self.type_definition = Some(type_def);
        self
    }

    /// Sets the reference direction.
    pub fn with_forward(mut self, is_forward: bool) -> Self {
        self.is_forward = is_forward;
        self
    }

    /// Converts to a portable node summary.
    pub fn to_node_info<R>(&self, namespaces: &R) -> OpcUaResult<NodeInfo>
    where
        R: NamespaceResolver + ?Sized,
    {
        Ok(NodeInfo {
            node_id: node_id_to_json(&self.node_id, namespaces),
            browse_name: PortableQualifiedName::from_native(&self.browse_name, namespaces)?,
            display_name: self.display_name.clone(),
            node_class: self.node_class.value(),
        })
    }

    /// Converts to a portable browse result entry.
    pub fn to_browse_entry<R>(&self, namespaces: &R) -> OpcUaResult<BrowseEntry>
    where
        R: NamespaceResolver + ?Sized,
    {
        Ok(BrowseEntry {
            display_name: self.display_name.clone(),
            browse_name: PortableQualifiedName::from_native(&self.browse_name, namespaces)?,
            node_id: node_id_to_json(&self.node_id, namespaces),
            type_id: self
                .type_definition
                .as_ref()
                .map(|type_def| node_id_to_json(type_def, namespaces)),
            is_forward: self.is_forward,
            node_class: self.node_class.value(),
        })
    }
}

// =============================================================================
// Portable Browse Results
// =============================================================================

/// Portable summary of a single node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    /// Portable node id JSON.
    pub node_id: String,
    /// Portable browse name.
    pub browse_name: PortableQualifiedName,
    /// Display name.
    pub display_name: String,
    /// Node class bit mask value.
    pub node_class: u32,
}

/// Portable entry of a browse result list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseEntry {
    /// Display name.
    pub display_name: String,
    /// Portable browse name.
    pub browse_name: PortableQualifiedName,
    /// Portable node id JSON.
    pub node_id: String,
    /// Portable type definition JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,
    /// Whether the reference is forward.
    pub is_forward: bool,
    /// Node class bit mask value.
    pub node_class: u32,
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
    fn test_qualified_name_from_str() {
        let qn = QualifiedName::from("2:Temperature");
        assert_eq!(qn.namespace_index, 2);
        assert_eq!(qn.name, "Temperature");

        let qn = QualifiedName::from("Temperature");
        assert_eq!(qn.namespace_index, 0);
        assert_eq!(qn.to_string(), "Temperature");
    }

    #[test]
    fn test_portable_name_numeric_namespace() {
        let qn = PortableQualifiedName::new("Severity", "3").to_native(&table()).unwrap();
        assert_eq!(qn, QualifiedName::new(3, "Severity"));
    }

    #[test]
    fn test_portable_name_blank_namespace() {
        let qn = PortableQualifiedName::new("Message", "  ").to_native(&table()).unwrap();
        assert_eq!(qn, QualifiedName::standard("Message"));
    }

    #[test]
    fn test_portable_name_uri_namespace() {
        let qn = PortableQualifiedName::new("Level", "urn:example")
            .to_native(&table())
            .unwrap();
        assert_eq!(qn, QualifiedName::new(2, "Level"));

        assert!(
            PortableQualifiedName::new("Level", "urn:missing")
                .to_native(&table())
                .is_err()
        );
    }

    #[test]
    fn test_portable_name_from_native() {
        let portable =
            PortableQualifiedName::from_native(&QualifiedName::new(2, "Level"), &table()).unwrap();
        assert_eq!(portable.namespace_url, "urn:example");

        let json = serde_json::to_string(&portable).unwrap();
        assert_eq!(json, r#"{"name":"Level","namespaceUrl":"urn:example"}"#);
    }

    #[test]
    fn test_browse_path_to_native() {
        let path = vec![
            PortableQualifiedName::standard("EnabledState"),
            PortableQualifiedName::new("Id", "urn:example"),
        ];
        let native = browse_path_to_native(&path, &table()).unwrap();
        assert_eq!(native[0], QualifiedName::standard("EnabledState"));
        assert_eq!(native[1], QualifiedName::new(2, "Id"));
        assert_eq!(browse_path_string(&native), "EnabledState/Id");

        let back = browse_path_to_portable(&native, &table()).unwrap();
        assert_eq!(back[1], path[1]);
    }

    #[test]
    fn test_browse_entry_conversion() {
        let node = BrowseNode::new(
            NodeId::string(2, "Boiler"),
            QualifiedName::new(2, "Boiler"),
            "Boiler",
            NodeClass::Object,
        )
        .with_type_definition(NodeId::numeric(0, 58));

        let entry = node.to_browse_entry(&table()).unwrap();
        assert_eq!(entry.node_id, r#"{"id":"s=Boiler","namespaceUrl":"urn:example"}"#);
        assert_eq!(entry.node_class, 1);
        assert!(entry.is_forward);
        assert!(entry.type_id.unwrap().contains("i=58"));

        let info = node.to_node_info(&table()).unwrap();
        assert_eq!(info.browse_name.name, "Boiler");
    }
}
