// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session namespace table.
//!
//! A namespace index is a position in the server's namespace array and
//! changes between servers and restarts. The URI at that position does not.
//!
//! ```text
//!   index   uri
//!   ─────   ─────────────────────────────────
//!     0     http://opcfoundation.org/UA/
//!     1     urn:server:instance
//!     2     urn:example            <── "ns=2;..." means this
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{BrowseError, OpcUaError, OpcUaResult};

/// URI of the OPC UA standard namespace (always index 0).
pub const OPC_UA_NAMESPACE_URI: &str = "http://opcfoundation.org/UA/";

/// Index value the standard uses to mean "no namespace".
///
/// A lookup that lands at or above this value is treated as unresolvable.
pub const INVALID_NAMESPACE_INDEX: u16 = u16::MAX;

// =============================================================================
// NamespaceResolver
// =============================================================================

/// Resolves namespace URIs to indices and back for one session.
pub trait NamespaceResolver: Send + Sync {
    /// Returns the raw table position of `uri`, if present.
    fn index_of(&self, uri: &str) -> Option<usize>;

    /// Returns the URI stored at `index`, if present.
    fn uri_of(&self, index: u16) -> Option<&str>;

    /// Resolves `uri` to a 16-bit namespace index.
    ///
    /// Fails when the URI is absent or its position is outside the usable
    /// index range.
    fn resolve_index(&self, uri: &str) -> OpcUaResult<u16> {
        match self.index_of(uri) {
            None => Err(OpcUaError::browse(BrowseError::unknown_namespace(uri))),
            Some(index) if index >= INVALID_NAMESPACE_INDEX as usize => Err(OpcUaError::browse(
                BrowseError::namespace_index_exhausted(uri, index),
            )),
            Some(index) => Ok(index as u16),
        }
    }

    /// Resolves `index` to its URI.
    fn resolve_uri(&self, index: u16) -> OpcUaResult<&str> {
        self.uri_of(index)
            .ok_or_else(|| OpcUaError::browse(BrowseError::unknown_namespace_index(index)))
    }
}

// =============================================================================
// NamespaceTable
// =============================================================================

/// In-memory namespace array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespaceTable {
    uris: Vec<String>,
}

impl NamespaceTable {
    /// Creates a table holding only the standard namespace.
    pub fn new() -> Self {
        Self {
            uris: vec![OPC_UA_NAMESPACE_URI.to_string()],
        }
    }

    /// Creates a table from URIs in index order.
    ///
    /// The standard namespace is inserted at index 0 when missing.
    pub fn from_uris<I, S>(uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for uri in uris {
            let uri = uri.into();
            if uri == OPC_UA_NAMESPACE_URI && table.uris.len() == 1 {
                continue;
            }
            table.uris.push(uri);
        }
        table
    }

    /// Appends `uri` if missing and returns its index.
    pub fn push(&mut self, uri: impl Into<String>) -> usize {
        let uri = uri.into();
        if let Some(index) = self.uris.iter().position(|u| *u == uri) {
            return index;
        }
        self.uris.push(uri);
        self.uris.len() - 1
    }

    /// Returns the number of namespaces.
    pub fn len(&self) -> usize {
        self.uris.len()
    }

    /// Returns `true` if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    /// Iterates over URIs in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.uris.iter().map(String::as_str)
    }
}

impl Default for NamespaceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceResolver for NamespaceTable {
    fn index_of(&self, uri: &str) -> Option<usize> {
        self.uris.iter().position(|u| u == uri)
    }

    fn uri_of(&self, index: u16) -> Option<&str> {
        self.uris.get(index as usize).map(String::as_str)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table_has_standard_namespace() {
        let table = NamespaceTable::new();
        assert_eq!(table.len(), 1);
        assert_eq!(table.uri_of(0), Some(OPC_UA_NAMESPACE_URI));
        assert_eq!(table.index_of(OPC_UA_NAMESPACE_URI), Some(0));
    }

    #[test]
    fn test_from_uris() {
        let table = NamespaceTable::from_uris(["urn:server", "urn:example"]);
        assert_eq!(table.resolve_index("urn:example").unwrap(), 2);
        assert_eq!(table.resolve_uri(1).unwrap(), "urn:server");

        let table = NamespaceTable::from_uris([OPC_UA_NAMESPACE_URI, "urn:a"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_push_is_idempotent() {
        let mut table = NamespaceTable::new();
        assert_eq!(table.push("urn:a"), 1);
        assert_eq!(table.push("urn:a"), 1);
        assert_eq!(table.push("urn:b"), 2);
    }

    #[test]
    fn test_resolve_unknown() {
        let table = NamespaceTable::new();
        let err = table.resolve_index("urn:missing").unwrap_err();
        assert!(err.to_string().contains("urn:missing"));
        assert!(table.resolve_uri(9).is_err());
    }

    struct HugeTable;

    impl NamespaceResolver for HugeTable {
        fn index_of(&self, _uri: &str) -> Option<usize> {
            Some(INVALID_NAMESPACE_INDEX as usize)
        }

        fn uri_of(&self, _index: u16) -> Option<&str> {
            None
        }
    }

    #[test]
    fn test_resolve_index_exhausted() {
        let err = HugeTable.resolve_index("urn:far").unwrap_err();
        assert!(matches!(
            err,
            OpcUaError::Browse(BrowseError::NamespaceIndexExhausted { .. })
        ));
    }
}
