// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `browse` command.

use uaq_config::UaqConfig;
use uaq_opcua::{BrowseEntry, OpcUaResult, OpcUaSession, decode_node_id};

use crate::cli::{BrowseArgs, Cli, OutputFormat};
use crate::commands::load_server;
use crate::error::{BinError, BinResult};

/// Executes the `browse` command.
pub async fn browse(_cli: &Cli, config: &UaqConfig, args: BrowseArgs) -> BinResult<()> {
    let server = load_server(args.fixture.as_deref(), config)?;
    let entries = browse_entries(&server, &args.node).await?;

    match args.format {
        OutputFormat::Text => {
            for entry in &entries {
                let namespace = if entry.browse_name.namespace_url.is_empty() {
                    "-"
                } else {
                    entry.browse_name.namespace_url.as_str()
                };
                println!(
                    "{}\t{}\t{}\t{}",
                    entry.display_name, entry.browse_name.name, namespace, entry.node_id
                );
            }
        }
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(&entries)
                .map_err(|e| BinError::runtime(format!("Failed to serialize entries: {}", e)))?;
            println!("{}", text);
        }
    }
    Ok(())
}

/// Browses `node` and converts the references to portable entries.
pub async fn browse_entries(session: &dyn OpcUaSession, node: &str) -> OpcUaResult<Vec<BrowseEntry>> {
    let namespaces = session.namespace_table();
    let node_id = decode_node_id(node, namespaces)?;
    session
        .browse(&node_id)
        .await?
        .iter()
        .map(|reference| reference.to_browse_entry(namespaces))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uaq_opcua::{MemoryServer, NamespaceTable, NodeId, OpcUaValue, QualifiedName};

    #[tokio::test]
    async fn test_browse_entries_are_portable() {
        let server = MemoryServer::new(NamespaceTable::from_uris(["urn:plant"]));
        server.add_variable(
            NodeId::string(1, "Speed"),
            QualifiedName::new(1, "Speed"),
            OpcUaValue::Double(1.0),
        );

        let entries = browse_entries(&server, "i=85").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].browse_name.namespace_url, "urn:plant");
        assert!(entries[0].node_id.contains("urn:plant"));
    }
}
