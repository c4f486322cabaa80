// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `plan` command.

use std::fmt::Write as _;

use uaq_config::UaqConfig;
use uaq_query::{RequestPlan, plan_request};

use crate::cli::{Cli, OutputFormat, PlanArgs};
use crate::commands::{namespace_table, read_request};
use crate::error::{BinError, BinResult};

/// Executes the `plan` command.
pub fn plan(_cli: &Cli, config: &UaqConfig, args: PlanArgs) -> BinResult<()> {
    let request = read_request(&args.request)?;
    let namespaces = namespace_table(args.fixture.as_deref(), config)?;
    let plan = plan_request(&request.queries, &namespaces, &config.dispatch_options());

    match args.format {
        OutputFormat::Text => print!("{}", render_plan(&plan)),
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(&plan)
                .map_err(|e| BinError::runtime(format!("Failed to serialize plan: {}", e)))?;
            println!("{}", text);
        }
    }
    Ok(())
}

/// Renders a plan as text.
pub fn render_plan(plan: &RequestPlan) -> String {
    let mut out = String::new();

    for partition in &plan.partitions {
        let _ = writeln!(
            out,
            "{} ({} queries, {} calls){}",
            partition.read_type,
            partition.queries,
            partition.calls,
            if partition.handled { "" } else { " [no handler]" }
        );
        for group in &partition.groups {
            let _ = writeln!(out, "  call {}: {}", group.key, group.ref_ids.join(", "));
        }
        for rejected in &partition.rejected {
            let _ = writeln!(
                out,
                "  rejected {}: {} {}",
                rejected.ref_id, rejected.status, rejected.message
            );
        }
    }

    let _ = writeln!(out, "Total calls: {}", plan.total_calls());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use uaq_opcua::NamespaceTable;
    use uaq_query::{DispatchOptions, OpcUaQuery};

    #[test]
    fn test_render_plan() {
        let queries = vec![
            OpcUaQuery::new("A", "ReadNode", "i=2258"),
            OpcUaQuery::new("B", "ReadNode", "i=2259"),
            OpcUaQuery::new("C", "Mystery", "i=1"),
        ];
        let plan = plan_request(&queries, &NamespaceTable::new(), &DispatchOptions::default());
        let text = render_plan(&plan);

        assert!(text.contains("ReadNode (2 queries, 1 calls)"));
        assert!(text.contains("A, B"));
        assert!(text.contains("Mystery (1 queries, 0 calls) [no handler]"));
        assert!(text.ends_with("Total calls: 1\n"));
    }
}
