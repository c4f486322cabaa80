// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Dry-run planning.
//!
//! Computes how a request would be dispatched against a namespace table
//! without calling any collaborator: partitions, groups, and the number of
//! underlying calls each partition would issue.

use serde::Serialize;

use uaq_opcua::{NamespaceTable, StatusError, decode_node_id};

use crate::dispatch::{DispatchOptions, UnknownReadTypePolicy, partition_queries};
use crate::grouping::{GroupPlan, plan_groups, plan_processed_reads, plan_raw_reads};
use crate::query::{OpcUaQuery, ReadType};

/// A query that would fail before reaching a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedQuery {
    /// Reference id.
    pub ref_id: String,
    /// Status name.
    pub status: String,
    /// Error message.
    pub message: String,
}

/// One batched call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    /// Shared read details.
    pub key: String,
    /// Reference ids served by the call, in call order.
    pub ref_ids: Vec<String>,
}

/// Plan of one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionPlan {
    /// Read type name as sent.
    pub read_type: String,
    /// `false` when no handler exists for the read type.
    pub handled: bool,
    /// Number of queries.
    pub queries: usize,
    /// Number of underlying calls.
    pub calls: usize,
    /// Batched calls, for grouped read types.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupSummary>,
    /// Queries failing before dispatch.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedQuery>,
}

/// Plan of a whole request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPlan {
    /// Partitions in dispatch order.
    pub partitions: Vec<PartitionPlan>,
}

impl RequestPlan {
    /// Returns the total number of underlying calls.
    pub fn total_calls(&self) -> usize {
        self.partitions.iter().map(|p| p.calls).sum()
    }
}

/// Plans `queries` against `namespaces`.
pub fn plan_request(
    queries: &[OpcUaQuery],
    namespaces: &NamespaceTable,
    options: &DispatchOptions,
) -> RequestPlan {
    let partitions = partition_queries(queries)
        .into_iter()
        .map(|partition| {
            let members = &partition.queries;
            let mut plan = PartitionPlan {
                read_type: partition.read_type.to_string(),
                handled: true,
                queries: members.len(),
                calls: 0,
                groups: Vec::new(),
                rejected: Vec::new(),
            };

            match partition.kind() {
                Some(ReadType::ReadNode) | Some(ReadType::Subscribe) => {
                    let groups = plan_groups(members, |q| {
                        Ok(((), decode_node_id(&q.node_id, namespaces)?))
                    });
                    fill_grouped(&mut plan, members, groups, |_| "current values".to_string());
                }
                Some(ReadType::ReadDataRaw) => {
                    let groups = plan_raw_reads(members, namespaces);
                    fill_grouped(&mut plan, members, groups, |key| {
                        format!(
                            "{} .. {} max={}",
                            key.start.to_rfc3339(),
                            key.end.to_rfc3339(),
                            key.max_values
                        )
                    });
                }
                Some(ReadType::ReadDataProcessed) => {
                    let groups = plan_processed_reads(members, namespaces);
                    fill_grouped(&mut plan, members, groups, |key| {
                        format!(
                            "{} .. {} aggregate={} interval={}ms",
                            key.start.to_rfc3339(),
                            key.end.to_rfc3339(),
                            key.aggregate,
                            key.interval.as_millis()
                        )
                    });
                }
                Some(ReadType::ReadEvents) | Some(ReadType::SubscribeEvents) => {
                    plan.calls = members.len();
                }
                None => {
                    plan.handled = false;
                    if options.unknown_read_type == UnknownReadTypePolicy::Strict {
                        plan.rejected = members
                            .iter()
                            .map(|q| RejectedQuery {
                                ref_id: q.ref_id.clone(),
                                status: "BadNotSupported".to_string(),
                                message: format!("Unsupported read type: '{}'", q.read_type),
                            })
                            .collect();
                    }
                }
            }
            plan
        })
        .collect();

    RequestPlan { partitions }
}

fn fill_grouped<K, F>(
    plan: &mut PartitionPlan,
    members: &[&OpcUaQuery],
    groups: GroupPlan<K>,
    describe: F,
) where
    K: Clone + Eq + std::hash::Hash,
    F: Fn(&K) -> String,
{
    plan.calls = groups.call_count();
    plan.groups = groups
        .groups
        .iter()
        .map(|group| GroupSummary {
            key: describe(&group.key),
            ref_ids: group
                .indices
                .iter()
                .map(|&i| members[i].ref_id.clone())
                .collect(),
        })
        .collect();
    plan.rejected = groups
        .failures
        .into_iter()
        .map(|(i, error): (usize, StatusError)| RejectedQuery {
            ref_id: members[i].ref_id.clone(),
            status: error.status.name().to_string(),
            message: error.message,
        })
        .collect();
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_counts_calls() {
        let queries = vec![
            OpcUaQuery::new("Q1", "ReadDataRaw", "i=1").with_time_range(0, 1000).with_max_data_points(10),
            OpcUaQuery::new("Q2", "ReadDataRaw", "i=2").with_time_range(0, 1000).with_max_data_points(10),
            OpcUaQuery::new("Q3", "ReadDataRaw", "i=3").with_time_range(500, 1500).with_max_data_points(10),
            OpcUaQuery::new("N1", "ReadNode", "i=4"),
            OpcUaQuery::new("N2", "ReadNode", "i=5"),
            OpcUaQuery::new("E1", "ReadEvents", "i=2253"),
            OpcUaQuery::new("U1", "Mystery", "i=6"),
        ];
        let plan = plan_request(&queries, &NamespaceTable::new(), &DispatchOptions::default());

        assert_eq!(plan.partitions.len(), 4);
        assert_eq!(plan.partitions[0].calls, 2);
        assert_eq!(plan.partitions[0].groups[0].ref_ids, ["Q1", "Q2"]);
        assert_eq!(plan.partitions[1].calls, 1);
        assert_eq!(plan.partitions[2].calls, 1);
        assert!(!plan.partitions[3].handled);
        assert!(plan.partitions[3].rejected.is_empty());
        assert_eq!(plan.total_calls(), 4);
    }

    #[test]
    fn test_plan_reports_rejections() {
        let queries = vec![
            OpcUaQuery::new("Q1", "ReadDataRaw", r#"{"id":"i=1","namespaceUrl":"urn:nowhere"}"#),
            OpcUaQuery::new("U1", "Mystery", "i=6"),
        ];
        let options = DispatchOptions::new().with_unknown_read_type(UnknownReadTypePolicy::Strict);
        let plan = plan_request(&queries, &NamespaceTable::new(), &options);

        assert_eq!(plan.partitions[0].calls, 0);
        assert_eq!(plan.partitions[0].rejected[0].status, "BadNodeIdUnknown");
        assert_eq!(plan.partitions[1].rejected[0].ref_id, "U1");
    }
}
