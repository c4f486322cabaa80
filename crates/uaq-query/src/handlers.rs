// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Read type handlers.
//!
//! Every handler takes one read-type-homogeneous partition and returns one
//! result per query, in partition order. Failures that concern a single
//! query (an undecodable node id, a bad per-node status) land in that
//! query's slot. An `Err` from a handler means a batched collaborator call
//! failed; the dispatcher then fails every query of the partition.
//!
//! | Read type           | Calls                                   |
//! |---------------------|-----------------------------------------|
//! | `ReadNode`          | one `read_values` for the partition     |
//! | `Subscribe`         | one `get_values` for the partition      |
//! | `ReadDataRaw`       | one `read_history_raw` per group        |
//! | `ReadDataProcessed` | one `read_history_processed` per group  |
//! | `ReadEvents`        | one `read_events` per query             |
//! | `SubscribeEvents`   | one `get_event_data` per query          |

use tracing::{debug, warn};

use uaq_opcua::{
    DataValue, EventFilter, NamespaceTable, NodeId, OpcUaError, OpcUaResult, OpcUaSession,
    OperationError, ReadEventDetails, StatusCode, StatusError, SubscriptionError, decode_node_id,
};

use crate::connection::{DataValueSubscription, EventSubscription};
use crate::event_filter::compile_event_filter;
use crate::grouping::{GroupPlan, ResultSlots, plan_groups, plan_processed_reads, plan_raw_reads};
use crate::query::{EventQuery, OpcUaQuery, QueryResult};
use crate::response::{DataResponse, data_value_response, event_response, history_response};

/// Results of one partition, in partition order.
pub type PartitionResults = Vec<QueryResult<DataResponse>>;

fn unanswered() -> StatusError {
    StatusError::new(StatusCode::BAD_UNKNOWN_RESPONSE, "No result for query")
}

/// Decodes every node id of a partition into a single group.
fn plan_point_reads(queries: &[&OpcUaQuery], namespaces: &NamespaceTable) -> GroupPlan<()> {
    plan_groups(queries, |query| {
        Ok(((), decode_node_id(&query.node_id, namespaces)?))
    })
}

// =============================================================================
// ReadNode / Subscribe
// =============================================================================

/// Reads the current values of a `ReadNode` partition in one call.
pub async fn read_nodes(
    session: &dyn OpcUaSession,
    queries: &[&OpcUaQuery],
) -> OpcUaResult<PartitionResults> {
    let plan = plan_point_reads(queries, session.namespace_table());
    let mut slots = ResultSlots::new(queries.len());
    slots.fail_all(plan.failures);

    for group in plan.groups {
        let values = session.read_values(&group.node_ids).await?;
        slots.scatter("Read", &group.indices, values, |i, value: DataValue| {
            data_value_response(&value, &group.node_ids[i], queries[group.indices[i]])
        })?;
    }

    Ok(slots.into_results(unanswered()))
}

/// Looks up the latest subscribed values of a `Subscribe` partition.
pub async fn subscribe_data_values(
    subscription: &dyn DataValueSubscription,
    namespaces: &NamespaceTable,
    queries: &[&OpcUaQuery],
) -> OpcUaResult<PartitionResults> {
    let plan = plan_point_reads(queries, namespaces);
    let mut slots = ResultSlots::new(queries.len());
    slots.fail_all(plan.failures);

    for group in plan.groups {
        let values = subscription.get_values(&group.node_ids).await?;
        slots.scatter("GetValues", &group.indices, values, |i, value| {
            value.and_then(|value| {
                data_value_response(&value, &group.node_ids[i], queries[group.indices[i]])
            })
        })?;
    }

    Ok(slots.into_results(unanswered()))
}

// =============================================================================
// History
// =============================================================================

/// Reads raw history, one call per distinct read details.
pub async fn read_history_raw(
    session: &dyn OpcUaSession,
    queries: &[&OpcUaQuery],
) -> OpcUaResult<PartitionResults> {
    let plan = plan_raw_reads(queries, session.namespace_table());
    let mut slots = ResultSlots::new(queries.len());
    slots.fail_all(plan.failures);

    for group in plan.groups {
        debug!(
            group_size = group.len(),
            max_values = group.key.max_values,
            "Reading raw history group"
        );
        let history = session.read_history_raw(&group.key, &group.node_ids).await?;
        slots.scatter("HistoryReadRaw", &group.indices, history, |i, values| {
            history_response(&values, queries[group.indices[i]])
        })?;
    }

    Ok(slots.into_results(unanswered()))
}

/// Reads aggregated history, one call per distinct read details.
pub async fn read_history_processed(
    session: &dyn OpcUaSession,
    queries: &[&OpcUaQuery],
) -> OpcUaResult<PartitionResults> {
    let plan = plan_processed_reads(queries, session.namespace_table());
    let mut slots = ResultSlots::new(queries.len());
    slots.fail_all(plan.failures);

    for group in plan.groups {
        debug!(
            group_size = group.len(),
            aggregate = %group.key.aggregate,
            interval_ms = group.key.interval.as_millis() as u64,
            "Reading processed history group"
        );
        let history = session
            .read_history_processed(&group.key, &group.node_ids)
            .await?;
        slots.scatter("HistoryReadProcessed", &group.indices, history, |i, values| {
            history_response(&values, queries[group.indices[i]])
        })?;
    }

    Ok(slots.into_results(unanswered()))
}

// =============================================================================
// Events
// =============================================================================

fn prepare_event_read(
    query: &OpcUaQuery,
    namespaces: &NamespaceTable,
    max_events: u32,
) -> OpcUaResult<(ReadEventDetails, EventFilter, NodeId)> {
    let node_id = decode_node_id(&query.node_id, namespaces)?;
    let details = ReadEventDetails {
        start: query.time_range.start()?,
        end: query.time_range.end()?,
        max_events,
    };
    let empty = EventQuery::default();
    let filter = compile_event_filter(query.event_query.as_ref().unwrap_or(&empty), namespaces)?;
    Ok((details, filter, node_id))
}

/// Reads event history, one call per query.
pub async fn read_events(
    session: &dyn OpcUaSession,
    queries: &[&OpcUaQuery],
    max_events: u32,
) -> OpcUaResult<PartitionResults> {
    let namespaces = session.namespace_table();
    let mut results = Vec::with_capacity(queries.len());

    for &query in queries {
        let (details, filter, node_id) = match prepare_event_read(query, namespaces, max_events) {
            Ok(prepared) => prepared,
            Err(e) => {
                debug!(ref_id = %query.ref_id, error = %e, "Event read rejected");
                results.push(Err(e.to_status_error()));
                continue;
            }
        };

        let events = session
            .read_events(&details, &filter, std::slice::from_ref(&node_id))
            .await?;
        let first = events.into_iter().next().ok_or_else(|| {
            OpcUaError::operation(OperationError::result_count_mismatch("HistoryReadEvents", 1, 0))
        })?;
        results.push(event_response(&first, query));
    }

    Ok(results)
}

/// Collects subscribed events, one lookup per query.
///
/// Never fails as a whole: every failure stays with its query.
pub async fn subscribe_events(
    subscription: &dyn EventSubscription,
    namespaces: &NamespaceTable,
    queries: &[&OpcUaQuery],
) -> OpcUaResult<PartitionResults> {
    let mut results = Vec::with_capacity(queries.len());

    for &query in queries {
        let Some(event_query) = query.event_query.as_ref() else {
            results.push(Err(OpcUaError::subscription(SubscriptionError::MissingEventQuery)
                .to_status_error()));
            continue;
        };

        let prepared = compile_event_filter(event_query, namespaces).and_then(|filter| {
            decode_node_id(&query.node_id, namespaces).map(|node_id| (filter, node_id))
        });
        let result = match prepared {
            Ok((filter, node_id)) => subscription
                .get_event_data(query, &node_id, &filter)
                .await
                .and_then(|events| event_response(&events, query)),
            Err(e) => {
                warn!(ref_id = %query.ref_id, error = %e, "Event subscription query rejected");
                Err(StatusError::new(StatusCode::BAD_UNKNOWN_RESPONSE, e.to_string()))
            }
        };
        results.push(result);
    }

    Ok(results)
}

// =============================================================================
// Tests
// =============================================================================
