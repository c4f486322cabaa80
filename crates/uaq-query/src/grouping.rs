// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Query grouping and batching.
//!
//! History queries that share their read details are served by one session
//! call. Grouping keeps two orders aligned:
//!
//! ```text
//! batch:   [Q0 A (0..1000, 10)] [Q1 B (0..1000, 10)] [Q2 C (500..1500, 10)]
//!
//! groups:  key (0..1000, 10)    indices [0, 1]   node_ids [A, B]   -> 1 call
//!          key (500..1500, 10)  indices [2]      node_ids [C]      -> 1 call
//!
//! scatter: results[indices[i]] = call_result[i]
//! ```
//!
//! Groups are kept in first-appearance order so calls are issued
//! deterministically. Keys compare by value; see [`ReadRawDetails`] and
//! [`ReadProcessedDetails`].

use std::collections::HashMap;
use std::hash::Hash;

use tracing::debug;

use uaq_opcua::{
    NamespaceResolver, NodeId, OpcUaError, OpcUaResult, OperationError, ReadProcessedDetails,
    ReadRawDetails, StatusError, decode_node_id,
};

use crate::query::{OpcUaQuery, QueryResult};

// =============================================================================
// QueryGroup
// =============================================================================

/// Queries that share one underlying call.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryGroup<K> {
    /// Shared read details.
    pub key: K,

    /// Positions of the member queries in their batch.
    pub indices: Vec<usize>,

    /// Resolved node ids; `node_ids[i]` belongs to `indices[i]`.
    pub node_ids: Vec<NodeId>,
}

impl<K> QueryGroup<K> {
    /// Returns the number of member queries.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns `true` if the group has no members.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Insertion-ordered groups keyed by read details.
#[derive(Debug, Clone)]
pub struct QueryGroups<K> {
    groups: Vec<QueryGroup<K>>,
    lookup: HashMap<K, usize>,
}

impl<K> Default for QueryGroups<K> {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            lookup: HashMap::new(),
        }
    }
}

impl<K: Clone + Eq + Hash> QueryGroups<K> {
    /// Creates an empty set of groups.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the query at `index` to the group for `key`.
    pub fn insert(&mut self, key: K, index: usize, node_id: NodeId) {
        let slot = match self.lookup.get(&key) {
            Some(&slot) => slot,
            None => {
                self.groups.push(QueryGroup {
                    key: key.clone(),
                    indices: Vec::new(),
                    node_ids: Vec::new(),
                });
                let slot = self.groups.len() - 1;
                self.lookup.insert(key, slot);
                slot
            }
        };
        let group = &mut self.groups[slot];
        group.indices.push(index);
        group.node_ids.push(node_id);
    }

    /// Returns the group for `key`.
    pub fn get(&self, key: &K) -> Option<&QueryGroup<K>> {
        self.lookup.get(key).map(|&slot| &self.groups[slot])
    }

    /// Returns the number of groups, which is the number of calls needed.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` if there are no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterates groups in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = &QueryGroup<K>> {
        self.groups.iter()
    }
}

impl<K> IntoIterator for QueryGroups<K> {
    type Item = QueryGroup<K>;
    type IntoIter = std::vec::IntoIter<QueryGroup<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

// =============================================================================
// Planning
// =============================================================================

/// Grouping of one batch: the groups plus queries that could not be keyed.
#[derive(Debug, Clone)]
pub struct GroupPlan<K> {
    /// Groups to execute.
    pub groups: QueryGroups<K>,

    /// Queries rejected before grouping, by batch position.
    pub failures: Vec<(usize, StatusError)>,
}

impl<K: Clone + Eq + Hash> GroupPlan<K> {
    /// Returns the number of underlying calls.
    pub fn call_count(&self) -> usize {
        self.groups.len()
    }
}

/// Groups `queries` by the key `key_of` derives from each one.
///
/// A query whose key cannot be derived fails alone and joins no group.
pub fn plan_groups<K, F>(queries: &[&OpcUaQuery], mut key_of: F) -> GroupPlan<K>
where
    K: Clone + Eq + Hash,
    F: FnMut(&OpcUaQuery) -> OpcUaResult<(K, NodeId)>,
{
    let mut groups = QueryGroups::new();
    let mut failures = Vec::new();

    for (index, &query) in queries.iter().enumerate() {
        match key_of(query) {
            Ok((key, node_id)) => groups.insert(key, index, node_id),
            Err(e) => {
                debug!(ref_id = %query.ref_id, error = %e, "Query rejected before grouping");
                failures.push((index, e.to_status_error()));
            }
        }
    }

    GroupPlan { groups, failures }
}

/// Derives the raw history key and node id of a query.
pub fn raw_read_key<R>(query: &OpcUaQuery, namespaces: &R) -> OpcUaResult<(ReadRawDetails, NodeId)>
where
    R: NamespaceResolver + ?Sized,
{
    let node_id = decode_node_id(&query.node_id, namespaces)?;
    let details = ReadRawDetails {
        start: query.time_range.start()?,
        end: query.time_range.end()?,
        max_values: query.max_values(),
    };
    Ok((details, node_id))
}

/// Derives the processed history key and node id of a query.
///
/// The aggregate's node id is itself portable and is decoded too.
pub fn processed_read_key<R>(
    query: &OpcUaQuery,
    namespaces: &R,
) -> OpcUaResult<(ReadProcessedDetails, NodeId)>
where
    R: NamespaceResolver + ?Sized,
{
    let node_id = decode_node_id(&query.node_id, namespaces)?;
    let aggregate = query.aggregate_definition()?;
    let details = ReadProcessedDetails {
        start: query.time_range.start()?,
        end: query.time_range.end()?,
        aggregate: decode_node_id(&aggregate.node_id, namespaces)?,
        interval: query.interval(),
    };
    Ok((details, node_id))
}

/// Plans raw history reads for a batch.
pub fn plan_raw_reads<R>(queries: &[&OpcUaQuery], namespaces: &R) -> GroupPlan<ReadRawDetails>
where
    R: NamespaceResolver + ?Sized,
{
    let plan = plan_groups(queries, |query| raw_read_key(query, namespaces));
    debug!(
        queries = queries.len(),
        calls = plan.call_count(),
        rejected = plan.failures.len(),
        "Planned raw history reads"
    );
    plan
}

/// Plans processed history reads for a batch.
pub fn plan_processed_reads<R>(
    queries: &[&OpcUaQuery],
    namespaces: &R,
) -> GroupPlan<ReadProcessedDetails>
where
    R: NamespaceResolver + ?Sized,
{
    let plan = plan_groups(queries, |query| processed_read_key(query, namespaces));
    debug!(
        queries = queries.len(),
        calls = plan.call_count(),
        rejected = plan.failures.len(),
        "Planned processed history reads"
    );
    plan
}

// =============================================================================
// ResultSlots
// =============================================================================

/// Per-query result positions of one batch.
#[derive(Debug)]
pub struct ResultSlots<T> {
    slots: Vec<Option<QueryResult<T>>>,
}

impl<T> ResultSlots<T> {
    /// Creates `len` empty slots.
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| None).collect(),
        }
    }

    /// Fills one slot.
    pub fn fill(&mut self, index: usize, result: QueryResult<T>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(result);
        }
    }

    /// Fills the slots of rejected queries.
    pub fn fail_all(&mut self, failures: Vec<(usize, StatusError)>) {
        for (index, error) in failures {
            self.fill(index, Err(error));
        }
    }

    /// Writes `convert(i, values[i])` into slot `indices[i]`.
    ///
    /// # Errors
    ///
    /// Fails without writing anything if the counts differ.
    pub fn scatter<V, F>(
        &mut self,
        service: &str,
        indices: &[usize],
        values: Vec<V>,
        mut convert: F,
    ) -> OpcUaResult<()>
    where
        F: FnMut(usize, V) -> QueryResult<T>,
    {
        if values.len() != indices.len() {
            return Err(OpcUaError::operation(OperationError::result_count_mismatch(
                service,
                indices.len(),
                values.len(),
            )));
        }
        for (position, (&index, value)) in indices.iter().zip(values).enumerate() {
            let result = convert(position, value);
            self.fill(index, result);
        }
        Ok(())
    }

    /// Returns the results in batch order.
    ///
    /// Slots never filled hold `missing`.
    pub fn into_results(self, missing: StatusError) -> Vec<QueryResult<T>> {
        self.slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(missing.clone())))
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::NodeDefinition;
    use std::time::Duration;
    use uaq_opcua::{NamespaceTable, StatusCode};

    fn namespaces() -> NamespaceTable {
        NamespaceTable::from_uris(["urn:server", "urn:plant"])
    }

    fn raw(ref_id: &str, node: &str, from: i64, to: i64, max: i64) -> OpcUaQuery {
        OpcUaQuery::new(ref_id, "ReadDataRaw", node)
            .with_time_range(from, to)
            .with_max_data_points(max)
    }

    #[test]
    fn test_groups_keep_first_appearance_order() {
        let mut groups = QueryGroups::new();
        groups.insert("b", 0, NodeId::numeric(0, 1));
        groups.insert("a", 1, NodeId::numeric(0, 2));
        groups.insert("b", 2, NodeId::numeric(0, 3));

        let keys: Vec<_> = groups.iter().map(|g| g.key).collect();
        assert_eq!(keys, ["b", "a"]);

        let b = groups.get(&"b").unwrap();
        assert_eq!(b.indices, vec![0, 2]);
        assert_eq!(b.node_ids, vec![NodeId::numeric(0, 1), NodeId::numeric(0, 3)]);
    }

    #[test]
    fn test_raw_reads_group_by_range_and_limit() {
        let q1 = raw("Q1", "ns=2;s=A", 0, 1000, 10);
        let q2 = raw("Q2", "ns=2;s=B", 0, 1000, 10);
        let q3 = raw("Q3", "ns=2;s=C", 500, 1500, 10);
        let plan = plan_raw_reads(&[&q1, &q2, &q3], &namespaces());

        assert_eq!(plan.call_count(), 2);
        assert!(plan.failures.is_empty());

        let groups: Vec<_> = plan.groups.iter().collect();
        assert_eq!(groups[0].indices, vec![0, 1]);
        assert_eq!(groups[0].key.max_values, 10);
        assert_eq!(groups[1].indices, vec![2]);
        assert_eq!(groups[1].node_ids, vec![NodeId::string(2, "C")]);
    }

    #[test]
    fn test_max_values_separates_groups() {
        let q1 = raw("Q1", "i=1", 0, 1000, 10);
        let q2 = raw("Q2", "i=2", 0, 1000, 20);
        let plan = plan_raw_reads(&[&q1, &q2], &namespaces());
        assert_eq!(plan.call_count(), 2);
    }

    #[test]
    fn test_bad_node_id_fails_only_its_query() {
        let q1 = raw("Q1", "i=1", 0, 1000, 10);
        let q2 = raw(
            "Q2",
            r#"{"id":"i=5","namespaceUrl":"urn:unknown"}"#,
            0,
            1000,
            10,
        );
        let q3 = raw("Q3", "i=3", 0, 1000, 10);
        let plan = plan_raw_reads(&[&q1, &q2, &q3], &namespaces());

        assert_eq!(plan.call_count(), 1);
        assert_eq!(plan.groups.iter().next().unwrap().indices, vec![0, 2]);
        assert_eq!(plan.failures.len(), 1);
        assert_eq!(plan.failures[0].0, 1);
        assert_eq!(plan.failures[0].1.status, StatusCode::BAD_NODE_ID_UNKNOWN);
    }

    #[test]
    fn test_processed_reads_key_on_aggregate_and_interval() {
        let base = |ref_id: &str, agg: &str, interval: i64| {
            OpcUaQuery::new(ref_id, "ReadDataProcessed", "ns=2;s=A")
                .with_time_range(0, 60_000)
                .with_interval_ms(interval)
                .with_aggregate(NodeDefinition::new("agg", agg))
        };
        let q1 = base("Q1", "i=2342", 1000);
        let q2 = base("Q2", "i=2342", 1000);
        let q3 = base("Q3", "i=2347", 1000);
        let q4 = base("Q4", "i=2342", 5000);
        let plan = plan_processed_reads(&[&q1, &q2, &q3, &q4], &namespaces());

        assert_eq!(plan.call_count(), 3);
        let first = plan.groups.iter().next().unwrap();
        assert_eq!(first.indices, vec![0, 1]);
        assert_eq!(first.key.aggregate, NodeId::numeric(0, 2342));
        assert_eq!(first.key.interval, Duration::from_secs(1));
    }

    #[test]
    fn test_processed_read_without_aggregate_is_rejected() {
        let q = OpcUaQuery::new("Q1", "ReadDataProcessed", "i=1").with_time_range(0, 1);
        let plan = plan_processed_reads(&[&q], &namespaces());
        assert_eq!(plan.call_count(), 0);
        assert_eq!(plan.failures.len(), 1);
    }

    #[test]
    fn test_result_slots_scatter() {
        let mut slots: ResultSlots<u32> = ResultSlots::new(3);
        slots
            .scatter("HistoryRead", &[2, 0], vec![20, 0], |_, v| Ok(v))
            .unwrap();

        let err = slots
            .scatter("HistoryRead", &[1], Vec::<u32>::new(), |_, v| Ok(v))
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_UNKNOWN_RESPONSE);

        let results = slots.into_results(StatusError::new(StatusCode::BAD_NOTHING_TO_DO, "unset"));
        assert_eq!(results[0], Ok(0));
        assert!(results[1].is_err());
        assert_eq!(results[2], Ok(20));
    }
}
