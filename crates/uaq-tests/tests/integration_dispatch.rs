// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! End-to-end dispatch tests against the plant fixture.

use std::sync::Arc;

use serde_json::json;
use uaq_opcua::{DataValue, EventResults, FilterOperator, NodeId, OpcUaValue, StatusCode};
use uaq_query::{
    DispatchOptions, OpcUaQuery, QueryDataResponse, QueryDispatcher, UnknownReadTypePolicy,
};
use uaq_tests::prelude::*;

// =============================================================================
// Helpers
// =============================================================================

struct Harness {
    connection: Arc<MockConnection>,
    provider: Arc<MockConnectionProvider>,
    dispatcher: QueryDispatcher,
}

impl Harness {
    fn new() -> Self {
        Self::with_server(PlantFixture::server(), DispatchOptions::default())
    }

    fn with_server(server: uaq_opcua::MemoryServer, options: DispatchOptions) -> Self {
        init_test_logging();
        let connection = Arc::new(MockConnection::new(server));
        let provider = Arc::new(MockConnectionProvider::new(connection.clone()));
        let dispatcher = QueryDispatcher::new(provider.clone()).with_options(options);
        Self {
            connection,
            provider,
            dispatcher,
        }
    }

    async fn run(&self, queries: Vec<OpcUaQuery>) -> QueryDataResponse {
        self.dispatcher.query_data(&request(queries)).await
    }
}

fn values(response: &QueryDataResponse, ref_id: &str, field: &str) -> Vec<serde_json::Value> {
    let result = response.get(ref_id).expect("entry present");
    let data = result.as_ref().expect("query succeeded");
    data.frame()
        .and_then(|frame| frame.field(field))
        .map(|f| f.values.clone())
        .unwrap_or_default()
}

fn status(response: &QueryDataResponse, ref_id: &str) -> StatusCode {
    response
        .get(ref_id)
        .expect("entry present")
        .as_ref()
        .expect_err("query failed")
        .status
}

// =============================================================================
// Point Reads
// =============================================================================

#[tokio::test]
async fn test_read_node_single_call() {
    let harness = Harness::new();
    let response = harness
        .run(vec![
            QueryBuilder::read_node("A", PlantFixture::pump_speed()).build(),
            QueryBuilder::read_node("B", PlantFixture::line_counter()).build(),
            QueryBuilder::read_node("C", PlantFixture::missing_node()).build(),
        ])
        .await;

    assert_eq!(response.len(), 3);
    assert_eq!(values(&response, "A", "Value"), vec![json!(1450.0)]);
    assert_eq!(values(&response, "B", "Value"), vec![json!(9)]);
    assert_eq!(status(&response, "C"), StatusCode::BAD_NODE_ID_UNKNOWN);
    assert_eq!(harness.connection.session.calls_to(Service::Read).len(), 1);
}

#[tokio::test]
async fn test_undecodable_node_id_isolated() {
    let harness = Harness::new();
    let response = harness
        .run(vec![
            QueryBuilder::read_node("A", PlantFixture::pump_speed()).build(),
            QueryBuilder::read_node("B", portable_string("X", "urn:unknown")).build(),
            QueryBuilder::read_node("C", "not a node id").build(),
        ])
        .await;

    assert!(response.get("A").is_some_and(|r| r.is_ok()));
    assert!(response.get("B").is_some_and(|r| r.is_err()));
    assert!(response.get("C").is_some_and(|r| r.is_err()));

    let calls = harness.connection.session.calls_to(Service::Read);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].node_ids().len(), 1);
}

#[tokio::test]
async fn test_subscribe_uses_subscription_values() {
    let harness = Harness::new();
    let speed = NodeId::string(1, "Pump1.Speed");
    harness
        .connection
        .values
        .set(speed.clone(), DataValue::at(OpcUaValue::Double(1500.0), ts(9)));

    let response = harness
        .run(vec![
            QueryBuilder::subscribe("A", PlantFixture::pump_speed()).build(),
            QueryBuilder::subscribe("B", PlantFixture::pump_temp()).build(),
        ])
        .await;

    assert_eq!(values(&response, "A", "Value"), vec![json!(1500.0)]);
    assert_eq!(status(&response, "B"), StatusCode::BAD_NODE_ID_UNKNOWN);
    assert_eq!(harness.connection.values.lookups().len(), 1);
    assert_eq!(harness.connection.session.call_count(), 0);
}

#[tokio::test]
async fn test_subscription_failure_fans_out() {
    let harness = Harness::new();
    harness.connection.values.fail();

    let response = harness
        .run(vec![
            QueryBuilder::subscribe("A", PlantFixture::pump_speed()).build(),
            QueryBuilder::subscribe("B", PlantFixture::pump_temp()).build(),
            QueryBuilder::read_node("C", PlantFixture::pump_temp()).build(),
        ])
        .await;

    assert_eq!(status(&response, "A"), status(&response, "B"));
    assert!(response.get("C").is_some_and(|r| r.is_ok()));
}

// =============================================================================
// History
// =============================================================================

#[tokio::test]
async fn test_raw_reads_grouped_by_details() {
    let harness = Harness::new();
    let response = harness
        .run(vec![
            QueryBuilder::raw("A", PlantFixture::pump_speed()).minutes(0, 4).build(),
            QueryBuilder::raw("B", PlantFixture::line_counter()).minutes(5, 9).build(),
            QueryBuilder::raw("C", PlantFixture::pump_temp()).minutes(0, 4).build(),
        ])
        .await;

    let calls = harness.connection.session.calls_to(Service::HistoryReadRaw);
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].node_ids().len(), 2);
    assert_eq!(calls[1].node_ids().len(), 1);

    assert_eq!(
        values(&response, "A", "Value"),
        vec![json!(1400.0), json!(1410.0), json!(1420.0), json!(1430.0), json!(1440.0)]
    );
    assert_eq!(
        values(&response, "B", "Value"),
        (5..=9).map(|m| json!(m)).collect::<Vec<_>>()
    );
    assert_eq!(values(&response, "C", "Value")[0], json!(40.0));
    assert_eq!(values(&response, "C", "Time")[0], json!(epoch_ms(0)));
}

#[tokio::test]
async fn test_raw_max_data_points_splits_groups() {
    let harness = Harness::new();
    let response = harness
        .run(vec![
            QueryBuilder::raw("A", PlantFixture::pump_speed()).max_data_points(3).build(),
            QueryBuilder::raw("B", PlantFixture::pump_temp()).max_data_points(3).build(),
            QueryBuilder::raw("C", PlantFixture::line_counter()).build(),
        ])
        .await;

    assert_eq!(harness.connection.session.calls_to(Service::HistoryReadRaw).len(), 2);
    assert_eq!(values(&response, "A", "Value").len(), 3);
    assert_eq!(values(&response, "B", "Value").len(), 3);
    assert_eq!(values(&response, "C", "Value").len(), HISTORY_MINUTES as usize);
}

#[tokio::test]
async fn test_processed_average() {
    let harness = Harness::new();
    let response = harness
        .run(vec![
            QueryBuilder::processed("A", PlantFixture::pump_temp())
                .minutes(0, 10)
                .interval_ms(5 * 60_000)
                .aggregate("Average", "i=2342")
                .build(),
        ])
        .await;

    assert_eq!(values(&response, "A", "Value"), vec![json!(42.0), json!(47.0)]);
    assert_eq!(
        harness
            .connection
            .session
            .calls_to(Service::HistoryReadProcessed)
            .len(),
        1
    );
}

#[tokio::test]
async fn test_processed_groups_by_aggregate() {
    let harness = Harness::new();
    harness
        .run(vec![
            QueryBuilder::processed("A", PlantFixture::pump_temp())
                .aggregate("Average", "i=2342")
                .build(),
            QueryBuilder::processed("B", PlantFixture::pump_speed())
                .aggregate("Maximum", "i=2347")
                .build(),
            QueryBuilder::processed("C", PlantFixture::pump_speed())
                .aggregate("Average", "i=2342")
                .build(),
        ])
        .await;

    let calls = harness
        .connection
        .session
        .calls_to(Service::HistoryReadProcessed);
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].node_ids().len(), 2);
}

// =============================================================================
// Failure Isolation
// =============================================================================

#[tokio::test]
async fn test_partition_failure_isolated() {
    let harness = Harness::new();
    harness.connection.session.fail(Service::HistoryReadRaw);

    let response = harness
        .run(vec![
            QueryBuilder::raw("A", PlantFixture::pump_speed()).build(),
            QueryBuilder::read_node("B", PlantFixture::pump_speed()).build(),
            QueryBuilder::raw("C", PlantFixture::pump_temp()).build(),
        ])
        .await;

    assert_eq!(response.len(), 3);
    assert!(response.get("A").is_some_and(|r| r.is_err()));
    assert!(response.get("C").is_some_and(|r| r.is_err()));
    assert_eq!(
        response.get("A").and_then(|r| r.as_ref().err()).map(|e| e.message.clone()),
        response.get("C").and_then(|r| r.as_ref().err()).map(|e| e.message.clone()),
    );
    assert_eq!(values(&response, "B", "Value"), vec![json!(1450.0)]);
    assert!(response.connection_error.is_none());
}

#[tokio::test]
async fn test_result_count_mismatch_fans_out() {
    let harness = Harness::new();
    harness.connection.session.truncate_results(Service::Read);

    let response = harness
        .run(vec![
            QueryBuilder::read_node("A", PlantFixture::pump_speed()).build(),
            QueryBuilder::read_node("B", PlantFixture::pump_temp()).build(),
            QueryBuilder::raw("C", PlantFixture::pump_temp()).build(),
        ])
        .await;

    assert_eq!(status(&response, "A"), StatusCode::BAD_UNKNOWN_RESPONSE);
    assert_eq!(status(&response, "B"), StatusCode::BAD_UNKNOWN_RESPONSE);
    assert!(response.get("C").is_some_and(|r| r.is_ok()));
}

#[tokio::test]
async fn test_heal_restores_service() {
    let harness = Harness::new();
    harness.connection.session.fail(Service::Read);
    let query = QueryBuilder::read_node("A", PlantFixture::pump_speed()).build();

    let failed = harness.run(vec![query.clone()]).await;
    assert_eq!(failed.error_count(), 1);

    harness.connection.session.heal();
    let healed = harness.run(vec![query]).await;
    assert_eq!(healed.error_count(), 0);
}

#[tokio::test]
async fn test_connection_failure() {
    let harness = Harness::new();
    harness.provider.fail();

    let response = harness
        .run(vec![QueryBuilder::read_node("A", PlantFixture::pump_speed()).build()])
        .await;

    assert!(response.is_empty());
    let error = response.connection_error.expect("connection error");
    assert_eq!(error.status, StatusCode::BAD_COMMUNICATION_ERROR);
    assert!(error.message.contains("plant"));
    assert_eq!(harness.connection.session.call_count(), 0);
    assert_eq!(harness.provider.get_count(), 1);
}

#[tokio::test]
async fn test_provider_receives_context() {
    let harness = Harness::new();
    harness
        .run(vec![QueryBuilder::read_node("A", PlantFixture::pump_speed()).build()])
        .await;

    let contexts = harness.provider.contexts();
    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0].data_source, "plant");
}

// =============================================================================
// Unknown Read Types
// =============================================================================

#[tokio::test]
async fn test_unknown_read_type_permissive() {
    let harness = Harness::new();
    let response = harness
        .run(vec![
            QueryBuilder::new("A", "Mystery", PlantFixture::pump_speed()).build(),
            QueryBuilder::read_node("B", PlantFixture::pump_speed()).build(),
        ])
        .await;

    assert!(response.get("A").is_none());
    assert!(response.get("B").is_some_and(|r| r.is_ok()));
}

#[tokio::test]
async fn test_unknown_read_type_strict() {
    let harness = Harness::with_server(
        PlantFixture::server(),
        DispatchOptions::new().with_unknown_read_type(UnknownReadTypePolicy::Strict),
    );
    let response = harness
        .run(vec![
            QueryBuilder::new("A", "Mystery", PlantFixture::pump_speed()).build(),
            QueryBuilder::new("B", "Mystery", PlantFixture::pump_temp()).build(),
        ])
        .await;

    assert_eq!(status(&response, "A"), StatusCode::BAD_NOT_SUPPORTED);
    assert_eq!(status(&response, "B"), StatusCode::BAD_NOT_SUPPORTED);
    assert_eq!(harness.connection.session.call_count(), 0);
}

// =============================================================================
// Namespace Independence
// =============================================================================

#[tokio::test]
async fn test_portable_ids_survive_namespace_reordering() {
    let queries = vec![
        QueryBuilder::read_node("A", PlantFixture::pump_speed()).build(),
        QueryBuilder::raw("B", PlantFixture::line_counter()).minutes(2, 3).build(),
    ];

    let original = Harness::new().run(queries.clone()).await;
    let reordered = Harness::with_server(PlantFixture::server_reordered(), DispatchOptions::default())
        .run(queries)
        .await;

    assert_eq!(original.error_count(), 0);
    assert_eq!(original.get("B"), reordered.get("B"));
    assert_eq!(values(&original, "A", "Value"), values(&reordered, "A", "Value"));
}

#[tokio::test]
async fn test_batch_order_does_not_move_results() {
    let batch = vec![
        QueryBuilder::raw("A", PlantFixture::pump_speed()).minutes(0, 2).build(),
        QueryBuilder::read_node("B", PlantFixture::line_counter()).build(),
        QueryBuilder::raw("C", PlantFixture::line_counter()).minutes(5, 6).build(),
        QueryBuilder::read_node("D", PlantFixture::missing_node()).build(),
        QueryBuilder::raw("E", PlantFixture::pump_temp()).minutes(0, 2).build(),
        QueryBuilder::read_node("F", PlantFixture::pump_speed()).build(),
    ];
    let baseline = Harness::new().run(batch.clone()).await;

    let mut reversed = batch.clone();
    reversed.reverse();
    let mut interleaved = batch.clone();
    interleaved.rotate_left(3);
    interleaved.swap(0, 4);

    for permutation in [reversed, interleaved] {
        let harness = Harness::new();
        let response = harness.run(permutation).await;
        assert_eq!(response, baseline);
        assert_eq!(harness.connection.session.calls_to(Service::HistoryReadRaw).len(), 2);
        assert_eq!(harness.connection.session.calls_to(Service::Read).len(), 1);
    }

    assert_eq!(baseline.len(), 6);
    assert_eq!(
        values(&baseline, "A", "Value"),
        vec![json!(1400.0), json!(1410.0), json!(1420.0)]
    );
    assert_eq!(values(&baseline, "B", "Value"), vec![json!(9)]);
    assert_eq!(values(&baseline, "C", "Value"), vec![json!(5), json!(6)]);
    assert_eq!(status(&baseline, "D"), StatusCode::BAD_NODE_ID_UNKNOWN);
    assert_eq!(values(&baseline, "E", "Value")[0], json!(40.0));
    assert_eq!(values(&baseline, "F", "Value"), vec![json!(1450.0)]);
}

// =============================================================================
// Events
// =============================================================================

#[tokio::test]
async fn test_read_events_with_where_clause() {
    let harness = Harness::new();
    let event_query = standard_event_query()
        .compare("Severity", FilterOperator::GreaterThan, "400")
        .build();

    let response = harness
        .run(vec![
            QueryBuilder::events("A", PlantFixture::server_node())
                .event_query(event_query)
                .build(),
        ])
        .await;

    assert_eq!(
        values(&response, "A", "Message"),
        vec![json!("Pressure high"), json!("Overheat")]
    );
    assert_eq!(values(&response, "A", "Severity"), vec![json!(500), json!(800)]);

    let calls = harness
        .connection
        .session
        .calls_to(Service::HistoryReadEvents);
    assert_eq!(calls.len(), 1);
}

#[tokio::test]
async fn test_read_events_one_call_per_query() {
    let harness = Harness::new();
    let response = harness
        .run(vec![
            QueryBuilder::events("A", PlantFixture::server_node())
                .event_query(standard_event_query().build())
                .build(),
            QueryBuilder::events("B", PlantFixture::server_node())
                .minutes(0, 2)
                .event_query(standard_event_query().build())
                .build(),
        ])
        .await;

    assert_eq!(values(&response, "A", "Message").len(), 3);
    assert_eq!(values(&response, "B", "Message"), vec![json!("Pump started")]);
    assert_eq!(
        harness
            .connection
            .session
            .calls_to(Service::HistoryReadEvents)
            .len(),
        2
    );
}

#[tokio::test]
async fn test_read_events_respects_max_events() {
    let harness = Harness::with_server(
        PlantFixture::server(),
        DispatchOptions::new().with_max_events(2),
    );
    let response = harness
        .run(vec![
            QueryBuilder::events("A", PlantFixture::server_node())
                .event_query(standard_event_query().build())
                .build(),
        ])
        .await;

    assert_eq!(values(&response, "A", "Message").len(), 2);
}

#[tokio::test]
async fn test_invalid_filter_fails_only_its_query() {
    let harness = Harness::new();
    let broken = EventQueryBuilder::new()
        .select("Message")
        .clause(FilterOperator::Equals, vec![uaq_query::FilterOperandSpec {
            kind: 2,
            value: json!("{}"),
        }])
        .build();

    let response = harness
        .run(vec![
            QueryBuilder::events("A", PlantFixture::server_node())
                .event_query(broken)
                .build(),
            QueryBuilder::events("B", PlantFixture::server_node())
                .event_query(standard_event_query().build())
                .build(),
        ])
        .await;

    assert!(response.get("A").is_some_and(|r| r.is_err()));
    assert!(response.get("B").is_some_and(|r| r.is_ok()));
    assert_eq!(
        harness
            .connection
            .session
            .calls_to(Service::HistoryReadEvents)
            .len(),
        1
    );
}

#[tokio::test]
async fn test_subscribe_events_without_event_query() {
    let harness = Harness::new();
    let response = harness
        .run(vec![
            QueryBuilder::subscribe_events("A", PlantFixture::server_node()).build(),
            QueryBuilder::subscribe_events("B", PlantFixture::server_node())
                .event_query(standard_event_query().build())
                .build(),
        ])
        .await;

    let error = response
        .get("A")
        .and_then(|r| r.as_ref().err())
        .expect("missing event query rejected");
    assert_eq!(error.message, "Event query null");
    assert!(response.get("B").is_some_and(|r| r.is_ok()));
    assert_eq!(harness.connection.events.requests().len(), 1);
}

#[tokio::test]
async fn test_subscribe_events_serves_subscription_rows() {
    let harness = Harness::new();
    harness.connection.events.set(
        "A",
        Ok(EventResults::new(vec![vec![
            OpcUaValue::String("Door open".to_string()),
            OpcUaValue::UInt16(300),
        ]])),
    );

    let response = harness
        .run(vec![
            QueryBuilder::subscribe_events("A", PlantFixture::server_node())
                .event_query(EventQueryBuilder::new().select("Message").select("Severity").build())
                .build(),
        ])
        .await;

    assert_eq!(values(&response, "A", "Message"), vec![json!("Door open")]);
    assert_eq!(values(&response, "A", "Severity"), vec![json!(300)]);

    let requests = harness.connection.events.requests();
    assert_eq!(requests[0].1, NodeId::SERVER);
    assert_eq!(requests[0].2.select_clauses.len(), 2);
}

// =============================================================================
// Response Shape
// =============================================================================

#[tokio::test]
async fn test_response_json_keyed_by_ref_id() {
    let harness = Harness::new();
    let response = harness
        .run(vec![
            QueryBuilder::read_node("A", PlantFixture::pump_speed()).build(),
            QueryBuilder::read_node("B", PlantFixture::missing_node()).build(),
        ])
        .await;

    let json = response.to_json();
    assert!(json["responses"]["A"]["frames"].is_array());
    assert_eq!(json["responses"]["B"]["statusName"], "BadNodeIdUnknown");
    assert!(json["connectionError"].is_null());
}

#[tokio::test]
async fn test_duplicate_ref_id_last_write_wins() {
    let harness = Harness::new();
    let response = harness
        .run(vec![
            QueryBuilder::read_node("A", PlantFixture::pump_speed()).build(),
            QueryBuilder::raw("A", PlantFixture::pump_temp()).minutes(0, 1).build(),
        ])
        .await;

    assert_eq!(response.len(), 1);
    assert_eq!(values(&response, "A", "Value"), vec![json!(40.0), json!(41.0)]);
}
