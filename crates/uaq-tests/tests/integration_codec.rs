// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Node id, browse name and event filter translation against live
//! namespace tables.

use uaq_opcua::{
    AttributeId, FilterOperand, FilterOperator, NodeId, OpcUaSession, OpcUaValue,
    PortableQualifiedName, QualifiedName, StatusCode, browse_path_to_native,
    browse_path_to_portable, decode_node_id, encode_node_id,
};
use uaq_query::{FilterOperandSpec, compile_event_filter};
use uaq_tests::prelude::*;

// =============================================================================
// Node Ids
// =============================================================================

#[test]
fn test_portable_ids_resolve_per_session() {
    init_test_logging();
    let original = PlantFixture::server();
    let reordered = PlantFixture::server_reordered();

    let on_original = decode_node_id(&PlantFixture::pump_speed(), original.namespace_table()).unwrap();
    let on_reordered =
        decode_node_id(&PlantFixture::pump_speed(), reordered.namespace_table()).unwrap();

    assert_eq!(on_original, NodeId::string(1, "Pump1.Speed"));
    assert_eq!(on_reordered, NodeId::string(2, "Pump1.Speed"));

    let counter = decode_node_id(&PlantFixture::line_counter(), reordered.namespace_table()).unwrap();
    assert_eq!(counter, NodeId::numeric(1, 1001));
}

#[test]
fn test_encode_on_one_session_decode_on_another() {
    init_test_logging();
    let original = PlantFixture::server();
    let reordered = PlantFixture::server_reordered();

    let native = NodeId::numeric(2, 1001);
    let portable = encode_node_id(&native, original.namespace_table()).unwrap();
    assert_eq!(portable, PlantFixture::line_counter());

    let moved = decode_node_id(&portable, reordered.namespace_table()).unwrap();
    assert_eq!(moved, NodeId::numeric(1, 1001));
    assert_eq!(portable_of(&moved, reordered.namespace_table()), portable);
}

#[test]
fn test_native_ids_pass_through() {
    init_test_logging();
    let server = PlantFixture::server();

    assert_eq!(
        decode_node_id(&PlantFixture::server_node(), server.namespace_table()).unwrap(),
        NodeId::SERVER
    );
    assert_eq!(
        decode_node_id("ns=2;i=1001", server.namespace_table()).unwrap(),
        NodeId::numeric(2, 1001)
    );
}

#[test]
fn test_unknown_namespace_uri_rejected() {
    init_test_logging();
    let server = PlantFixture::server();
    let error = decode_node_id(&portable_string("X", "urn:elsewhere"), server.namespace_table())
        .unwrap_err();
    assert_eq!(error.status_code(), StatusCode::BAD_NODE_ID_UNKNOWN);
}

// =============================================================================
// Browse Names
// =============================================================================

#[test]
fn test_browse_path_follows_namespace_table() {
    init_test_logging();
    let path = vec![
        PortableQualifiedName::new("Pump1", PLANT_NS),
        PortableQualifiedName::new("Counter", LINE_NS),
        PortableQualifiedName::standard("EURange"),
    ];

    let original = browse_path_to_native(&path, PlantFixture::server().namespace_table()).unwrap();
    let reordered =
        browse_path_to_native(&path, PlantFixture::server_reordered().namespace_table()).unwrap();

    assert_eq!(
        original,
        vec![
            QualifiedName::new(1, "Pump1"),
            QualifiedName::new(2, "Counter"),
            QualifiedName::new(0, "EURange"),
        ]
    );
    assert_eq!(reordered[0], QualifiedName::new(2, "Pump1"));
    assert_eq!(reordered[1], QualifiedName::new(1, "Counter"));

    let back = browse_path_to_portable(&reordered, PlantFixture::server_reordered().namespace_table())
        .unwrap();
    assert_eq!(back[0], path[0]);
    assert_eq!(back[1], path[1]);
}

#[tokio::test]
async fn test_browse_entries_are_portable() {
    init_test_logging();
    let server = PlantFixture::server_reordered();
    let children = server.browse(&NodeId::OBJECTS_FOLDER).await.unwrap();

    let entries: Vec<_> = children
        .iter()
        .map(|child| child.to_browse_entry(server.namespace_table()).unwrap())
        .collect();

    let names: Vec<_> = entries.iter().map(|e| e.display_name.as_str()).collect();
    assert_eq!(names, ["Line2.Counter", "Pump1.Speed", "Pump1.Temp"]);

    let speed = &entries[1];
    assert_eq!(speed.node_id, PlantFixture::pump_speed());
    assert_eq!(speed.browse_name, PortableQualifiedName::new("Pump1.Speed", PLANT_NS));
    assert!(speed.is_forward);
}

// =============================================================================
// Event Filters
// =============================================================================

#[test]
fn test_compile_event_filter() {
    init_test_logging();
    let server = PlantFixture::server();
    let event_query = standard_event_query()
        .select_path(vec![PortableQualifiedName::new("Pump1", PLANT_NS)], "Pump")
        .compare("Severity", FilterOperator::GreaterThanOrEqual, "500")
        .clause(FilterOperator::Not, vec![FilterOperandSpec::element(0)])
        .build();

    let filter = compile_event_filter(&event_query, server.namespace_table()).unwrap();

    assert_eq!(filter.select_clauses.len(), 4);
    for clause in &filter.select_clauses {
        assert_eq!(clause.type_definition_id, Some(NodeId::BASE_EVENT_TYPE));
        assert_eq!(clause.attribute_id, AttributeId::Value);
    }
    assert_eq!(filter.select_clauses[3].browse_path, vec![QualifiedName::new(1, "Pump1")]);

    let elements = filter.where_clause.elements();
    assert_eq!(elements.len(), 2);
    assert_eq!(elements[0].operator, FilterOperator::GreaterThanOrEqual);
    assert_eq!(
        elements[0].operands[1],
        FilterOperand::Literal(OpcUaValue::String("500".to_string()))
    );
    assert_eq!(elements[1].operands, vec![FilterOperand::Element(0)]);
}

#[test]
fn test_node_id_literal_resolved() {
    init_test_logging();
    let server = PlantFixture::server_reordered();
    let event_query = EventQueryBuilder::new()
        .select("EventType")
        .clause(
            FilterOperator::OfType,
            vec![FilterOperandSpec::literal("i=17", PlantFixture::pump_speed())],
        )
        .build();

    let filter = compile_event_filter(&event_query, server.namespace_table()).unwrap();
    assert_eq!(
        filter.where_clause.elements()[0].operands[0],
        FilterOperand::Literal(OpcUaValue::NodeId(NodeId::string(2, "Pump1.Speed")))
    );
}

#[test]
fn test_unresolvable_path_fails_filter() {
    init_test_logging();
    let server = PlantFixture::server();
    let event_query = EventQueryBuilder::new()
        .select_path(vec![PortableQualifiedName::new("X", "urn:elsewhere")], "X")
        .build();

    assert!(compile_event_filter(&event_query, server.namespace_table()).is_err());
}

#[test]
fn test_unknown_operator_fails_filter() {
    init_test_logging();
    let server = PlantFixture::server();
    let mut event_query = standard_event_query().build();
    event_query
        .event_filters
        .push(uaq_query::EventFilterClause::new(99, vec![field_operand("Severity")]));

    let error = compile_event_filter(&event_query, server.namespace_table()).unwrap_err();
    assert_eq!(error.status_code(), StatusCode::BAD_EVENT_FILTER_INVALID);
}
