// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Event filter compiler.
//!
//! Turns a query's [`EventQuery`] into a native [`EventFilter`]:
//!
//! ```text
//! eventColumns[i]  ──>  select_clauses[i] = (BaseEventType, browsePath, Value)
//! eventFilters[j]  ──>  where_clause.elements[j] = (oper, operands)
//!
//! operand tag 0  Literal          typeId == i=17 ? NodeId(value) : String(value)
//!             1  Element          index
//!             2  Attribute        rejected
//!             3  SimpleAttribute  typeId (blank = any) + browsePath
//!             *  rejected
//! ```
//!
//! Order is preserved on both sides. Duplicate columns stay duplicated and
//! clauses are pushed as given, with no reordering.

use tracing::trace;

use uaq_opcua::{
    AttributeId, EventFilter, FilterError, FilterOperand, FilterOperator, NamespaceResolver, NodeId,
    OpcUaError, OpcUaResult, OpcUaValue, SimpleAttributeOperand, browse_path_to_native,
    decode_node_id,
};

use crate::query::{
    ElementOp, EventQuery, FilterOperandSpec, LiteralOp, OperandTag, SimpleAttributeOp,
};

/// Compiles an event query against a session's namespace table.
///
/// # Errors
///
/// Any unresolvable browse path, unknown operator or unsupported operand
/// makes the whole filter fail.
pub fn compile_event_filter<R>(event_query: &EventQuery, namespaces: &R) -> OpcUaResult<EventFilter>
where
    R: NamespaceResolver + ?Sized,
{
    let mut filter = EventFilter::new();

    for column in &event_query.event_columns {
        let browse_path = browse_path_to_native(&column.browse_path, namespaces)?;
        filter.add_select_clause(NodeId::BASE_EVENT_TYPE, browse_path, AttributeId::Value);
    }

    for clause in &event_query.event_filters {
        let operator = FilterOperator::try_from(clause.oper)?;
        let operands = clause
            .operands
            .iter()
            .map(|operand| compile_operand(operand, namespaces))
            .collect::<OpcUaResult<Vec<_>>>()?;
        filter.where_clause.push(operator, operands);
    }

    trace!(
        select_clauses = filter.select_clauses.len(),
        where_elements = filter.where_clause.len(),
        "Compiled event filter"
    );
    Ok(filter)
}

/// Compiles one operand, dispatching on its type tag.
pub fn compile_operand<R>(operand: &FilterOperandSpec, namespaces: &R) -> OpcUaResult<FilterOperand>
where
    R: NamespaceResolver + ?Sized,
{
    match OperandTag::from_value(operand.kind) {
        Some(OperandTag::Literal) => {
            literal_operand(&operand.decode_payload::<LiteralOp>("literal")?, namespaces)
        }
        Some(OperandTag::Element) => {
            let element: ElementOp = operand.decode_payload("element")?;
            Ok(FilterOperand::Element(element.index))
        }
        Some(OperandTag::SimpleAttribute) => simple_attribute_operand(
            &operand.decode_payload::<SimpleAttributeOp>("simple attribute")?,
            namespaces,
        ),
        Some(OperandTag::Attribute) => {
            Err(OpcUaError::filter(FilterError::AttributeOperandUnsupported))
        }
        None => Err(OpcUaError::filter(FilterError::unsupported_operand(
            operand.kind,
        ))),
    }
}

fn literal_operand<R>(literal: &LiteralOp, namespaces: &R) -> OpcUaResult<FilterOperand>
where
    R: NamespaceResolver + ?Sized,
{
    if !literal.type_id.trim().is_empty() {
        let type_id = decode_node_id(&literal.type_id, namespaces)?;
        if type_id == NodeId::NODE_ID_DATA_TYPE {
            let node_id = decode_node_id(&literal.value, namespaces)?;
            return Ok(FilterOperand::Literal(OpcUaValue::NodeId(node_id)));
        }
    }
    Ok(FilterOperand::Literal(OpcUaValue::String(literal.value.clone())))
}

fn simple_attribute_operand<R>(
    operand: &SimpleAttributeOp,
    namespaces: &R,
) -> OpcUaResult<FilterOperand>
where
    R: NamespaceResolver + ?Sized,
{
    let type_definition_id = match operand.type_id.as_deref().map(str::trim) {
        Some(type_id) if !type_id.is_empty() => Some(decode_node_id(type_id, namespaces)?),
        _ => None,
    };
    let browse_path = browse_path_to_native(&operand.browse_path, namespaces)?;
    Ok(FilterOperand::SimpleAttribute(SimpleAttributeOperand::new(
        type_definition_id,
        browse_path,
    )))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{EventColumn, EventFilterClause};
    use uaq_opcua::{NamespaceTable, PortableQualifiedName, QualifiedName, StatusCode};

    fn namespaces() -> NamespaceTable {
        NamespaceTable::from_uris(["urn:server", "urn:example"])
    }

    fn column(name: &str) -> EventColumn {
        EventColumn::new(vec![PortableQualifiedName::standard(name)])
    }

    #[test]
    fn test_select_clause_order_and_duplicates() {
        let query = EventQuery {
            event_columns: vec![column("Time"), column("Message"), column("Time")],
            event_filters: vec![],
        };
        let filter = compile_event_filter(&query, &namespaces()).unwrap();

        let paths: Vec<String> = filter.select_clauses.iter().map(|c| c.path_string()).collect();
        assert_eq!(paths, ["Time", "Message", "Time"]);
        for clause in &filter.select_clauses {
            assert_eq!(clause.type_definition_id, Some(NodeId::BASE_EVENT_TYPE));
            assert_eq!(clause.attribute_id, AttributeId::Value);
        }
        assert!(filter.where_clause.is_empty());
    }

    #[test]
    fn test_select_path_resolves_namespace() {
        let query = EventQuery {
            event_columns: vec![EventColumn::new(vec![
                PortableQualifiedName::new("Alarm", "urn:example"),
                PortableQualifiedName::standard("Severity"),
            ])],
            event_filters: vec![],
        };
        let filter = compile_event_filter(&query, &namespaces()).unwrap();
        assert_eq!(
            filter.select_clauses[0].browse_path,
            vec![QualifiedName::new(2, "Alarm"), QualifiedName::new(0, "Severity")]
        );
    }

    #[test]
    fn test_where_clause_order() {
        let query = EventQuery {
            event_columns: vec![],
            event_filters: vec![
                EventFilterClause::new(
                    FilterOperator::And.value(),
                    vec![FilterOperandSpec::element(1), FilterOperandSpec::element(2)],
                ),
                EventFilterClause::new(
                    FilterOperator::GreaterThan.value(),
                    vec![
                        FilterOperandSpec::simple_attribute(
                            None,
                            vec![PortableQualifiedName::standard("Severity")],
                        ),
                        FilterOperandSpec::literal("i=5", "500"),
                    ],
                ),
                EventFilterClause::new(
                    FilterOperator::OfType.value(),
                    vec![FilterOperandSpec::literal("i=17", "i=2041")],
                ),
            ],
        };
        let filter = compile_event_filter(&query, &namespaces()).unwrap();
        let operators: Vec<_> = filter
            .where_clause
            .elements()
            .iter()
            .map(|e| e.operator)
            .collect();
        assert_eq!(
            operators,
            [FilterOperator::And, FilterOperator::GreaterThan, FilterOperator::OfType]
        );
        assert_eq!(
            filter.where_clause.element(1).unwrap().operands[1],
            FilterOperand::Literal(OpcUaValue::String("500".to_string()))
        );
        assert_eq!(
            filter.where_clause.element(2).unwrap().operands[0],
            FilterOperand::Literal(OpcUaValue::NodeId(NodeId::BASE_EVENT_TYPE))
        );
    }

    #[test]
    fn test_node_id_literal_is_decoded() {
        let portable = r#"{"id":"n2;i=1001","namespaceUrl":"urn:example"}"#;
        let operand = FilterOperandSpec::literal("i=17", portable);
        let compiled = compile_operand(&operand, &namespaces()).unwrap();
        assert_eq!(
            compiled,
            FilterOperand::Literal(OpcUaValue::NodeId(NodeId::numeric(2, 1001)))
        );
    }

    #[test]
    fn test_simple_attribute_blank_type_id() {
        let operand = FilterOperandSpec::simple_attribute(
            Some("  ".to_string()),
            vec![PortableQualifiedName::standard("Message")],
        );
        match compile_operand(&operand, &namespaces()).unwrap() {
            FilterOperand::SimpleAttribute(attr) => {
                assert!(attr.type_definition_id.is_none());
                assert_eq!(attr.path_string(), "Message");
            }
            other => panic!("unexpected operand: {:?}", other),
        }

        let typed = FilterOperandSpec::simple_attribute(
            Some("i=2041".to_string()),
            vec![PortableQualifiedName::standard("Message")],
        );
        match compile_operand(&typed, &namespaces()).unwrap() {
            FilterOperand::SimpleAttribute(attr) => {
                assert_eq!(attr.type_definition_id, Some(NodeId::BASE_EVENT_TYPE));
            }
            other => panic!("unexpected operand: {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_operands_fail() {
        let attribute = FilterOperandSpec {
            kind: 2,
            value: serde_json::json!({}),
        };
        let err = compile_operand(&attribute, &namespaces()).unwrap_err();
        assert!(matches!(
            err,
            OpcUaError::Filter(FilterError::AttributeOperandUnsupported)
        ));

        let unknown = FilterOperandSpec {
            kind: 9,
            value: serde_json::json!({}),
        };
        let err = compile_operand(&unknown, &namespaces()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_FILTER_OPERAND_INVALID);
    }

    #[test]
    fn test_bad_operand_fails_whole_filter() {
        let query = EventQuery {
            event_columns: vec![column("Time")],
            event_filters: vec![EventFilterClause::new(
                0,
                vec![FilterOperandSpec {
                    kind: 7,
                    value: serde_json::json!("{}"),
                }],
            )],
        };
        assert!(compile_event_filter(&query, &namespaces()).is_err());
    }

    #[test]
    fn test_unknown_operator_and_namespace_fail() {
        let query = EventQuery {
            event_columns: vec![],
            event_filters: vec![EventFilterClause::new(99, vec![])],
        };
        let err = compile_event_filter(&query, &namespaces()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_EVENT_FILTER_INVALID);

        let query = EventQuery {
            event_columns: vec![EventColumn::new(vec![PortableQualifiedName::new(
                "Alarm",
                "urn:missing",
            )])],
            event_filters: vec![],
        };
        let err = compile_event_filter(&query, &namespaces()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_NODE_ID_UNKNOWN);
    }
}
