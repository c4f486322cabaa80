// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Native event filter model.
//!
//! ```text
//! EventFilter
//! ├── select_clauses: [SimpleAttributeOperand]   fields returned per event
//! └── where_clause:   ContentFilter
//!                     └── elements: [ContentFilterElement]
//!                                   ├── operator
//!                                   └── operands: [FilterOperand]
//!                                                 ├── Literal(value)
//!                                                 ├── Element(index)  -> elements[index]
//!                                                 └── SimpleAttribute(..)
//! ```
//!
//! Element 0 of the where clause is the root of the expression tree.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::browse::{QualifiedName, browse_path_string};
use crate::client::OpcUaValue;
use crate::error::{FilterError, OpcUaError};
use crate::types::{AttributeId, NodeId};

// =============================================================================
// FilterOperator
// =============================================================================

/// Content filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
#[allow(missing_docs)]
pub enum FilterOperator {
    Equals,
    IsNull,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Like,
    Not,
    Between,
    InList,
    And,
    Or,
    Cast,
    InView,
    OfType,
    RelatedTo,
    BitwiseAnd,
    BitwiseOr,
}

impl FilterOperator {
    /// Returns the OPC UA numeric value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::Equals => 0,
            Self::IsNull => 1,
            Self::GreaterThan => 2,
            Self::LessThan => 3,
            Self::GreaterThanOrEqual => 4,
            Self::LessThanOrEqual => 5,
            Self::Like => 6,
            Self::Not => 7,
            Self::Between => 8,
            Self::InList => 9,
            Self::And => 10,
            Self::Or => 11,
            Self::Cast => 12,
            Self::InView => 13,
            Self::OfType => 14,
            Self::RelatedTo => 15,
            Self::BitwiseAnd => 16,
            Self::BitwiseOr => 17,
        }
    }

    /// Creates from OPC UA value.
    pub fn from_value(value: u32) -> Option<Self> {
        Some(match value {
            0 => Self::Equals,
            1 => Self::IsNull,
            2 => Self::GreaterThan,
            3 => Self::LessThan,
            4 => Self::GreaterThanOrEqual,
            5 => Self::LessThanOrEqual,
            6 => Self::Like,
            7 => Self::Not,
            8 => Self::Between,
            9 => Self::InList,
            10 => Self::And,
            11 => Self::Or,
            12 => Self::Cast,
            13 => Self::InView,
            14 => Self::OfType,
            15 => Self::RelatedTo,
            16 => Self::BitwiseAnd,
            17 => Self::BitwiseOr,
            _ => return None,
        })
    }
}

impl TryFrom<u32> for FilterOperator {
    type Error = OpcUaError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_value(value)
            .ok_or_else(|| OpcUaError::filter(FilterError::unsupported_operator(value)))
    }
}

impl From<FilterOperator> for u32 {
    fn from(op: FilterOperator) -> Self {
        op.value()
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// Operands
// =============================================================================

/// Attribute of an event field, addressed by type and browse path.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleAttributeOperand {
    /// Event type the path starts from; `None` means any type.
    pub type_definition_id: Option<NodeId>,

    /// Browse path from the event type to the field.
    pub browse_path: Vec<QualifiedName>,

    /// Attribute to read.
    pub attribute_id: AttributeId,
}

impl SimpleAttributeOperand {
    /// Creates an operand reading the `Value` attribute.
    pub fn new(type_definition_id: Option<NodeId>, browse_path: Vec<QualifiedName>) -> Self {
        Self {
            type_definition_id,
            browse_path,
            attribute_id: AttributeId::Value,
        }
    }

    /// Returns the browse path in `a/b/c` form.
    pub fn path_string(&self) -> String {
        browse_path_string(&self.browse_path)
    }
}

/// One operand of a content filter element.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOperand {
    /// Constant value.
    Literal(OpcUaValue),

    /// Reference to another element of the same filter.
    Element(u32),

    /// Event field reference.
    SimpleAttribute(SimpleAttributeOperand),
}

// =============================================================================
// ContentFilter
// =============================================================================

/// One operator applied to its operands.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentFilterElement {
    /// Operator.
    pub operator: FilterOperator,

    /// Operands in declaration order.
    pub operands: Vec<FilterOperand>,
}

/// Ordered list of filter elements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContentFilter {
    elements: Vec<ContentFilterElement>,
}

impl ContentFilter {
    /// Creates an empty content filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an element and returns its index.
    pub fn push(&mut self, operator: FilterOperator, operands: Vec<FilterOperand>) -> u32 {
        self.elements.push(ContentFilterElement { operator, operands });
        (self.elements.len() - 1) as u32
    }

    /// Returns the elements.
    pub fn elements(&self) -> &[ContentFilterElement] {
        &self.elements
    }

    /// Returns the element at `index`.
    pub fn element(&self, index: u32) -> Option<&ContentFilterElement> {
        self.elements.get(index as usize)
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the filter has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

// =============================================================================
// EventFilter
// =============================================================================

/// Event filter: fields to select plus an optional where clause.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventFilter {
    /// Fields returned for each event, in order.
    pub select_clauses: Vec<SimpleAttributeOperand>,

    /// Event predicate. An empty where clause matches every event.
    pub where_clause: ContentFilter,
}

impl EventFilter {
    /// Creates an empty event filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a select clause.
    pub fn add_select_clause(
        &mut self,
        type_definition_id: NodeId,
        browse_path: Vec<QualifiedName>,
        attribute_id: AttributeId,
    ) {
        self.select_clauses.push(SimpleAttributeOperand {
            type_definition_id: Some(type_definition_id),
            browse_path,
            attribute_id,
        });
    }
}

// =============================================================================
// Tests
// =============================================================================
