// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA query error types with status-code mapping.
//!
//! Every error in this module can be reduced to an OPC UA [`StatusCode`]
//! and a message, which is the shape returned to callers for a single
//! query slot (see [`StatusError`]).
//!
//! # Error Categories
//!
//! ```text
//! OpcUaError
//! ├── Connection    - Connection acquisition and transport issues
//! ├── Session       - Session service failures
//! ├── Filter        - Event filter construction errors
//! ├── Browse        - NodeId / QualifiedName / namespace resolution
//! ├── Operation     - Read and history operation failures
//! ├── Subscription  - Data value and event subscription errors
//! ├── Conversion    - Payload and data type conversion errors
//! └── Configuration - Invalid query settings
//! ```
//!
//! # Examples
//!
//! ```
//! use uaq_opcua::error::{BrowseError, OpcUaError};
//! use uaq_opcua::StatusCode;
//!
//! let error = OpcUaError::browse(BrowseError::unknown_namespace("urn:missing"));
//! assert_eq!(error.status_code(), StatusCode::BAD_NODE_ID_UNKNOWN);
//! assert!(!error.is_retryable());
//! ```

use std::fmt;

use thiserror::Error;
use tracing::Level;

use crate::types::{StatusCode, StatusError};

// =============================================================================
// OpcUaError - Main Error Type
// =============================================================================

/// The main error type for OPC UA query operations.
#[derive(Debug, Error)]
pub enum OpcUaError {
    /// Connection-related errors.
    #[error("{0}")]
    Connection(#[from] ConnectionError),

    /// Session service errors.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// Event filter construction errors.
    #[error("{0}")]
    Filter(#[from] FilterError),

    /// NodeId, browse name and namespace errors.
    #[error("{0}")]
    Browse(#[from] BrowseError),

    /// Read and history operation errors.
    #[error("{0}")]
    Operation(#[from] OperationError),

    /// Subscription errors.
    #[error("{0}")]
    Subscription(#[from] SubscriptionError),

    /// Data conversion errors.
    #[error("{0}")]
    Conversion(#[from] ConversionError),

    /// Configuration errors.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),
}

impl OpcUaError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Creates a connection error.
    #[inline]
    pub fn connection(error: ConnectionError) -> Self {
        Self::Connection(error)
    }

    /// Creates a session error.
    #[inline]
    pub fn session(error: SessionError) -> Self {
        Self::Session(error)
    }

    /// Creates a filter error.
    #[inline]
    pub fn filter(error: FilterError) -> Self {
        Self::Filter(error)
    }

    /// Creates a browse error.
    #[inline]
    pub fn browse(error: BrowseError) -> Self {
        Self::Browse(error)
    }

    /// Creates an operation error.
    #[inline]
    pub fn operation(error: OperationError) -> Self {
        Self::Operation(error)
    }

    /// Creates a subscription error.
    #[inline]
    pub fn subscription(error: SubscriptionError) -> Self {
        Self::Subscription(error)
    }

    /// Creates a conversion error.
    #[inline]
    pub fn conversion(error: ConversionError) -> Self {
        Self::Conversion(error)
    }

    /// Creates a configuration error.
    #[inline]
    pub fn configuration(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }

    // =========================================================================
    // Convenience Factory Methods
    // =========================================================================

    /// Creates an invalid node id error.
    pub fn invalid_node_id(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Browse(BrowseError::invalid_node_id(node_id, reason))
    }

    /// Creates an unknown namespace error.
    pub fn unknown_namespace(uri: impl Into<String>) -> Self {
        Self::Browse(BrowseError::unknown_namespace(uri))
    }

    /// Creates a read failed error.
    pub fn read_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation(OperationError::read_failed(node_id, message))
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        Self::Conversion(ConversionError::type_mismatch(expected, actual))
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns `true` if this error is retryable.
    ///
    /// Only connection and session failures are transient; codec and
    /// filter errors will fail identically on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(e) => e.is_retryable(),
            Self::Session(e) => e.is_retryable(),
            Self::Operation(e) => e.is_retryable(),
            Self::Subscription(e) => e.is_retryable(),
            Self::Filter(_) | Self::Browse(_) | Self::Conversion(_) | Self::Configuration(_) => {
                false
            }
        }
    }

    /// Returns the OPC UA status code carried to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Connection(e) => e.status_code(),
            Self::Session(e) => e.status_code(),
            Self::Filter(e) => e.status_code(),
            Self::Browse(e) => e.status_code(),
            Self::Operation(e) => e.status_code(),
            Self::Subscription(e) => e.status_code(),
            Self::Conversion(e) => e.status_code(),
            Self::Configuration(e) => e.status_code(),
        }
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Connection(_) => ErrorSeverity::Critical,
            Self::Session(_) => ErrorSeverity::Error,
            Self::Operation(e) => e.severity(),
            Self::Subscription(_) => ErrorSeverity::Error,
            Self::Filter(_) | Self::Browse(_) | Self::Conversion(_) => ErrorSeverity::Warning,
            Self::Configuration(_) => ErrorSeverity::Error,
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Session(_) => "session",
            Self::Filter(_) => "filter",
            Self::Browse(_) => "browse",
            Self::Operation(_) => "operation",
            Self::Subscription(_) => "subscription",
            Self::Conversion(_) => "conversion",
            Self::Configuration(_) => "configuration",
        }
    }

    /// Returns a unique error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Connection(e) => e.error_code(),
            Self::Session(e) => e.error_code(),
            Self::Filter(e) => e.error_code(),
            Self::Browse(e) => e.error_code(),
            Self::Operation(e) => e.error_code(),
            Self::Subscription(e) => e.error_code(),
            Self::Conversion(e) => e.error_code(),
            Self::Configuration(e) => e.error_code(),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Connection(e) => e.user_message(),
            Self::Session(e) => e.user_message(),
            Self::Filter(e) => e.user_message(),
            Self::Browse(e) => e.user_message(),
            Self::Operation(e) => e.user_message(),
            Self::Subscription(e) => e.user_message(),
            Self::Conversion(e) => e.user_message(),
            Self::Configuration(e) => e.user_message(),
        }
    }

    /// Returns the tracing level for this error.
    pub fn tracing_level(&self) -> Level {
        self.severity().to_tracing_level()
    }

    /// Logs this error with appropriate level and context.
    pub fn log(&self, context: &str) {
        let level = self.tracing_level();
        let code = self.error_code();
        let status = self.status_code();

        match level {
            Level::ERROR => tracing::error!(
                error_code = %code,
                status = %status,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                status = %status,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                status = %status,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
        }
    }

    /// Reduces this error to the status/message pair attached to a query.
    pub fn to_status_error(&self) -> StatusError {
        StatusError::new(self.status_code(), self.to_string())
    }
}

impl From<OpcUaError> for StatusError {
    fn from(error: OpcUaError) -> Self {
        error.to_status_error()
    }
}

impl From<&OpcUaError> for StatusError {
    fn from(error: &OpcUaError) -> Self {
        error.to_status_error()
    }
}

// =============================================================================
// ConnectionError
// =============================================================================

/// Connection acquisition errors.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// No connection is available.
    #[error("Not connected")]
    NotConnected,

    /// The connection could not be acquired for a data source.
    #[error("Failed to acquire connection for '{data_source}': {message}")]
    AcquireFailed {
        /// Data source identifier.
        data_source: String,
        /// Error message.
        message: String,
    },

    /// The connection was closed.
    #[error("Connection closed: {}", reason.as_deref().unwrap_or("unknown reason"))]
    Closed {
        /// Close reason.
        reason: Option<String>,
    },
}

impl ConnectionError {
    /// Creates an acquire failed error.
    pub fn acquire_failed(data_source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AcquireFailed {
            data_source: data_source.into(),
            message: message.into(),
        }
    }

    /// Creates a closed error.
    pub fn closed(reason: Option<String>) -> Self {
        Self::Closed { reason }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        true
    }

    /// Returns the status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotConnected => StatusCode::BAD_SERVER_NOT_CONNECTED,
            Self::AcquireFailed { .. } | Self::Closed { .. } => {
                StatusCode::BAD_COMMUNICATION_ERROR
            }
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotConnected => ErrorCode::new(1, 1),
            Self::AcquireFailed { .. } => ErrorCode::new(1, 2),
            Self::Closed { .. } => ErrorCode::new(1, 3),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotConnected => "서버에 연결되지 않음".to_string(),
            Self::AcquireFailed { data_source, .. } => {
                format!("연결 획득 실패: {}", data_source)
            }
            Self::Closed { .. } => "연결이 종료됨".to_string(),
        }
    }
}

// =============================================================================
// SessionError
// =============================================================================

/// Session service errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session has been closed.
    #[error("Session closed")]
    Closed,

    /// A service call failed.
    #[error("Service '{service}' failed: {message}")]
    ServiceFailed {
        /// Service name.
        service: String,
        /// Error message.
        message: String,
        /// Service result, if the server reported one.
        status_code: Option<StatusCode>,
    },
}

impl SessionError {
    /// Creates a service failed error.
    pub fn service_failed(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ServiceFailed {
            service: service.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Creates a service failed error carrying the server's service result.
    pub fn service_failed_with_status(
        service: impl Into<String>,
        message: impl Into<String>,
        status_code: StatusCode,
    ) -> Self {
        Self::ServiceFailed {
            service: service.into(),
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Closed => true,
            Self::ServiceFailed { status_code, .. } => matches!(
                status_code,
                None | Some(StatusCode::BAD_TIMEOUT) | Some(StatusCode::BAD_COMMUNICATION_ERROR)
            ),
        }
    }

    /// Returns the status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Closed => StatusCode::BAD_SESSION_CLOSED,
            Self::ServiceFailed { status_code, .. } => {
                status_code.unwrap_or(StatusCode::BAD_UNEXPECTED_ERROR)
            }
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Closed => ErrorCode::new(2, 1),
            Self::ServiceFailed { .. } => ErrorCode::new(2, 2),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Closed => "세션이 종료됨".to_string(),
            Self::ServiceFailed { service, .. } => format!("서비스 호출 실패: {}", service),
        }
    }
}

// =============================================================================
// FilterError
// =============================================================================

/// Event filter construction errors.
///
/// Any of these makes the whole filter unbuildable.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Operand type tag is not one of the supported tags.
    #[error("Unsupported filter operand type: {tag}")]
    UnsupportedOperand {
        /// The operand type tag.
        tag: u32,
    },

    /// Full attribute operands are recognized but not supported.
    #[error("Attribute operands are not supported")]
    AttributeOperandUnsupported,

    /// Operator value is not a known filter operator.
    #[error("Unsupported filter operator: {value}")]
    UnsupportedOperator {
        /// Operator value.
        value: u32,
    },

    /// Operand payload could not be decoded.
    #[error("Invalid {kind} operand payload '{payload}': {reason}")]
    InvalidOperand {
        /// Operand kind.
        kind: &'static str,
        /// The raw payload.
        payload: String,
        /// Reason.
        reason: String,
    },
}

impl FilterError {
    /// Creates an unsupported operand error.
    pub fn unsupported_operand(tag: u32) -> Self {
        Self::UnsupportedOperand { tag }
    }

    /// Creates an unsupported operator error.
    pub fn unsupported_operator(value: u32) -> Self {
        Self::UnsupportedOperator { value }
    }

    /// Creates an invalid operand error.
    pub fn invalid_operand(
        kind: &'static str,
        payload: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidOperand {
            kind,
            payload: payload.into(),
            reason: reason.into(),
        }
    }

    /// Returns the status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedOperator { .. } => StatusCode::BAD_EVENT_FILTER_INVALID,
            _ => StatusCode::BAD_FILTER_OPERAND_INVALID,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedOperand { .. } => ErrorCode::new(3, 1),
            Self::AttributeOperandUnsupported => ErrorCode::new(3, 2),
            Self::UnsupportedOperator { .. } => ErrorCode::new(3, 3),
            Self::InvalidOperand { .. } => ErrorCode::new(3, 4),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedOperand { tag } => format!("지원하지 않는 피연산자 유형: {}", tag),
            Self::AttributeOperandUnsupported => "Attribute 피연산자는 지원하지 않음".to_string(),
            Self::UnsupportedOperator { value } => format!("지원하지 않는 필터 연산자: {}", value),
            Self::InvalidOperand { kind, .. } => format!("잘못된 {} 피연산자", kind),
        }
    }
}

// =============================================================================
// BrowseError
// =============================================================================

/// NodeId, browse name and namespace resolution errors.
#[derive(Debug, Error)]
pub enum BrowseError {
    /// Node not found.
    #[error("Node not found: {node_id}")]
    NodeNotFound {
        /// The node ID that was not found.
        node_id: String,
    },

    /// Invalid node ID format.
    #[error("Invalid node ID format: '{node_id}' - {reason}")]
    InvalidNodeId {
        /// The invalid node ID.
        node_id: String,
        /// Reason.
        reason: String,
    },

    /// Namespace URI is not present in the session's namespace table.
    #[error("Namespace '{uri}' not found")]
    UnknownNamespace {
        /// The namespace URI.
        uri: String,
    },

    /// Namespace URI resolved to an index outside the 16-bit range.
    #[error("Namespace '{uri}' resolved to out-of-range index {index}")]
    NamespaceIndexExhausted {
        /// The namespace URI.
        uri: String,
        /// The resolved index.
        index: usize,
    },

    /// Namespace index has no URI in the namespace table.
    #[error("Namespace index {index} not found")]
    UnknownNamespaceIndex {
        /// The namespace index.
        index: u16,
    },

    /// Invalid browse name.
    #[error("Invalid browse name '{name}': {reason}")]
    InvalidBrowseName {
        /// The browse name.
        name: String,
        /// Reason.
        reason: String,
    },
}

impl BrowseError {
    /// Creates a node not found error.
    pub fn node_not_found(node_id: impl Into<String>) -> Self {
        Self::NodeNotFound {
            node_id: node_id.into(),
        }
    }

    /// Creates an invalid node ID error.
    pub fn invalid_node_id(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNodeId {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unknown namespace error.
    pub fn unknown_namespace(uri: impl Into<String>) -> Self {
        Self::UnknownNamespace { uri: uri.into() }
    }

    /// Creates a namespace index exhausted error.
    pub fn namespace_index_exhausted(uri: impl Into<String>, index: usize) -> Self {
        Self::NamespaceIndexExhausted {
            uri: uri.into(),
            index,
        }
    }

    /// Creates an unknown namespace index error.
    pub fn unknown_namespace_index(index: u16) -> Self {
        Self::UnknownNamespaceIndex { index }
    }

    /// Creates an invalid browse name error.
    pub fn invalid_browse_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBrowseName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns the status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NodeNotFound { .. } => StatusCode::BAD_NODE_ID_UNKNOWN,
            Self::InvalidNodeId { .. } => StatusCode::BAD_NODE_ID_INVALID,
            Self::UnknownNamespace { .. }
            | Self::NamespaceIndexExhausted { .. }
            | Self::UnknownNamespaceIndex { .. } => StatusCode::BAD_NODE_ID_UNKNOWN,
            Self::InvalidBrowseName { .. } => StatusCode::BAD_BROWSE_NAME_INVALID,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NodeNotFound { .. } => ErrorCode::new(4, 1),
            Self::InvalidNodeId { .. } => ErrorCode::new(4, 2),
            Self::UnknownNamespace { .. } => ErrorCode::new(4, 3),
            Self::NamespaceIndexExhausted { .. } => ErrorCode::new(4, 4),
            Self::UnknownNamespaceIndex { .. } => ErrorCode::new(4, 5),
            Self::InvalidBrowseName { .. } => ErrorCode::new(4, 6),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::NodeNotFound { node_id } => {
                format!("노드를 찾을 수 없음: {}", node_id)
            }
            Self::InvalidNodeId { node_id, .. } => {
                format!("잘못된 노드 ID 형식: {}", node_id)
            }
            Self::UnknownNamespace { uri } => {
                format!("네임스페이스를 찾을 수 없음: {}", uri)
            }
            Self::NamespaceIndexExhausted { uri, index } => {
                format!("네임스페이스 인덱스 범위 초과: {} ({})", uri, index)
            }
            Self::UnknownNamespaceIndex { index } => {
                format!("네임스페이스 인덱스를 찾을 수 없음: {}", index)
            }
            Self::InvalidBrowseName { name, .. } => {
                format!("잘못된 탐색 이름: {}", name)
            }
        }
    }
}

// =============================================================================
// OperationError
// =============================================================================

/// Read and history operation errors.
#[derive(Debug, Error)]
pub enum OperationError {
    /// Read operation failed.
    #[error("Read failed for node '{node_id}': {message}")]
    ReadFailed {
        /// Node ID.
        node_id: String,
        /// Error message.
        message: String,
    },

    /// Server returned a bad status for a node.
    #[error("Bad status {status_code} for node '{node_id}'")]
    BadStatus {
        /// Node ID.
        node_id: String,
        /// Status code.
        status_code: StatusCode,
    },

    /// Service returned a different number of results than requested.
    #[error("Service '{service}' returned {actual} results, expected {expected}")]
    ResultCountMismatch {
        /// Service name.
        service: String,
        /// Expected result count.
        expected: usize,
        /// Actual result count.
        actual: usize,
    },

    /// Operation not supported.
    #[error("Operation not supported: {operation}")]
    NotSupported {
        /// Operation name.
        operation: String,
    },
}

impl OperationError {
    /// Creates a read failed error.
    pub fn read_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReadFailed {
            node_id: node_id.into(),
            message: message.into(),
        }
    }

    /// Creates a bad status error.
    pub fn bad_status(node_id: impl Into<String>, status_code: StatusCode) -> Self {
        Self::BadStatus {
            node_id: node_id.into(),
            status_code,
        }
    }

    /// Creates a result count mismatch error.
    pub fn result_count_mismatch(service: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ResultCountMismatch {
            service: service.into(),
            expected,
            actual,
        }
    }

    /// Creates a not supported error.
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ReadFailed { .. } => true,
            Self::BadStatus { status_code, .. } => matches!(
                *status_code,
                StatusCode::BAD_TIMEOUT | StatusCode::BAD_COMMUNICATION_ERROR
            ),
            Self::ResultCountMismatch { .. } | Self::NotSupported { .. } => false,
        }
    }

    /// Returns the status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ReadFailed { .. } => StatusCode::BAD_UNEXPECTED_ERROR,
            Self::BadStatus { status_code, .. } => *status_code,
            Self::ResultCountMismatch { .. } => StatusCode::BAD_UNKNOWN_RESPONSE,
            Self::NotSupported { .. } => StatusCode::BAD_NOT_SUPPORTED,
        }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::BadStatus { .. } => ErrorSeverity::Warning,
            Self::ResultCountMismatch { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::ReadFailed { .. } => ErrorCode::new(5, 1),
            Self::BadStatus { .. } => ErrorCode::new(5, 2),
            Self::ResultCountMismatch { .. } => ErrorCode::new(5, 3),
            Self::NotSupported { .. } => ErrorCode::new(5, 4),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::ReadFailed { node_id, .. } => format!("읽기 실패: {}", node_id),
            Self::BadStatus {
                node_id,
                status_code,
            } => format!("잘못된 상태 코드 ({}): {}", status_code.name(), node_id),
            Self::ResultCountMismatch { service, .. } => {
                format!("서버 응답 개수 불일치: {}", service)
            }
            Self::NotSupported { operation } => format!("지원하지 않는 작업: {}", operation),
        }
    }
}

// =============================================================================
// SubscriptionError
// =============================================================================

/// Data value and event subscription errors.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// Event subscription query carried no event query.
    #[error("Event query null")]
    MissingEventQuery,

    /// Subscription call failed.
    #[error("Subscription failed: {message}")]
    Failed {
        /// Error message.
        message: String,
    },
}

impl SubscriptionError {
    /// Creates a failed error.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns the status code.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_UNKNOWN_RESPONSE
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingEventQuery => ErrorCode::new(6, 1),
            Self::Failed { .. } => ErrorCode::new(6, 2),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingEventQuery => "이벤트 쿼리가 비어 있음".to_string(),
            Self::Failed { message } => format!("구독 실패: {}", message),
        }
    }
}

// =============================================================================
// ConversionError
// =============================================================================

/// Payload and data type conversion errors.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Type mismatch.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type.
        expected: String,
        /// Actual type.
        actual: String,
    },

    /// Invalid format.
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// Error message.
        message: String,
    },

    /// Timestamp outside the representable range.
    #[error("Invalid timestamp: {epoch_ms} ms")]
    InvalidTimestamp {
        /// Milliseconds since the Unix epoch.
        epoch_ms: i64,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON error: {message}")]
    Json {
        /// Error message.
        message: String,
    },
}

impl ConversionError {
    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid timestamp error.
    pub fn invalid_timestamp(epoch_ms: i64) -> Self {
        Self::InvalidTimestamp { epoch_ms }
    }

    /// Returns the status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TypeMismatch { .. } => StatusCode::BAD_TYPE_MISMATCH,
            Self::InvalidTimestamp { .. } => StatusCode::BAD_OUT_OF_RANGE,
            Self::InvalidFormat { .. } | Self::Json { .. } => StatusCode::BAD_DECODING_ERROR,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::TypeMismatch { .. } => ErrorCode::new(7, 1),
            Self::InvalidFormat { .. } => ErrorCode::new(7, 2),
            Self::InvalidTimestamp { .. } => ErrorCode::new(7, 3),
            Self::Json { .. } => ErrorCode::new(7, 4),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::TypeMismatch { expected, actual } => {
                format!("타입 불일치: {} 예상, {} 수신", expected, actual)
            }
            Self::InvalidFormat { .. } => "잘못된 형식".to_string(),
            Self::InvalidTimestamp { epoch_ms } => format!("잘못된 타임스탬프: {}", epoch_ms),
            Self::Json { .. } => "JSON 변환 실패".to_string(),
        }
    }
}

impl From<serde_json::Error> for ConversionError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for OpcUaError {
    fn from(error: serde_json::Error) -> Self {
        Self::Conversion(error.into())
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Query settings errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Read type is not one of the supported read types.
    #[error("Unsupported read type: '{read_type}'")]
    UnsupportedReadType {
        /// The read type.
        read_type: String,
    },

    /// Required field is missing.
    #[error("Missing required field: {field}")]
    MissingField {
        /// Field name.
        field: String,
    },

    /// Field value is invalid.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field name.
        field: String,
        /// Reason.
        reason: String,
    },
}

impl ConfigurationError {
    /// Creates an unsupported read type error.
    pub fn unsupported_read_type(read_type: impl Into<String>) -> Self {
        Self::UnsupportedReadType {
            read_type: read_type.into(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedReadType { .. } => StatusCode::BAD_NOT_SUPPORTED,
            Self::MissingField { .. } | Self::InvalidValue { .. } => {
                StatusCode::BAD_DECODING_ERROR
            }
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedReadType { .. } => ErrorCode::new(8, 1),
            Self::MissingField { .. } => ErrorCode::new(8, 2),
            Self::InvalidValue { .. } => ErrorCode::new(8, 3),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedReadType { read_type } => {
                format!("지원하지 않는 읽기 유형: {}", read_type)
            }
            Self::MissingField { field } => format!("필수 필드 누락: {}", field),
            Self::InvalidValue { field, reason } => {
                format!("설정 검증 실패 ({}): {}", field, reason)
            }
        }
    }
}

// =============================================================================
// ErrorSeverity / ErrorCode
// =============================================================================

/// How loudly a failure is logged.
///
/// A per-query codec or filter failure is a `Warning`; a failure that takes
/// down a whole partition is at least an `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// One query slot failed.
    Warning,
    /// A service call or partition failed.
    Error,
    /// The session is unusable or answered inconsistently.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable log code, rendered as `UA-CCNN`.
///
/// `CC` follows the [`OpcUaError`] variant order (01 connection through
/// 08 configuration); `NN` numbers the failure within that group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Error group.
    pub category: u8,
    /// Failure within the group.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UA-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// A Result type with OpcUaError.
pub type OpcUaResult<T> = Result<T, OpcUaError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_retryable() {
        assert!(ConnectionError::NotConnected.is_retryable());
        assert!(ConnectionError::acquire_failed("ds-1", "refused").is_retryable());
        assert_eq!(
            ConnectionError::NotConnected.status_code(),
            StatusCode::BAD_SERVER_NOT_CONNECTED
        );
    }

    #[test]
    fn test_browse_error_status() {
        let error = OpcUaError::unknown_namespace("urn:missing");
        assert_eq!(error.status_code(), StatusCode::BAD_NODE_ID_UNKNOWN);
        assert!(error.to_string().contains("urn:missing"));
        assert!(!error.is_retryable());

        let error = OpcUaError::invalid_node_id("x=1", "unknown identifier type");
        assert_eq!(error.status_code(), StatusCode::BAD_NODE_ID_INVALID);
    }

    #[test]
    fn test_filter_error() {
        let error = FilterError::unsupported_operand(7);
        assert_eq!(error.status_code(), StatusCode::BAD_FILTER_OPERAND_INVALID);
        assert!(error.to_string().contains('7'));
        assert_eq!(error.error_code().to_string(), "UA-0301");
    }

    #[test]
    fn test_subscription_error_message() {
        let error = OpcUaError::subscription(SubscriptionError::MissingEventQuery);
        assert_eq!(error.to_string(), "Event query null");
        assert_eq!(error.status_code(), StatusCode::BAD_UNKNOWN_RESPONSE);
    }

    #[test]
    fn test_session_error_status() {
        let error = SessionError::service_failed_with_status(
            "HistoryRead",
            "not supported",
            StatusCode::BAD_HISTORY_OPERATION_UNSUPPORTED,
        );
        assert_eq!(
            error.status_code(),
            StatusCode::BAD_HISTORY_OPERATION_UNSUPPORTED
        );
        assert!(!error.is_retryable());
        assert!(SessionError::service_failed("Read", "boom").is_retryable());
    }

    #[test]
    fn test_status_error_conversion() {
        let error = OpcUaError::operation(OperationError::result_count_mismatch("Read", 3, 2));
        let status: StatusError = error.into();
        assert_eq!(status.status, StatusCode::BAD_UNKNOWN_RESPONSE);
        assert!(status.message.contains("expected 3"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<u32>("not json").unwrap_err();
        let error: OpcUaError = json_error.into();
        assert_eq!(error.category(), "conversion");
        assert_eq!(error.status_code(), StatusCode::BAD_DECODING_ERROR);
    }

    #[test]
    fn test_error_severity() {
        assert!(ErrorSeverity::Critical > ErrorSeverity::Error);
        assert_eq!(ErrorSeverity::Warning.to_tracing_level(), Level::WARN);
        assert_eq!(ErrorSeverity::Critical.to_string(), "critical");
    }

    #[test]
    fn test_error_code() {
        let code = ErrorCode::new(4, 3);
        assert_eq!(code.to_string(), "UA-0403");
    }

    #[test]
    fn test_user_message() {
        let error = OpcUaError::configuration(ConfigurationError::unsupported_read_type("Bogus"));
        assert!(error.user_message().contains("Bogus"));
        assert_eq!(error.status_code(), StatusCode::BAD_NOT_SUPPORTED);
    }
}
