//! The error taxonomy shared by every fallible operation in the runtime.
//!
//! Every failure that can cross the JSON-RPC boundary is an [`A2AError`]
//! variant with a stable numeric code: the standard JSON-RPC 2.0 codes
//! (−32700..−32603) plus the A2A-specific range (−32001..−32006). Internal
//! code returns these through `A2AResult`; only the transport façade turns
//! them into wire envelopes, via the `From<A2AError> for JsonRpcError`
//! conversion.

use crate::types::JsonRpcError;

/// Malformed JSON on input.
pub const PARSE_ERROR: i64 = -32700;

/// The envelope is not a valid JSON-RPC request object.
pub const INVALID_REQUEST: i64 = -32600;

/// Unknown `method`.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Params failed validation for the requested method.
pub const INVALID_PARAMS: i64 = -32602;

/// Unhandled failure, id mismatch, or a lost aggregator result.
pub const INTERNAL_ERROR: i64 = -32603;

/// Task lookup miss.
pub const TASK_NOT_FOUND: i64 = -32001;

/// The task is already in a terminal state.
pub const TASK_NOT_CANCELABLE: i64 = -32002;

/// No push notification config store is installed.
pub const PUSH_NOTIFICATION_NOT_SUPPORTED: i64 = -32003;

/// The requested feature is disabled on this server.
pub const UNSUPPORTED_OPERATION: i64 = -32004;

/// The requested output mode is not supported.
pub const CONTENT_TYPE_NOT_SUPPORTED: i64 = -32005;

/// The executor emitted an inconsistent event (id mismatch, illegal state
/// transition, missing kind).
pub const INVALID_AGENT_RESPONSE: i64 = -32006;

/// The error type for every fallible runtime operation.
///
/// Each variant carries a human-readable `message` and an optional structured
/// `data` payload, mirroring the JSON-RPC `error` object. Variants map 1:1 to
/// the wire codes above; see [`A2AError::code`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum A2AError {
    /// −32700: malformed JSON on input.
    #[error("Parse error: {message}")]
    ParseError {
        /// Diagnostic detail.
        message: String,
        /// Optional structured detail (e.g. the offending fragment).
        data: Option<serde_json::Value>,
    },

    /// −32600: the envelope failed validation.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Diagnostic detail.
        message: String,
        /// Optional structured detail.
        data: Option<serde_json::Value>,
    },

    /// −32601: unknown method name.
    #[error("Method not found: {message}")]
    MethodNotFound {
        /// Diagnostic detail.
        message: String,
        /// Optional structured detail.
        data: Option<serde_json::Value>,
    },

    /// −32602: params failed schema validation.
    #[error("Invalid params: {message}")]
    InvalidParams {
        /// Diagnostic detail.
        message: String,
        /// Optional structured detail (e.g. field-level validation errors).
        data: Option<serde_json::Value>,
    },

    /// −32603: unhandled internal failure.
    #[error("Internal error: {message}")]
    InternalError {
        /// Diagnostic detail.
        message: String,
        /// Optional structured detail.
        data: Option<serde_json::Value>,
    },

    /// −32001: task lookup miss.
    #[error("Task not found: {message}")]
    TaskNotFound {
        /// Diagnostic detail (usually the task id).
        message: String,
        /// Optional structured detail.
        data: Option<serde_json::Value>,
    },

    /// −32002: the task is already terminal.
    #[error("Task not cancelable: {message}")]
    TaskNotCancelable {
        /// Diagnostic detail.
        message: String,
        /// Optional structured detail.
        data: Option<serde_json::Value>,
    },

    /// −32003: push notifications are not available on this server.
    #[error("Push notifications not supported: {message}")]
    PushNotificationNotSupported {
        /// Diagnostic detail.
        message: String,
        /// Optional structured detail.
        data: Option<serde_json::Value>,
    },

    /// −32004: the requested feature is disabled.
    #[error("Unsupported operation: {message}")]
    UnsupportedOperation {
        /// Diagnostic detail.
        message: String,
        /// Optional structured detail.
        data: Option<serde_json::Value>,
    },

    /// −32005: the requested output mode is not supported.
    #[error("Content type not supported: {message}")]
    ContentTypeNotSupported {
        /// Diagnostic detail.
        message: String,
        /// Optional structured detail.
        data: Option<serde_json::Value>,
    },

    /// −32006: the executor emitted an inconsistent event.
    #[error("Invalid agent response: {message}")]
    InvalidAgentResponse {
        /// Diagnostic detail.
        message: String,
        /// Optional structured detail.
        data: Option<serde_json::Value>,
    },
}

/// Result alias used throughout the runtime.
pub type A2AResult<T> = Result<T, A2AError>;

impl A2AError {
    /// Build a [`A2AError::ParseError`] from a message alone.
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            data: None,
        }
    }

    /// Build an [`A2AError::InvalidRequest`] from a message alone.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            data: None,
        }
    }

    /// Build a [`A2AError::MethodNotFound`] from a message alone.
    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::MethodNotFound {
            message: message.into(),
            data: None,
        }
    }

    /// Build an [`A2AError::InvalidParams`] from a message alone.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
            data: None,
        }
    }

    /// Build an [`A2AError::InternalError`] from a message alone.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
            data: None,
        }
    }

    /// Build a [`A2AError::TaskNotFound`] from a message alone.
    pub fn task_not_found(message: impl Into<String>) -> Self {
        Self::TaskNotFound {
            message: message.into(),
            data: None,
        }
    }

    /// Build a [`A2AError::TaskNotCancelable`] from a message alone.
    pub fn task_not_cancelable(message: impl Into<String>) -> Self {
        Self::TaskNotCancelable {
            message: message.into(),
            data: None,
        }
    }

    /// Build a [`A2AError::PushNotificationNotSupported`] from a message alone.
    pub fn push_notification_not_supported(message: impl Into<String>) -> Self {
        Self::PushNotificationNotSupported {
            message: message.into(),
            data: None,
        }
    }

    /// Build an [`A2AError::UnsupportedOperation`] from a message alone.
    pub fn unsupported_operation(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            message: message.into(),
            data: None,
        }
    }

    /// Build a [`A2AError::ContentTypeNotSupported`] from a message alone.
    pub fn content_type_not_supported(message: impl Into<String>) -> Self {
        Self::ContentTypeNotSupported {
            message: message.into(),
            data: None,
        }
    }

    /// Build an [`A2AError::InvalidAgentResponse`] from a message alone.
    pub fn invalid_agent_response(message: impl Into<String>) -> Self {
        Self::InvalidAgentResponse {
            message: message.into(),
            data: None,
        }
    }

    /// The stable wire code for this variant.
    pub fn code(&self) -> i64 {
        match self {
            A2AError::ParseError { .. } => PARSE_ERROR,
            A2AError::InvalidRequest { .. } => INVALID_REQUEST,
            A2AError::MethodNotFound { .. } => METHOD_NOT_FOUND,
            A2AError::InvalidParams { .. } => INVALID_PARAMS,
            A2AError::InternalError { .. } => INTERNAL_ERROR,
            A2AError::TaskNotFound { .. } => TASK_NOT_FOUND,
            A2AError::TaskNotCancelable { .. } => TASK_NOT_CANCELABLE,
            A2AError::PushNotificationNotSupported { .. } => PUSH_NOTIFICATION_NOT_SUPPORTED,
            A2AError::UnsupportedOperation { .. } => UNSUPPORTED_OPERATION,
            A2AError::ContentTypeNotSupported { .. } => CONTENT_TYPE_NOT_SUPPORTED,
            A2AError::InvalidAgentResponse { .. } => INVALID_AGENT_RESPONSE,
        }
    }

    /// The structured `data` payload, if one was attached.
    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            A2AError::ParseError { data, .. }
            | A2AError::InvalidRequest { data, .. }
            | A2AError::MethodNotFound { data, .. }
            | A2AError::InvalidParams { data, .. }
            | A2AError::InternalError { data, .. }
            | A2AError::TaskNotFound { data, .. }
            | A2AError::TaskNotCancelable { data, .. }
            | A2AError::PushNotificationNotSupported { data, .. }
            | A2AError::UnsupportedOperation { data, .. }
            | A2AError::ContentTypeNotSupported { data, .. }
            | A2AError::InvalidAgentResponse { data, .. } => data.as_ref(),
        }
    }
}

impl From<A2AError> for JsonRpcError {
    fn from(err: A2AError) -> Self {
        JsonRpcError {
            code: err.code(),
            message: err.to_string(),
            data: err.data().cloned(),
        }
    }
}

impl From<serde_json::Error> for A2AError {
    fn from(err: serde_json::Error) -> Self {
        A2AError::parse_error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_are_stable() {
        assert_eq!(PARSE_ERROR, -32700);
        assert_eq!(INVALID_REQUEST, -32600);
        assert_eq!(METHOD_NOT_FOUND, -32601);
        assert_eq!(INVALID_PARAMS, -32602);
        assert_eq!(INTERNAL_ERROR, -32603);
        assert_eq!(TASK_NOT_FOUND, -32001);
        assert_eq!(TASK_NOT_CANCELABLE, -32002);
        assert_eq!(PUSH_NOTIFICATION_NOT_SUPPORTED, -32003);
        assert_eq!(UNSUPPORTED_OPERATION, -32004);
        assert_eq!(CONTENT_TYPE_NOT_SUPPORTED, -32005);
        assert_eq!(INVALID_AGENT_RESPONSE, -32006);
    }

    #[test]
    fn variant_codes_match_constants() {
        assert_eq!(A2AError::parse_error("x").code(), PARSE_ERROR);
        assert_eq!(A2AError::task_not_found("t1").code(), TASK_NOT_FOUND);
        assert_eq!(
            A2AError::invalid_agent_response("bad").code(),
            INVALID_AGENT_RESPONSE
        );
    }

    #[test]
    fn converts_into_jsonrpc_error_with_message() {
        let rpc: JsonRpcError = A2AError::task_not_found("task-9").into();
        assert_eq!(rpc.code, -32001);
        assert!(rpc.message.contains("task-9"));
        assert!(rpc.data.is_none());
    }

    #[test]
    fn structured_data_survives_conversion() {
        let detail = serde_json::json!({"field": "message", "reason": "required"});
        let err = A2AError::InvalidParams {
            message: "message is required".into(),
            data: Some(detail.clone()),
        };
        let rpc: JsonRpcError = err.into();
        assert_eq!(rpc.code, INVALID_PARAMS);
        assert_eq!(rpc.data, Some(detail));
    }

    #[test]
    fn serde_errors_become_parse_errors() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json");
        let err: A2AError = bad.unwrap_err().into();
        assert_eq!(err.code(), PARSE_ERROR);
    }
}
