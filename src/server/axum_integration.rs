//! The HTTP binding: JSON-RPC over POST, streams over SSE, and the
//! well-known agent card routes.
//!
//! This layer does exactly the transport's share of the work: frame
//! validation, method routing, params decoding, and envelope/SSE framing of
//! whatever the [`RequestHandler`] returns. Domain behavior lives behind
//! the handler; errors cross this boundary as values and leave it as
//! JSON-RPC error envelopes.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::A2AError;
use crate::types::{AgentCard, JsonRpcId, JsonRpcResponse};
use crate::utils::constants::{
    AGENT_CARD_WELL_KNOWN_PATH, DEFAULT_RPC_PATH, PREV_AGENT_CARD_WELL_KNOWN_PATH,
};
use crate::utils::extensions::{get_requested_extensions, HTTP_EXTENSION_HEADER};

use super::agent_executor::ServerCallContext;
use super::request_handler::{EventStream, RequestHandler};

struct AppState {
    handler: Arc<dyn RequestHandler>,
    agent_card: AgentCard,
}

/// Build the axum router for an A2A server:
///
/// - `POST /a2a` — every JSON-RPC method
/// - `GET /.well-known/agent-card.json` — agent discovery
/// - `GET /.well-known/agent.json` — the pre-v0.3 discovery path
pub fn a2a_router(handler: Arc<dyn RequestHandler>, agent_card: AgentCard) -> Router {
    let state = Arc::new(AppState { handler, agent_card });
    Router::new()
        .route(AGENT_CARD_WELL_KNOWN_PATH, get(serve_agent_card))
        .route(PREV_AGENT_CARD_WELL_KNOWN_PATH, get(serve_agent_card_deprecated))
        .route(DEFAULT_RPC_PATH, post(handle_jsonrpc))
        .with_state(state)
}

async fn serve_agent_card(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(&state.agent_card).into_response()
}

async fn serve_agent_card_deprecated(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    warn!(
        "agent card fetched from deprecated path {PREV_AGENT_CARD_WELL_KNOWN_PATH}, current is {AGENT_CARD_WELL_KNOWN_PATH}"
    );
    Json(&state.agent_card).into_response()
}

/// Decode, validate, and route one JSON-RPC request.
///
/// The body is taken as raw text so malformed JSON can be answered with a
/// proper −32700 envelope instead of a bare HTTP error.
async fn handle_jsonrpc(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let envelope: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(err) => {
            return error_response(JsonRpcId::Null, A2AError::parse_error(err.to_string()));
        }
    };

    let id = request_id(&envelope);

    if envelope.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return error_response(id, A2AError::invalid_request("jsonrpc must be \"2.0\""));
    }
    let Some(method) = envelope.get("method").and_then(Value::as_str) else {
        return error_response(id, A2AError::invalid_request("method must be a string"));
    };
    let params = envelope.get("params").cloned().unwrap_or(Value::Null);
    let call_context = call_context_from_headers(&headers);

    debug!(method, "dispatching JSON-RPC request");

    match method {
        "message/send" => match decode_params(params) {
            Ok(parsed) => {
                unary(id, state.handler.on_message_send(parsed, call_context).await)
            }
            Err(err) => error_response(id, err),
        },
        "message/stream" => {
            if !streaming_enabled(&state.agent_card) {
                return error_response(
                    id,
                    A2AError::unsupported_operation("this agent does not support streaming"),
                );
            }
            match decode_params(params) {
                Ok(parsed) => {
                    match state.handler.on_message_send_stream(parsed, call_context).await {
                        Ok(stream) => sse_response(id, stream),
                        Err(err) => error_response(id, err),
                    }
                }
                Err(err) => error_response(id, err),
            }
        }
        "tasks/get" => match decode_params(params) {
            Ok(parsed) => unary(id, state.handler.on_get_task(parsed, call_context).await),
            Err(err) => error_response(id, err),
        },
        "tasks/cancel" => match decode_params(params) {
            Ok(parsed) => unary(id, state.handler.on_cancel_task(parsed, call_context).await),
            Err(err) => error_response(id, err),
        },
        "tasks/resubscribe" => {
            if !streaming_enabled(&state.agent_card) {
                return error_response(
                    id,
                    A2AError::unsupported_operation("this agent does not support streaming"),
                );
            }
            match decode_params(params) {
                Ok(parsed) => {
                    match state.handler.on_resubscribe_to_task(parsed, call_context).await {
                        Ok(stream) => sse_response(id, stream),
                        Err(err) => error_response(id, err),
                    }
                }
                Err(err) => error_response(id, err),
            }
        }
        "tasks/pushNotificationConfig/set" => match decode_params(params) {
            Ok(parsed) => unary(
                id,
                state
                    .handler
                    .on_set_task_push_notification_config(parsed, call_context)
                    .await,
            ),
            Err(err) => error_response(id, err),
        },
        "tasks/pushNotificationConfig/get" => match decode_params(params) {
            Ok(parsed) => unary(
                id,
                state
                    .handler
                    .on_get_task_push_notification_config(parsed, call_context)
                    .await,
            ),
            Err(err) => error_response(id, err),
        },
        "tasks/pushNotificationConfig/list" => match decode_params(params) {
            Ok(parsed) => unary(
                id,
                state
                    .handler
                    .on_list_task_push_notification_config(parsed, call_context)
                    .await,
            ),
            Err(err) => error_response(id, err),
        },
        "tasks/pushNotificationConfig/delete" => match decode_params(params) {
            Ok(parsed) => unary(
                id,
                state
                    .handler
                    .on_delete_task_push_notification_config(parsed, call_context)
                    .await,
            ),
            Err(err) => error_response(id, err),
        },
        unknown => {
            warn!(method = unknown, "unknown JSON-RPC method");
            error_response(id, A2AError::method_not_found(unknown.to_string()))
        }
    }
}

fn request_id(envelope: &Value) -> JsonRpcId {
    match envelope.get("id") {
        Some(Value::String(s)) => JsonRpcId::String(s.clone()),
        Some(Value::Number(n)) => n.as_i64().map(JsonRpcId::Number).unwrap_or(JsonRpcId::Null),
        _ => JsonRpcId::Null,
    }
}

fn call_context_from_headers(headers: &HeaderMap) -> Option<ServerCallContext> {
    let requested = get_requested_extensions(
        headers
            .get_all(HTTP_EXTENSION_HEADER)
            .iter()
            .filter_map(|value| value.to_str().ok()),
    );
    if requested.is_empty() {
        return None;
    }
    Some(ServerCallContext {
        requested_extensions: requested,
        ..Default::default()
    })
}

fn streaming_enabled(card: &AgentCard) -> bool {
    card.capabilities.streaming.unwrap_or(false)
}

fn decode_params<T: DeserializeOwned>(params: Value) -> Result<T, A2AError> {
    serde_json::from_value(params).map_err(|err| A2AError::invalid_params(err.to_string()))
}

fn unary<T: serde::Serialize>(id: JsonRpcId, outcome: Result<T, A2AError>) -> Response {
    match outcome {
        Ok(result) => match serde_json::to_value(&result) {
            Ok(value) => Json(JsonRpcResponse::success(id, value)).into_response(),
            Err(err) => error_response(id, A2AError::internal_error(err.to_string())),
        },
        Err(err) => error_response(id, err),
    }
}

fn error_response(id: JsonRpcId, err: A2AError) -> Response {
    Json(JsonRpcResponse::error(id, err.into())).into_response()
}

/// Frame an event stream as SSE: one JSON-RPC envelope per event, an error
/// envelope as the terminating frame when the stream fails mid-flight.
fn sse_response(id: JsonRpcId, stream: EventStream) -> Response {
    let frames = stream.map(move |item| {
        let envelope = match item {
            Ok(event) => match serde_json::to_value(&event) {
                Ok(value) => JsonRpcResponse::success(id.clone(), value),
                Err(err) => {
                    JsonRpcResponse::error(id.clone(), A2AError::internal_error(err.to_string()).into())
                }
            },
            Err(err) => JsonRpcResponse::error(id.clone(), err.into()),
        };
        let data = serde_json::to_string(&envelope)
            .unwrap_or_else(|_| r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#.to_string());
        Ok::<_, Infallible>(SseEvent::default().data(data))
    });
    Sse::new(frames).keep_alive(KeepAlive::default()).into_response()
}
