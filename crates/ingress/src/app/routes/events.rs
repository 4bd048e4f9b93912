//! Inbound event endpoint.
//!
//! Validates the correlation fields, publishes one task record, and answers.
//! The publish call is the only thing awaited: no polling or cleanup here.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Extension, Form, FromRequest, Request},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{Span, error, info, instrument, warn};

use flowsweep_core::{DomainError, InboundEvent, TaskRecord};
use flowsweep_infra::config::ResponsePolicy;
use flowsweep_infra::http::json_error;

use crate::app::IngressState;

/// POST /
///
/// Body: JSON or form-encoded `flowSid`, `executionSid`, `conversationSid`,
/// optional `serviceSid`. A body that cannot be parsed at all is treated as
/// an event with every field missing.
#[instrument(
    skip_all,
    fields(flow_sid, execution_sid, conversation_sid, message_id)
)]
pub async fn handle_inbound_event(
    Extension(state): Extension<Arc<IngressState>>,
    request: Request,
) -> Response {
    let event = read_event(request).await.unwrap_or_default();

    let task = match event.validate() {
        Ok(task) => task,
        Err(e) => return reject(state.policy, &e),
    };

    let span = Span::current();
    span.record("flow_sid", task.flow_sid().as_str());
    span.record("execution_sid", task.execution_sid().as_str());
    span.record("conversation_sid", task.conversation_sid().as_str());

    publish(&state, &task).await
}

async fn publish(state: &IngressState, task: &TaskRecord) -> Response {
    let data = match task.to_bytes() {
        Ok(data) => data,
        Err(e) => {
            error!(error = %e, "failed to encode task record");
            return publish_failed(state.policy);
        }
    };

    match state.queue.publish(data).await {
        Ok(message_id) => {
            Span::current().record("message_id", message_id.as_str());
            info!(topic = state.queue.topic().unwrap_or_default(), "task published");
            (
                StatusCode::OK,
                Json(json!({
                    "status": "accepted",
                    "messageId": message_id,
                    "message": "Task accepted and delegated to worker.",
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, policy = state.policy.as_str(), "failed to publish task");
            publish_failed(state.policy)
        }
    }
}

async fn read_event(request: Request) -> Option<InboundEvent> {
    if is_form(request.headers()) {
        let Form(event) = Form::<InboundEvent>::from_request(request, &()).await.ok()?;
        return Some(event);
    }

    let body = Bytes::from_request(request, &()).await.ok()?;
    serde_json::from_slice(&body).ok()
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

fn reject(policy: ResponsePolicy, err: &DomainError) -> Response {
    let message = match err {
        DomainError::MissingFields(fields) => format!(
            "Missing required fields: {}. Aborting task delegation.",
            fields.join(", ")
        ),
        other => other.to_string(),
    };

    warn!(
        missing = ?err.missing_fields(),
        policy = policy.as_str(),
        "rejecting inbound event"
    );

    match policy {
        ResponsePolicy::Strict => {
            json_error(StatusCode::BAD_REQUEST, "missing_fields", message)
        }
        ResponsePolicy::Lenient => (
            StatusCode::OK,
            Json(json!({ "status": "ignored", "message": message })),
        )
            .into_response(),
    }
}

fn publish_failed(policy: ResponsePolicy) -> Response {
    const MESSAGE: &str = "Internal error while publishing task.";

    match policy {
        ResponsePolicy::Strict => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "publish_failed", MESSAGE)
        }
        ResponsePolicy::Lenient => (
            StatusCode::OK,
            Json(json!({ "status": "not_delegated", "message": MESSAGE })),
        )
            .into_response(),
    }
}
