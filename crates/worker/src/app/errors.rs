//! Status mapping for the push endpoint.
//!
//! The queue only looks at the status code: 4xx drops the message, 5xx
//! redelivers it. Bodies are for humans reading logs.

use axum::http::StatusCode;

use flowsweep_infra::http::json_error;
use flowsweep_infra::workers::WorkerError;
use flowsweep_queue::EnvelopeError;

pub fn envelope_error_to_response(err: &EnvelopeError) -> axum::response::Response {
    json_error(
        StatusCode::BAD_REQUEST,
        "invalid_message",
        format!("Invalid push message: {err}"),
    )
}

pub fn worker_error_to_response(err: &WorkerError) -> axum::response::Response {
    match err {
        WorkerError::Unconfigured(msg) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_misconfigured",
            format!("Server misconfiguration: {msg}"),
        ),
        WorkerError::Cancelled => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "shutting_down",
            "Worker shutting down before cleanup; the queue will retry.",
        ),
        WorkerError::Cleanup(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "task_failed",
            format!("Task failed; the queue will retry: {e}"),
        ),
    }
}
