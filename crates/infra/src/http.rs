//! HTTP response helpers shared by both services.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

/// `{"error": code, "message": ...}` with the given status.
pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
