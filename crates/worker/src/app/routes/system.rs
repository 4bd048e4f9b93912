use axum::http::StatusCode;

pub const HEALTH_TEXT: &str = "Worker operational (push subscriber).";

pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, HEALTH_TEXT)
}
