use axum::http::StatusCode;

pub const HEALTH_TEXT: &str = "Ingress operational (webhook receiver).";

pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, HEALTH_TEXT)
}
