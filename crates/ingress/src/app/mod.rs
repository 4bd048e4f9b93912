//! Ingress application wiring (Axum router + shared state).
//!
//! - `routes/`: HTTP handlers (inbound events, liveness)
//! - error bodies come from `flowsweep_infra::http::json_error`

use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{get, post},
};
use tower::ServiceBuilder;

use flowsweep_infra::config::ResponsePolicy;
use flowsweep_queue::QueueHandle;

pub mod routes;

/// Everything an inbound-event handler needs; built once at startup.
#[derive(Debug, Clone)]
pub struct IngressState {
    pub queue: QueueHandle,
    pub policy: ResponsePolicy,
}

impl IngressState {
    pub fn new(queue: QueueHandle, policy: ResponsePolicy) -> Self {
        Self { queue, policy }
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(state: IngressState) -> Router {
    Router::new()
        .route("/", post(routes::events::handle_inbound_event))
        .route("/healthz", get(routes::system::health))
        .layer(ServiceBuilder::new().layer(Extension(Arc::new(state))))
}
