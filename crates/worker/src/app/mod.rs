//! Worker application wiring (Axum router + the shared completion worker).

use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{get, post},
};
use tower::ServiceBuilder;

use flowsweep_infra::workers::CompletionWorker;

pub mod errors;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// The worker is shared by every in-flight delivery.
pub fn build_app(worker: Arc<CompletionWorker>) -> Router {
    Router::new()
        .route("/", post(routes::deliveries::handle_delivery))
        .route("/healthz", get(routes::system::health))
        .layer(ServiceBuilder::new().layer(Extension(worker)))
}
