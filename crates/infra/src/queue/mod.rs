//! Infrastructure-backed task queues.
//!
//! The publish abstraction lives in `flowsweep-queue` as pure mechanics.
//! This module provides the Google Cloud Pub/Sub implementation and the
//! startup wiring that turns configuration into a [`QueueHandle`].

pub mod pubsub;

use tracing::error;

use flowsweep_queue::QueueHandle;

use crate::config::IngressConfig;

pub use pubsub::PubSubPublisher;

/// Resolve the ingress queue. Never fails: problems become an unconfigured handle.
pub async fn connect(config: &IngressConfig) -> QueueHandle {
    match PubSubPublisher::connect(config).await {
        Ok(publisher) => QueueHandle::ready(publisher),
        Err(e) => {
            error!(error = %e, "queue unavailable; inbound events will not be delegated");
            QueueHandle::unconfigured(e.to_string())
        }
    }
}
