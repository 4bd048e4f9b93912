//! Push delivery endpoint.
//!
//! The returned status is the only signal the queue acts on:
//!
//! | outcome                                | status |
//! |----------------------------------------|--------|
//! | poll finished (any outcome) + cleanup  | 204    |
//! | envelope or task record undecodable    | 400    |
//! | unconfigured / shutdown / cleanup fail | 500    |

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{Span, error, info, instrument, warn};

use flowsweep_infra::workers::CompletionWorker;
use flowsweep_queue::PushEnvelope;

use crate::app::errors;

/// POST /
#[instrument(
    skip_all,
    fields(message_id, flow_sid, execution_sid, conversation_sid)
)]
pub async fn handle_delivery(
    Extension(worker): Extension<Arc<CompletionWorker>>,
    body: Bytes,
) -> Response {
    let decoded = PushEnvelope::parse(&body)
        .and_then(|envelope| envelope.decode_task().map(|task| (envelope, task)));

    let (envelope, task) = match decoded {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(error = %e, "dropping malformed delivery");
            return errors::envelope_error_to_response(&e);
        }
    };

    let span = Span::current();
    if let Some(message_id) = envelope.message_id() {
        span.record("message_id", message_id);
    }
    span.record("flow_sid", task.flow_sid().as_str());
    span.record("execution_sid", task.execution_sid().as_str());
    span.record("conversation_sid", task.conversation_sid().as_str());

    info!(
        queue_age_ms = envelope.queue_age(Utc::now()).map(|age| age.num_milliseconds()),
        delivery_attempt = envelope.delivery_attempt,
        "delivery received"
    );

    match worker.process(&task).await {
        Ok(done) => {
            info!(
                completed = done.poll.completed(),
                fetches = done.poll.fetches,
                deleted = done.cleanup.deleted,
                already_gone = done.cleanup.already_gone,
                "task finished; acknowledging"
            );
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            error!(error = %e, "task failed; requesting redelivery");
            errors::worker_error_to_response(&e)
        }
    }
}
