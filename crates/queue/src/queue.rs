//! Task publishing abstraction (mechanics only).
//!
//! The queue is an external at-least-once channel. The core relies on exactly
//! two things from it:
//!
//! - **Publish**: hand over opaque bytes, get back a queue-assigned message id
//! - **Redelivery**: the queue re-drives a message whenever the worker answers
//!   with a retry-triggering status (its own backoff, not ours)
//!
//! Publishers never retry internally. The caller of the inbound endpoint owns
//! retrying the whole request.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// No usable queue was configured at startup (e.g. missing topic).
    #[error("queue not configured: {0}")]
    Unconfigured(String),

    /// The queue could not be reached (connect, timeout, auth token).
    #[error("queue transport error: {0}")]
    Transport(String),

    /// The queue answered but refused the message.
    #[error("queue rejected publish ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The queue answered with a body we could not interpret.
    #[error("unexpected queue response: {0}")]
    Response(String),
}

/// Publish side of a durable topic.
///
/// Implementations must be safe to share across concurrently handled requests.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Name of the topic messages are published to (for logging).
    fn topic(&self) -> &str;

    /// Publish one message. Returns the queue-assigned message id.
    async fn publish(&self, data: Vec<u8>) -> Result<String, QueueError>;
}

#[async_trait]
impl<Q> TaskQueue for Arc<Q>
where
    Q: TaskQueue + ?Sized,
{
    fn topic(&self) -> &str {
        (**self).topic()
    }

    async fn publish(&self, data: Vec<u8>) -> Result<String, QueueError> {
        (**self).publish(data).await
    }
}

/// A queue resolved at startup.
///
/// Missing configuration does not stop the process; it is carried as
/// [`QueueHandle::Unconfigured`] and every publish fails fast with
/// [`QueueError::Unconfigured`].
#[derive(Clone)]
pub enum QueueHandle {
    Ready(Arc<dyn TaskQueue>),
    Unconfigured { reason: String },
}

impl QueueHandle {
    pub fn ready(queue: impl TaskQueue + 'static) -> Self {
        Self::Ready(Arc::new(queue))
    }

    pub fn unconfigured(reason: impl Into<String>) -> Self {
        Self::Unconfigured {
            reason: reason.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Topic name, or `None` when unconfigured.
    pub fn topic(&self) -> Option<&str> {
        match self {
            Self::Ready(q) => Some(q.topic()),
            Self::Unconfigured { .. } => None,
        }
    }

    pub async fn publish(&self, data: Vec<u8>) -> Result<String, QueueError> {
        match self {
            Self::Ready(q) => q.publish(data).await,
            Self::Unconfigured { reason } => {
                debug!(%reason, bytes = data.len(), "publish on unconfigured queue");
                Err(QueueError::Unconfigured(reason.clone()))
            }
        }
    }
}

impl core::fmt::Debug for QueueHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Ready(q) => f.debug_tuple("Ready").field(&q.topic()).finish(),
            Self::Unconfigured { reason } => f
                .debug_struct("Unconfigured")
                .field("reason", reason)
                .finish(),
        }
    }
}
