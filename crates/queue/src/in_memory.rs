//! In-memory task queue for tests/dev.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::push::PushEnvelope;
use crate::queue::{QueueError, TaskQueue};

/// A message accepted by [`InMemoryTaskQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub message_id: String,
    pub data: Vec<u8>,
    pub published_at: DateTime<Utc>,
}

impl PublishedMessage {
    /// The push body the queue would POST to a subscriber for this message.
    pub fn push_envelope(&self) -> PushEnvelope {
        PushEnvelope::for_message(&self.message_id, &self.data, self.published_at)
    }
}

#[derive(Debug, Default)]
struct State {
    published: Vec<PublishedMessage>,
    /// Scripted failures consumed by upcoming publish calls, in order.
    failures: VecDeque<QueueError>,
    attempts: usize,
}

/// Recording queue.
///
/// - No IO, no delivery: messages are only recorded
/// - Every publish attempt is counted, including scripted failures
#[derive(Debug)]
pub struct InMemoryTaskQueue {
    topic: String,
    state: Mutex<State>,
}

impl InMemoryTaskQueue {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            state: Mutex::new(State::default()),
        }
    }

    /// Make the next publish attempt fail with `err`.
    pub fn fail_next(&self, err: QueueError) {
        if let Ok(mut state) = self.state.lock() {
            state.failures.push_back(err);
        }
    }

    /// Successfully published messages, in publish order.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.state
            .lock()
            .map(|s| s.published.clone())
            .unwrap_or_default()
    }

    /// Number of publish calls, successful or not.
    pub fn publish_attempts(&self) -> usize {
        self.state.lock().map(|s| s.attempts).unwrap_or_default()
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn publish(&self, data: Vec<u8>) -> Result<String, QueueError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| QueueError::Transport("in-memory queue lock poisoned".into()))?;

        state.attempts += 1;
        if let Some(err) = state.failures.pop_front() {
            return Err(err);
        }

        let message_id = Uuid::now_v7().to_string();
        state.published.push(PublishedMessage {
            message_id: message_id.clone(),
            data,
            published_at: Utc::now(),
        });

        Ok(message_id)
    }
}
