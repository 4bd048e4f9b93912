//! `flowsweep-queue`: how the core uses the durable queue.
//!
//! - [`TaskQueue`]: publish side (one call per inbound event, no retry)
//! - [`QueueHandle`]: a configured queue, or the typed reason it is not
//! - [`PushEnvelope`]: delivery side (push body posted by the queue to the worker)
//! - [`InMemoryTaskQueue`]: recording queue for tests/dev

pub mod in_memory;
pub mod push;
pub mod queue;

pub use in_memory::{InMemoryTaskQueue, PublishedMessage};
pub use push::{EnvelopeError, PushEnvelope, PushMessage};
pub use queue::{QueueError, QueueHandle, TaskQueue};
