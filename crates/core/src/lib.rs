//! `flowsweep-core`: the task record handed from the ingress to the worker.
//!
//! This crate contains **pure** types (no IO): correlation identifiers, the
//! inbound event shape, its validation, and the task record wire encoding.

pub mod error;
pub mod id;
pub mod task;

pub use error::{DomainError, DomainResult};
pub use id::{ConversationSid, ExecutionSid, FlowSid, ServiceSid, WebhookSid};
pub use task::{InboundEvent, TaskRecord};
