//! Ingress service: accepts inbound events and delegates them to the queue.

pub mod app;
