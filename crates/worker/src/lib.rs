//! Completion worker service: receives pushed tasks, polls, cleans up, acks.

pub mod app;
