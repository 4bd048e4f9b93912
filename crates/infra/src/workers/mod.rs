//! Completion worker building blocks.
//!
//! - `poller`: bounded execution-status polling state machine
//! - `cleanup`: idempotent webhook removal
//! - `completion`: poll-then-cleanup for one delivered task

pub mod cleanup;
pub mod completion;
pub mod poller;

pub use cleanup::{CleanupError, CleanupReport, cleanup_callbacks};
pub use completion::{Completion, CompletionWorker, WorkerError};
pub use poller::{PollReport, PollSettings, PollState, StatusPoller};
