//! Poll-then-cleanup pipeline for one delivered task.
//!
//! Every error returned here is retryable: the HTTP layer turns it into a
//! redelivery-triggering status and the queue re-drives the task with its own
//! backoff. Nothing in this module retries.

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use flowsweep_core::TaskRecord;

use crate::external::{ConversationScope, RemoteClient, WebhookTarget};
use crate::workers::cleanup::{CleanupError, CleanupReport, cleanup_callbacks};
use crate::workers::poller::{PollReport, PollSettings, PollState, StatusPoller};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// The remote client could not be built at startup.
    #[error("remote client not configured: {0}")]
    Unconfigured(String),

    /// Shutdown interrupted polling before cleanup started.
    #[error("interrupted by shutdown")]
    Cancelled,

    #[error(transparent)]
    Cleanup(#[from] CleanupError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub poll: PollReport,
    pub cleanup: CleanupReport,
}

/// Long-lived per process; cheap to share across concurrent deliveries.
#[derive(Debug, Clone)]
pub struct CompletionWorker {
    remote: RemoteClient,
    poll: PollSettings,
    cleanup_target: WebhookTarget,
    shutdown: CancellationToken,
}

impl CompletionWorker {
    pub fn new(
        remote: RemoteClient,
        poll: PollSettings,
        cleanup_target: WebhookTarget,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            remote,
            poll,
            cleanup_target,
            shutdown,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.remote.is_configured()
    }

    /// Poll the execution, then clean up its conversation's webhooks.
    ///
    /// Polling never fails; a timeout still proceeds to cleanup.
    pub async fn process(&self, task: &TaskRecord) -> Result<Completion, WorkerError> {
        let api = match &self.remote {
            RemoteClient::Configured(api) => api.as_ref(),
            RemoteClient::Unconfigured { reason } => {
                return Err(WorkerError::Unconfigured(reason.clone()));
            }
        };

        let poll = StatusPoller::new(api, self.poll, self.shutdown.clone())
            .poll_until_terminal(task.flow_sid(), task.execution_sid())
            .await;

        match poll.outcome {
            PollState::TerminalObserved => info!("execution completed; proceeding to cleanup"),
            PollState::TimedOut => {
                warn!("execution poll timed out; cleaning up stale webhooks anyway")
            }
            PollState::Cancelled | PollState::Polling => return Err(WorkerError::Cancelled),
        }

        let scope = ConversationScope::for_task(task);
        let cleanup = cleanup_callbacks(api, &scope, &self.cleanup_target).await?;

        Ok(Completion { poll, cleanup })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::external::{ExecutionStatus, InMemoryRemote, RemoteError};
    use flowsweep_core::InboundEvent;

    fn task() -> TaskRecord {
        InboundEvent {
            flow_sid: Some("FW1".into()),
            execution_sid: Some("FN1".into()),
            conversation_sid: Some("CH1".into()),
            service_sid: None,
        }
        .validate()
        .unwrap()
    }

    fn worker(remote: Arc<InMemoryRemote>, shutdown: CancellationToken) -> CompletionWorker {
        CompletionWorker::new(
            RemoteClient::Configured(remote),
            PollSettings::default(),
            WebhookTarget::Studio,
            shutdown,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn unconfigured_client_fails_before_any_remote_call() {
        let worker = CompletionWorker::new(
            RemoteClient::unconfigured("no creds"),
            PollSettings::default(),
            WebhookTarget::Studio,
            CancellationToken::new(),
        );

        let err = worker.process(&task()).await.unwrap_err();
        assert_eq!(err, WorkerError::Unconfigured("no creds".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_still_cleans_up() {
        let remote = Arc::new(InMemoryRemote::new());
        remote.add_webhook("CH1", "WHxxx", WebhookTarget::Studio);

        let done = worker(remote.clone(), CancellationToken::new())
            .process(&task())
            .await
            .unwrap();

        assert_eq!(done.poll.outcome, PollState::TimedOut);
        assert_eq!(done.cleanup.deleted, 1);
        assert!(remote.webhooks("CH1").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_failure_is_returned_whatever_the_poll_outcome() {
        let remote = Arc::new(InMemoryRemote::new());
        remote
            .set_fallback_status(ExecutionStatus::Ended)
            .add_webhook("CH1", "WH1", WebhookTarget::Studio)
            .fail_delete_once("WH1", RemoteError::Transport("reset".into()));

        let err = worker(remote, CancellationToken::new())
            .process(&task())
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::Cleanup(CleanupError::Delete { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_failure_after_timeout_is_returned() {
        let remote = Arc::new(InMemoryRemote::new());
        remote
            .set_fallback_status(ExecutionStatus::Active)
            .add_webhook("CH1", "WH1", WebhookTarget::Studio)
            .fail_delete_once("WH1", RemoteError::Status { status: 500, message: "boom".into() });

        let err = worker(remote.clone(), CancellationToken::new())
            .process(&task())
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::Cleanup(CleanupError::Delete { deleted: 0, .. })));
        assert_eq!(remote.status_fetches(), 15);
        assert_eq!(remote.webhooks("CH1").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_skips_cleanup() {
        let remote = Arc::new(InMemoryRemote::new());
        remote.add_webhook("CH1", "WH1", WebhookTarget::Studio);
        let shutdown = CancellationToken::new();

        let canceller = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            canceller.cancel();
        });

        let err = worker(remote.clone(), shutdown).process(&task()).await.unwrap_err();

        assert_eq!(err, WorkerError::Cancelled);
        assert_eq!(remote.list_calls(), 0);
        assert_eq!(remote.webhooks("CH1").len(), 1);
    }
}
