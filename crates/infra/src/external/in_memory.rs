//! In-memory remote system for tests/dev.
//!
//! - Execution statuses are scripted per call; once the script runs out the
//!   fallback status is returned forever
//! - Status fetches can be given a latency (tokio time, so paused clocks apply)
//! - Webhooks live in a map keyed by conversation SID (service scope ignored)
//! - Deletes can be scripted to fail once per webhook SID

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use flowsweep_core::{ConversationSid, ExecutionSid, FlowSid, WebhookSid};

use super::{
    ConversationScope, ConversationWebhook, ExecutionStatus, RemoteApi, RemoteError, WebhookTarget,
};

#[derive(Debug)]
struct State {
    statuses: VecDeque<Result<ExecutionStatus, RemoteError>>,
    fallback_status: ExecutionStatus,
    fetch_delay: Duration,
    webhooks: HashMap<ConversationSid, Vec<ConversationWebhook>>,
    delete_failures: HashMap<WebhookSid, RemoteError>,
    list_failure: Option<RemoteError>,
    status_fetches: usize,
    list_calls: usize,
    delete_attempts: Vec<WebhookSid>,
}

#[derive(Debug)]
pub struct InMemoryRemote {
    state: Mutex<State>,
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRemote {
    /// A remote whose executions stay `active` and which has no webhooks.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                statuses: VecDeque::new(),
                fallback_status: ExecutionStatus::Active,
                fetch_delay: Duration::ZERO,
                webhooks: HashMap::new(),
                delete_failures: HashMap::new(),
                list_failure: None,
                status_fetches: 0,
                list_calls: 0,
                delete_attempts: Vec::new(),
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only happens after a test already panicked.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue the results of upcoming status fetches, in order.
    pub fn script_statuses(
        &self,
        results: impl IntoIterator<Item = Result<ExecutionStatus, RemoteError>>,
    ) -> &Self {
        self.state().statuses.extend(results);
        self
    }

    /// Status returned once the script is exhausted.
    pub fn set_fallback_status(&self, status: ExecutionStatus) -> &Self {
        self.state().fallback_status = status;
        self
    }

    /// Every status fetch takes `delay` before answering.
    pub fn set_fetch_delay(&self, delay: Duration) -> &Self {
        self.state().fetch_delay = delay;
        self
    }

    pub fn add_webhook(&self, conversation: &str, sid: &str, target: WebhookTarget) -> &Self {
        let (Ok(conversation), Ok(sid)) = (ConversationSid::new(conversation), WebhookSid::new(sid)) else {
            return self;
        };
        self.state()
            .webhooks
            .entry(conversation)
            .or_default()
            .push(ConversationWebhook { sid, target });
        self
    }

    /// Make the next delete of `sid` fail with `err` (the webhook stays).
    pub fn fail_delete_once(&self, sid: &str, err: RemoteError) -> &Self {
        if let Ok(sid) = WebhookSid::new(sid) {
            self.state().delete_failures.insert(sid, err);
        }
        self
    }

    /// Make the next list call fail with `err`.
    pub fn fail_list_once(&self, err: RemoteError) -> &Self {
        self.state().list_failure = Some(err);
        self
    }

    pub fn webhooks(&self, conversation: &str) -> Vec<ConversationWebhook> {
        ConversationSid::new(conversation)
            .ok()
            .and_then(|c| self.state().webhooks.get(&c).cloned())
            .unwrap_or_default()
    }

    pub fn status_fetches(&self) -> usize {
        self.state().status_fetches
    }

    pub fn list_calls(&self) -> usize {
        self.state().list_calls
    }

    /// Every delete call, including failed ones, in call order.
    pub fn delete_attempts(&self) -> Vec<WebhookSid> {
        self.state().delete_attempts.clone()
    }
}

#[async_trait]
impl RemoteApi for InMemoryRemote {
    async fn fetch_execution_status(
        &self,
        _flow_sid: &FlowSid,
        _execution_sid: &ExecutionSid,
    ) -> Result<ExecutionStatus, RemoteError> {
        let delay = {
            let mut state = self.state();
            state.status_fetches += 1;
            state.fetch_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        match state.statuses.pop_front() {
            Some(result) => result,
            None => Ok(state.fallback_status.clone()),
        }
    }

    async fn list_webhooks(
        &self,
        scope: &ConversationScope,
    ) -> Result<Vec<ConversationWebhook>, RemoteError> {
        let mut state = self.state();
        state.list_calls += 1;
        if let Some(err) = state.list_failure.take() {
            return Err(err);
        }
        Ok(state
            .webhooks
            .get(&scope.conversation_sid)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_webhook(
        &self,
        scope: &ConversationScope,
        webhook_sid: &WebhookSid,
    ) -> Result<(), RemoteError> {
        let mut state = self.state();
        state.delete_attempts.push(webhook_sid.clone());

        if let Some(err) = state.delete_failures.remove(webhook_sid) {
            return Err(err);
        }

        let hooks = state
            .webhooks
            .get_mut(&scope.conversation_sid)
            .ok_or(RemoteError::NotFound)?;
        let before = hooks.len();
        hooks.retain(|h| &h.sid != webhook_sid);

        if hooks.len() == before {
            return Err(RemoteError::NotFound);
        }
        Ok(())
    }
}
