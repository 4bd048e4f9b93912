//! Remote-system adapters (execution status + conversation webhooks).
//!
//! Only the request/response contracts the worker consumes are modeled:
//!
//! - fetch one execution's status (read-only)
//! - list webhooks registered on a conversation
//! - delete one webhook by its SID and owning conversation

pub mod in_memory;
pub mod twilio;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use flowsweep_core::{ConversationSid, ExecutionSid, FlowSid, ServiceSid, TaskRecord, WebhookSid};

use crate::config::WorkerConfig;

pub use in_memory::InMemoryRemote;
pub use twilio::TwilioClient;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The request never got a response (connect, TLS, timeout).
    #[error("remote transport error: {0}")]
    Transport(String),

    /// The resource does not exist (HTTP 404).
    #[error("remote resource not found")]
    NotFound,

    /// Any other non-success response.
    #[error("remote call failed ({status}): {message}")]
    Status { status: u16, message: String },

    /// A success response whose body we could not interpret.
    #[error("unexpected remote response: {0}")]
    Decode(String),
}

/// Status of one workflow execution. Only `ended` is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    Active,
    Ended,
    Other(String),
}

impl ExecutionStatus {
    /// Case-insensitive parse of the remote status string.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "ended" => Self::Ended,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Ended => "ended",
            Self::Other(s) => s,
        }
    }
}

/// Category a conversation webhook is registered for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookTarget {
    Webhook,
    Trigger,
    Studio,
    Other(String),
}

impl WebhookTarget {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "webhook" => Self::Webhook,
            "trigger" => Self::Trigger,
            "studio" => Self::Studio,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Webhook => "webhook",
            Self::Trigger => "trigger",
            Self::Studio => "studio",
            Self::Other(s) => s,
        }
    }
}

/// A webhook registered on a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationWebhook {
    pub sid: WebhookSid,
    pub target: WebhookTarget,
}

/// Where a conversation lives: the default service, or an explicit one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationScope {
    pub conversation_sid: ConversationSid,
    pub service_sid: Option<ServiceSid>,
}

impl ConversationScope {
    pub fn new(conversation_sid: ConversationSid) -> Self {
        Self {
            conversation_sid,
            service_sid: None,
        }
    }

    pub fn for_task(task: &TaskRecord) -> Self {
        Self {
            conversation_sid: task.conversation_sid().clone(),
            service_sid: task.service_sid().cloned(),
        }
    }
}

impl core::fmt::Display for ConversationScope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.service_sid {
            Some(service) => write!(f, "{service}/{}", self.conversation_sid),
            None => write!(f, "{}", self.conversation_sid),
        }
    }
}

/// Remote-system API used by the worker.
///
/// Implementations hold no per-call mutable state and are shared by all
/// in-flight deliveries.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn fetch_execution_status(
        &self,
        flow_sid: &FlowSid,
        execution_sid: &ExecutionSid,
    ) -> Result<ExecutionStatus, RemoteError>;

    /// All webhooks on the conversation, in the order the remote lists them.
    async fn list_webhooks(
        &self,
        scope: &ConversationScope,
    ) -> Result<Vec<ConversationWebhook>, RemoteError>;

    async fn delete_webhook(
        &self,
        scope: &ConversationScope,
        webhook_sid: &WebhookSid,
    ) -> Result<(), RemoteError>;
}

/// Remote API client resolved once at startup.
#[derive(Clone)]
pub enum RemoteClient {
    Configured(Arc<dyn RemoteApi>),
    Unconfigured { reason: String },
}

impl RemoteClient {
    pub fn configured(api: impl RemoteApi + 'static) -> Self {
        Self::Configured(Arc::new(api))
    }

    pub fn unconfigured(reason: impl Into<String>) -> Self {
        Self::Unconfigured {
            reason: reason.into(),
        }
    }

    /// Build the Twilio client from worker configuration.
    pub fn from_config(config: &WorkerConfig) -> Self {
        let Some(credentials) = config.credentials.clone() else {
            return Self::unconfigured("TWILIO_ACCOUNT_SID / TWILIO_AUTH_TOKEN not set");
        };

        match TwilioClient::new(
            credentials,
            &config.studio_base_url,
            &config.conversations_base_url,
        ) {
            Ok(client) => Self::configured(client),
            Err(e) => Self::unconfigured(format!("failed to build remote client: {e}")),
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Configured(_))
    }
}

impl core::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Configured(_) => f.write_str("Configured(<RemoteApi>)"),
            Self::Unconfigured { reason } => f
                .debug_struct("Unconfigured")
                .field("reason", reason)
                .finish(),
        }
    }
}
