//! Push delivery envelope.
//!
//! The queue POSTs each delivery attempt to the worker as:
//!
//! ```json
//! {
//!   "message": {
//!     "data": "<base64 of the task record JSON>",
//!     "messageId": "...",
//!     "publishTime": "2024-01-01T00:00:00Z",
//!     "attributes": {}
//!   },
//!   "subscription": "projects/.../subscriptions/...",
//!   "deliveryAttempt": 1
//! }
//! ```
//!
//! Only `message.data` is required. Anything that fails to decode into a
//! [`TaskRecord`] is structurally unprocessable: redelivering it cannot help.

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use flowsweep_core::{DomainError, TaskRecord};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("push body is not a valid envelope: {0}")]
    InvalidJson(String),

    #[error("push envelope has no message.data")]
    MissingData,

    #[error("message.data is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("message.data is not valid UTF-8")]
    InvalidUtf8,

    #[error(transparent)]
    InvalidRecord(#[from] DomainError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<PushMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_attempt: Option<u32>,
}

impl PushEnvelope {
    /// Parse a raw push body.
    pub fn parse(body: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(body).map_err(|e| EnvelopeError::InvalidJson(e.to_string()))
    }

    /// Build the envelope the queue would push for a published message.
    pub fn for_message(message_id: &str, data: &[u8], published_at: DateTime<Utc>) -> Self {
        Self {
            message: Some(PushMessage {
                data: Some(STANDARD.encode(data)),
                message_id: Some(message_id.to_string()),
                publish_time: Some(published_at.to_rfc3339()),
                attributes: HashMap::new(),
            }),
            subscription: None,
            delivery_attempt: None,
        }
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message.as_ref()?.message_id.as_deref()
    }

    /// Time between publish and `now`, when the queue supplied a publish time.
    pub fn queue_age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let raw = self.message.as_ref()?.publish_time.as_deref()?;
        let published = DateTime::parse_from_rfc3339(raw).ok()?;
        Some(now.signed_duration_since(published.with_timezone(&Utc)))
    }

    /// Base64-decoded `message.data`.
    pub fn decode_data(&self) -> Result<Vec<u8>, EnvelopeError> {
        let data = self
            .message
            .as_ref()
            .and_then(|m| m.data.as_deref())
            .filter(|d| !d.is_empty())
            .ok_or(EnvelopeError::MissingData)?;

        STANDARD
            .decode(data)
            .map_err(|e| EnvelopeError::InvalidBase64(e.to_string()))
    }

    /// Decode `message.data` into a fresh task record.
    pub fn decode_task(&self) -> Result<TaskRecord, EnvelopeError> {
        let bytes = self.decode_data()?;
        let text = std::str::from_utf8(&bytes).map_err(|_| EnvelopeError::InvalidUtf8)?;
        Ok(TaskRecord::from_slice(text.as_bytes())?)
    }
}
