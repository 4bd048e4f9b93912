//! Strongly-typed remote-system identifiers ("SIDs").
//!
//! SIDs are opaque strings issued by the remote system. The only invariant
//! enforced locally is non-emptiness; prefixes are not checked because test
//! fixtures and regional deployments do not always follow them.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FlowSid(String);

/// Identifier of one running instance of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExecutionSid(String);

/// Identifier of the conversation whose callbacks get cleaned up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConversationSid(String);

/// Identifier of the conversation service scoping a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceSid(String);

/// Identifier of one registered conversation webhook.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WebhookSid(String);

macro_rules! impl_sid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Wrap a raw SID, rejecting empty strings.
            pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
                let raw = raw.into();
                if raw.is_empty() {
                    return Err(DomainError::invalid_id(format!("{}: empty", $name)));
                }
                Ok(Self(raw))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

impl_sid_newtype!(FlowSid, "FlowSid");
impl_sid_newtype!(ExecutionSid, "ExecutionSid");
impl_sid_newtype!(ConversationSid, "ConversationSid");
impl_sid_newtype!(ServiceSid, "ServiceSid");
impl_sid_newtype!(WebhookSid, "WebhookSid");
