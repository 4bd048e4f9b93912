//! Environment configuration for both services.
//!
//! Missing values are not fatal: they are carried as `None`, logged by
//! [`IngressConfig::log_summary`] / [`WorkerConfig::log_summary`], and turn into
//! fast per-request failures. Values that are present but unparseable are a
//! [`ConfigError`] and stop startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::external::WebhookTarget;
use crate::workers::poller::PollSettings;

pub const DEFAULT_INGRESS_PORT: u16 = 8080;
pub const DEFAULT_WORKER_PORT: u16 = 8081;
pub const DEFAULT_STUDIO_BASE_URL: &str = "https://studio.twilio.com";
pub const DEFAULT_CONVERSATIONS_BASE_URL: &str = "https://conversations.twilio.com";

/// Load a `.env` file into the process environment.
///
/// `None` searches the working directory and its parents. Variables already
/// set in the environment are left untouched. Returns the file that was
/// loaded; a missing file is not an error.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => dotenvy::from_path(path).ok().map(|()| path.to_path_buf()),
        None => dotenvy::dotenv().ok(),
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: expected {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// How the ingress answers when it cannot hand the event off.
///
/// - `Strict`: missing fields → 400, publish failure → 500
/// - `Lenient`: both → 200, with the failure only logged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponsePolicy {
    #[default]
    Strict,
    Lenient,
}

impl ResponsePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}

impl std::str::FromStr for ResponsePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            _ => Err(ConfigError::Invalid {
                key: "INGRESS_RESPONSE_POLICY",
                value: s.to_string(),
                expected: "'strict' or 'lenient'",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressConfig {
    pub port: u16,
    /// Topic name or full `projects/{p}/topics/{t}` path.
    pub topic: Option<String>,
    pub project_id: Option<String>,
    /// `host:port` of a Pub/Sub emulator; disables authentication.
    pub emulator_host: Option<String>,
    pub response_policy: ResponsePolicy,
}

impl IngressConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = non_empty(get);

        let response_policy = match get("INGRESS_RESPONSE_POLICY") {
            Some(raw) => raw.parse()?,
            None => ResponsePolicy::default(),
        };

        Ok(Self {
            port: parse_port(get("PORT"), DEFAULT_INGRESS_PORT)?,
            topic: get("PUBSUB_TOPIC").or_else(|| get("STUDIO_TOPIC_NAME")),
            project_id: get("GOOGLE_CLOUD_PROJECT"),
            emulator_host: get("PUBSUB_EMULATOR_HOST"),
            response_policy,
        })
    }

    /// Fully-qualified topic path, if enough is configured to build one.
    pub fn topic_path(&self) -> Result<String, String> {
        let topic = self
            .topic
            .as_deref()
            .ok_or_else(|| "PUBSUB_TOPIC is not set".to_string())?;

        if topic.starts_with("projects/") {
            return Ok(topic.to_string());
        }

        let project = self.project_id.as_deref().ok_or_else(|| {
            format!("topic '{topic}' is not a full path and GOOGLE_CLOUD_PROJECT is not set")
        })?;

        Ok(format!("projects/{project}/topics/{topic}"))
    }

    pub fn log_summary(&self) {
        info!(
            port = self.port,
            topic = self.topic.as_deref().unwrap_or("<unset>"),
            emulator = self.emulator_host.is_some(),
            response_policy = self.response_policy.as_str(),
            "ingress configuration loaded"
        );

        if let Err(reason) = self.topic_path() {
            warn!(%reason, "queue topic unavailable; every publish will fail");
        }
    }
}

/// Remote-system credentials. The token is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
}

impl core::fmt::Debug for TwilioCredentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TwilioCredentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub port: u16,
    pub credentials: Option<TwilioCredentials>,
    pub poll: PollSettings,
    pub cleanup_target: WebhookTarget,
    pub studio_base_url: String,
    pub conversations_base_url: String,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = non_empty(get);

        let credentials = match (get("TWILIO_ACCOUNT_SID"), get("TWILIO_AUTH_TOKEN")) {
            (Some(account_sid), Some(auth_token)) => Some(TwilioCredentials {
                account_sid,
                auth_token,
            }),
            _ => None,
        };

        let defaults = PollSettings::default();
        let poll = PollSettings {
            interval: parse_millis(get("POLL_INTERVAL_MS"), "POLL_INTERVAL_MS", defaults.interval)?,
            timeout: parse_millis(get("POLL_TIMEOUT_MS"), "POLL_TIMEOUT_MS", defaults.timeout)?,
        };

        Ok(Self {
            port: parse_port(get("PORT"), DEFAULT_WORKER_PORT)?,
            credentials,
            poll,
            cleanup_target: get("CLEANUP_WEBHOOK_TARGET")
                .map(|raw| WebhookTarget::parse(&raw))
                .unwrap_or(WebhookTarget::Studio),
            studio_base_url: get("TWILIO_STUDIO_BASE_URL")
                .unwrap_or_else(|| DEFAULT_STUDIO_BASE_URL.to_string()),
            conversations_base_url: get("TWILIO_CONVERSATIONS_BASE_URL")
                .unwrap_or_else(|| DEFAULT_CONVERSATIONS_BASE_URL.to_string()),
        })
    }

    pub fn log_summary(&self) {
        info!(
            port = self.port,
            poll_interval_ms = self.poll.interval.as_millis() as u64,
            poll_timeout_ms = self.poll.timeout.as_millis() as u64,
            cleanup_target = self.cleanup_target.as_str(),
            "worker configuration loaded"
        );

        if self.credentials.is_none() {
            warn!("TWILIO_ACCOUNT_SID / TWILIO_AUTH_TOKEN not set; every delivery will be retried");
        }
    }
}

fn non_empty(get: impl Fn(&str) -> Option<String>) -> impl Fn(&str) -> Option<String> {
    move |key| get(key).filter(|v| !v.trim().is_empty())
}

fn parse_port(raw: Option<String>, default: u16) -> Result<u16, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };

    match raw.trim().parse::<u16>() {
        Ok(port) => Ok(port),
        Err(_) => Err(ConfigError::Invalid {
            key: "PORT",
            value: raw,
            expected: "a TCP port number",
        }),
    }
}

fn parse_millis(
    raw: Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };

    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw,
            expected: "a positive number of milliseconds",
        }),
    }
}
