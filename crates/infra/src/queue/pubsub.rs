//! Google Cloud Pub/Sub publisher (REST).
//!
//! - `POST {endpoint}/v1/{topic_path}:publish` with one base64-encoded message
//! - Bearer token from application default credentials, unless talking to
//!   the emulator (`PUBSUB_EMULATOR_HOST`)
//! - One HTTP call per publish; no retry here

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use gcp_auth::TokenProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use flowsweep_queue::{QueueError, TaskQueue};

use crate::config::IngressConfig;

const DEFAULT_ENDPOINT: &str = "https://pubsub.googleapis.com";
const PUBSUB_SCOPE: &str = "https://www.googleapis.com/auth/pubsub";
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PubSubPublisher {
    http: reqwest::Client,
    topic_path: String,
    publish_url: String,
    token_provider: Option<Arc<dyn TokenProvider>>,
}

// Manual Debug implementation since TokenProvider doesn't implement Debug
impl core::fmt::Debug for PubSubPublisher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PubSubPublisher")
            .field("topic_path", &self.topic_path)
            .field("publish_url", &self.publish_url)
            .field("authenticated", &self.token_provider.is_some())
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    messages: [OutgoingMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct OutgoingMessage<'a> {
    data: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    message: String,
    #[serde(default)]
    status: String,
}

impl PubSubPublisher {
    /// Build a publisher from ingress configuration.
    ///
    /// Talks to the emulator when one is configured, otherwise initializes
    /// Google authentication from the environment.
    pub async fn connect(config: &IngressConfig) -> Result<Self, QueueError> {
        let topic_path = config.topic_path().map_err(QueueError::Unconfigured)?;

        if let Some(host) = config.emulator_host.as_deref() {
            return Self::emulator(topic_path, host);
        }

        let token_provider = gcp_auth::provider()
            .await
            .map_err(|e| QueueError::Unconfigured(format!("failed to initialize GCP auth: {e}")))?;

        Self::build(topic_path, DEFAULT_ENDPOINT, Some(token_provider))
    }

    /// Unauthenticated publisher against an emulator (`host:port` or a URL).
    pub fn emulator(topic_path: impl Into<String>, host: &str) -> Result<Self, QueueError> {
        let endpoint = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{host}")
        };

        Self::build(topic_path.into(), &endpoint, None)
    }

    fn build(
        topic_path: String,
        endpoint: &str,
        token_provider: Option<Arc<dyn TokenProvider>>,
    ) -> Result<Self, QueueError> {
        let http = reqwest::Client::builder()
            .timeout(PUBLISH_TIMEOUT)
            .build()
            .map_err(|e| QueueError::Unconfigured(format!("failed to create HTTP client: {e}")))?;

        let publish_url = format!("{}/v1/{}:publish", endpoint.trim_end_matches('/'), topic_path);

        Ok(Self {
            http,
            topic_path,
            publish_url,
            token_provider,
        })
    }

    async fn access_token(&self) -> Result<Option<String>, QueueError> {
        let Some(provider) = &self.token_provider else {
            return Ok(None);
        };

        let token = provider
            .token(&[PUBSUB_SCOPE])
            .await
            .map_err(|e| QueueError::Transport(format!("failed to get GCP access token: {e}")))?;

        Ok(Some(token.as_str().to_string()))
    }
}

#[async_trait]
impl TaskQueue for PubSubPublisher {
    fn topic(&self) -> &str {
        &self.topic_path
    }

    #[instrument(skip_all, fields(topic = %self.topic_path, bytes = data.len()), err)]
    async fn publish(&self, data: Vec<u8>) -> Result<String, QueueError> {
        let encoded = STANDARD.encode(&data);
        let body = PublishRequest {
            messages: [OutgoingMessage { data: &encoded }],
        };

        let mut request = self.http.post(&self.publish_url).json(&body);
        if let Some(token) = self.access_token().await? {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| QueueError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());

            let message = match serde_json::from_str::<GoogleErrorResponse>(&error_body) {
                Ok(parsed) => format!("{} ({})", parsed.error.message, parsed.error.status),
                Err(_) => error_body,
            };

            return Err(QueueError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: PublishResponse = response
            .json()
            .await
            .map_err(|e| QueueError::Response(e.to_string()))?;

        let message_id = parsed
            .message_ids
            .into_iter()
            .next()
            .ok_or_else(|| QueueError::Response("publish response has no message id".into()))?;

        debug!(%message_id, "message published");
        Ok(message_id)
    }
}
