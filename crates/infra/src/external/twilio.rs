//! Twilio REST client (Studio executions + Conversations webhooks).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};

use flowsweep_core::{ExecutionSid, FlowSid, WebhookSid};

use super::{
    ConversationScope, ConversationWebhook, ExecutionStatus, RemoteApi, RemoteError, WebhookTarget,
};
use crate::config::TwilioCredentials;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: &str = "50";

/// Long-lived, cheaply shareable Twilio client.
#[derive(Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
    credentials: TwilioCredentials,
    studio_base_url: String,
    conversations_base_url: String,
}

impl core::fmt::Debug for TwilioClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TwilioClient")
            .field("account_sid", &self.credentials.account_sid)
            .field("studio_base_url", &self.studio_base_url)
            .field("conversations_base_url", &self.conversations_base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ExecutionResource {
    status: String,
}

#[derive(Debug, Deserialize)]
struct WebhookResource {
    sid: String,
    target: String,
}

#[derive(Debug, Deserialize)]
struct WebhookPage {
    #[serde(default)]
    webhooks: Vec<WebhookResource>,
    #[serde(default)]
    meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    #[serde(default)]
    next_page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    message: String,
}

impl TwilioClient {
    pub fn new(
        credentials: TwilioCredentials,
        studio_base_url: &str,
        conversations_base_url: &str,
    ) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            credentials,
            studio_base_url: studio_base_url.trim_end_matches('/').to_string(),
            conversations_base_url: conversations_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn webhooks_url(&self, scope: &ConversationScope) -> String {
        match &scope.service_sid {
            Some(service) => format!(
                "{}/v1/Services/{}/Conversations/{}/Webhooks",
                self.conversations_base_url, service, scope.conversation_sid
            ),
            None => format!(
                "{}/v1/Conversations/{}/Webhooks",
                self.conversations_base_url, scope.conversation_sid
            ),
        }
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.basic_auth(&self.credentials.account_sid, Some(&self.credentials.auth_token))
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, RemoteError> {
        let response = self
            .authed(req)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(RemoteError::NotFound);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<TwilioErrorBody>(&body)
        .map(|e| e.message)
        .unwrap_or(body);

    Err(RemoteError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteError> {
    response
        .json::<T>()
        .await
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

#[async_trait]
impl RemoteApi for TwilioClient {
    #[instrument(skip_all, fields(flow_sid = %flow_sid, execution_sid = %execution_sid), err)]
    async fn fetch_execution_status(
        &self,
        flow_sid: &FlowSid,
        execution_sid: &ExecutionSid,
    ) -> Result<ExecutionStatus, RemoteError> {
        let url = format!(
            "{}/v2/Flows/{}/Executions/{}",
            self.studio_base_url, flow_sid, execution_sid
        );

        let response = self.send(self.http.get(url)).await?;
        let execution: ExecutionResource = decode(response).await?;

        Ok(ExecutionStatus::parse(&execution.status))
    }

    #[instrument(skip_all, fields(conversation = %scope), err)]
    async fn list_webhooks(
        &self,
        scope: &ConversationScope,
    ) -> Result<Vec<ConversationWebhook>, RemoteError> {
        let mut webhooks = Vec::new();
        let mut request = self
            .http
            .get(self.webhooks_url(scope))
            .query(&[("PageSize", PAGE_SIZE)]);

        loop {
            let page: WebhookPage = decode(self.send(request).await?).await?;

            for resource in page.webhooks {
                let sid = WebhookSid::new(resource.sid)
                    .map_err(|e| RemoteError::Decode(e.to_string()))?;
                webhooks.push(ConversationWebhook {
                    sid,
                    target: WebhookTarget::parse(&resource.target),
                });
            }

            match page.meta.and_then(|m| m.next_page_url) {
                Some(next) => {
                    debug!(next_page_url = %next, "following webhook page");
                    request = self.http.get(next);
                }
                None => break,
            }
        }

        Ok(webhooks)
    }

    #[instrument(skip_all, fields(conversation = %scope, webhook_sid = %webhook_sid), err)]
    async fn delete_webhook(
        &self,
        scope: &ConversationScope,
        webhook_sid: &WebhookSid,
    ) -> Result<(), RemoteError> {
        let url = format!("{}/{}", self.webhooks_url(scope), webhook_sid);
        self.send(self.http.delete(url)).await?;
        Ok(())
    }
}
