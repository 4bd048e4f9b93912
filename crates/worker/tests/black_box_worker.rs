use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use flowsweep_infra::external::{ExecutionStatus, InMemoryRemote, RemoteClient, WebhookTarget};
use flowsweep_infra::workers::{CompletionWorker, PollSettings};
use flowsweep_queue::PushEnvelope;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(remote: RemoteClient) -> Self {
        let worker = CompletionWorker::new(
            remote,
            PollSettings::default(),
            WebhookTarget::Studio,
            CancellationToken::new(),
        );
        // Same router as prod, bound to an ephemeral port.
        let app = flowsweep_worker::app::build_app(Arc::new(worker));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn envelope() -> PushEnvelope {
    PushEnvelope::for_message(
        "1234",
        br#"{"flowSid":"FW1","executionSid":"FN1","conversationSid":"CH1","serviceSid":"IS1"}"#,
        chrono::Utc::now(),
    )
}

#[tokio::test]
async fn healthz_is_public_text() {
    let srv = TestServer::spawn(RemoteClient::unconfigured("no creds")).await;

    let res = reqwest::get(format!("{}/healthz", srv.base_url)).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.text().await.unwrap(),
        "Worker operational (push subscriber)."
    );
}

#[tokio::test]
async fn push_status_codes_over_http() {
    let remote = Arc::new(InMemoryRemote::new());
    remote
        .set_fallback_status(ExecutionStatus::Ended)
        .add_webhook("CH1", "WH1", WebhookTarget::Studio)
        .add_webhook("CH1", "WH2", WebhookTarget::Trigger);
    let srv = TestServer::spawn(RemoteClient::Configured(remote.clone())).await;
    let client = reqwest::Client::new();

    let malformed = client
        .post(format!("{}/", srv.base_url))
        .json(&json!({ "message": { "data": "" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    let acked = client
        .post(format!("{}/", srv.base_url))
        .json(&envelope())
        .send()
        .await
        .unwrap();
    assert_eq!(acked.status(), StatusCode::NO_CONTENT);

    let left: Vec<_> = remote
        .webhooks("CH1")
        .into_iter()
        .map(|w| w.sid.to_string())
        .collect();
    assert_eq!(left, vec!["WH2"]);
}

#[tokio::test]
async fn unconfigured_worker_answers_500() {
    let srv = TestServer::spawn(RemoteClient::unconfigured("no creds")).await;

    let res = reqwest::Client::new()
        .post(format!("{}/", srv.base_url))
        .json(&envelope())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
