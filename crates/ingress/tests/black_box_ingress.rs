use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use flowsweep_infra::config::ResponsePolicy;
use flowsweep_ingress::app::{IngressState, build_app};
use flowsweep_queue::{InMemoryTaskQueue, QueueHandle};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(state: IngressState) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = build_app(state);
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

#[tokio::test]
async fn healthz_is_public_text() {
    let queue = Arc::new(InMemoryTaskQueue::new("tasks"));
    let srv = TestServer::spawn(IngressState::new(
        QueueHandle::ready(queue),
        ResponsePolicy::Strict,
    ))
    .await;

    let res = reqwest::get(format!("{}/healthz", srv.base_url)).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.text().await.unwrap(),
        "Ingress operational (webhook receiver)."
    );
}

#[tokio::test]
async fn inbound_event_round_trips_to_queue_over_http() {
    let queue = Arc::new(InMemoryTaskQueue::new("tasks"));
    let srv = TestServer::spawn(IngressState::new(
        QueueHandle::ready(queue.clone()),
        ResponsePolicy::Strict,
    ))
    .await;

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/", srv.base_url))
        .json(&json!({
            "flowSid": "FW1",
            "executionSid": "FN1",
            "conversationSid": "CH1",
            "serviceSid": "IS1"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();

    let published = queue.published();
    assert_eq!(published.len(), 1);
    assert_eq!(body["messageId"], published[0].message_id);

    let record: serde_json::Value = serde_json::from_slice(&published[0].data).unwrap();
    assert_eq!(record["serviceSid"], "IS1");
}

#[tokio::test]
async fn lenient_deployment_never_surfaces_failures() {
    let srv = TestServer::spawn(IngressState::new(
        QueueHandle::unconfigured("PUBSUB_TOPIC is not set"),
        ResponsePolicy::Lenient,
    ))
    .await;

    let client = reqwest::Client::new();

    let missing = client
        .post(format!("{}/", srv.base_url))
        .json(&json!({ "flowSid": "FW1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::OK);

    let unpublished = client
        .post(format!("{}/", srv.base_url))
        .form(&[
            ("flowSid", "FW1"),
            ("executionSid", "FN1"),
            ("conversationSid", "CH1"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(unpublished.status(), StatusCode::OK);

    let body: serde_json::Value = unpublished.json().await.unwrap();
    assert_eq!(body["status"], "not_delegated");
}
