use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use flowsweep_infra::config::{self, WorkerConfig};
use flowsweep_infra::external::RemoteClient;
use flowsweep_infra::shutdown;
use flowsweep_infra::workers::CompletionWorker;
use flowsweep_worker::app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file = config::load_env_file(None);
    flowsweep_observability::init("worker");
    if let Some(path) = &env_file {
        tracing::info!(path = %path.display(), "loaded environment file");
    }

    let config = WorkerConfig::from_env().context("invalid worker configuration")?;
    config.log_summary();

    let remote = RemoteClient::from_config(&config);
    if let RemoteClient::Unconfigured { reason } = &remote {
        tracing::error!(%reason, "remote client unavailable; deliveries will be retried");
    }

    let shutdown_token = CancellationToken::new();
    let worker = CompletionWorker::new(
        remote,
        config.poll,
        config.cleanup_target.clone(),
        shutdown_token.clone(),
    );
    let app = app::build_app(Arc::new(worker));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::cancel_on_signal(shutdown_token))
        .await
        .context("server error")?;

    tracing::info!("worker stopped");
    Ok(())
}
