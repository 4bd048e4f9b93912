use anyhow::Context;
use tokio_util::sync::CancellationToken;

use flowsweep_infra::config::{self, IngressConfig};
use flowsweep_infra::{queue, shutdown};
use flowsweep_ingress::app::{self, IngressState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file = config::load_env_file(None);
    flowsweep_observability::init("ingress");
    if let Some(path) = &env_file {
        tracing::info!(path = %path.display(), "loaded environment file");
    }

    let config = IngressConfig::from_env().context("invalid ingress configuration")?;
    config.log_summary();

    let state = IngressState::new(queue::connect(&config).await, config.response_policy);
    let app = app::build_app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::cancel_on_signal(CancellationToken::new()))
        .await
        .context("server error")?;

    tracing::info!("ingress stopped");
    Ok(())
}
