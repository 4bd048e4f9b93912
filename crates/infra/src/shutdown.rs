//! Process shutdown signal.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Resolve on SIGINT or SIGTERM, then cancel `token`.
///
/// Used as the axum graceful-shutdown future; the token reaches in-flight
/// work that is waiting (poll intervals).
pub async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT; shutting down"),
        _ = terminate => info!("received SIGTERM; shutting down"),
        _ = token.cancelled() => {}
    }

    token.cancel();
}
