//! Idempotent removal of a conversation's webhooks of one category.
//!
//! Safe to re-run: a second pass finds nothing to delete and succeeds. Deletes
//! are issued sequentially in list order; the first failing delete aborts the
//! pass without rolling back earlier deletes, leaving a smaller set for the
//! redelivered retry.

use thiserror::Error;
use tracing::{info, instrument, warn};

use flowsweep_core::WebhookSid;

use crate::external::{ConversationScope, RemoteApi, RemoteError, WebhookTarget};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Webhooks on the conversation, of any category.
    pub listed: usize,
    /// Webhooks matching the cleanup category.
    pub matched: usize,
    pub deleted: usize,
    /// Matching webhooks that were already gone when deleted.
    pub already_gone: usize,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CleanupError {
    #[error("listing webhooks failed: {0}")]
    List(#[source] RemoteError),

    #[error("deleting webhook {webhook_sid} failed after {deleted} deletion(s): {source}")]
    Delete {
        webhook_sid: WebhookSid,
        deleted: usize,
        #[source]
        source: RemoteError,
    },
}

#[instrument(skip_all, fields(conversation = %scope, target = target.as_str()))]
pub async fn cleanup_callbacks(
    api: &dyn RemoteApi,
    scope: &ConversationScope,
    target: &WebhookTarget,
) -> Result<CleanupReport, CleanupError> {
    let webhooks = api.list_webhooks(scope).await.map_err(CleanupError::List)?;

    let matching: Vec<WebhookSid> = webhooks
        .iter()
        .filter(|w| &w.target == target)
        .map(|w| w.sid.clone())
        .collect();

    let mut report = CleanupReport {
        listed: webhooks.len(),
        matched: matching.len(),
        ..CleanupReport::default()
    };

    if matching.is_empty() {
        info!(listed = report.listed, "no matching webhooks; nothing to clean up");
        return Ok(report);
    }

    info!(matched = report.matched, "removing matching webhooks");

    for webhook_sid in matching {
        match api.delete_webhook(scope, &webhook_sid).await {
            Ok(()) => {
                report.deleted += 1;
                info!(%webhook_sid, "webhook removed");
            }
            Err(RemoteError::NotFound) => {
                report.already_gone += 1;
                info!(%webhook_sid, "webhook already removed");
            }
            Err(source) => {
                warn!(%webhook_sid, deleted = report.deleted, error = %source, "webhook removal failed");
                return Err(CleanupError::Delete {
                    webhook_sid,
                    deleted: report.deleted,
                    source,
                });
            }
        }
    }

    Ok(report)
}
