//! Tracing/logging setup shared by both services.

/// Initialize process-wide tracing for `service`.
///
/// Safe to call multiple times; subsequent calls are no-ops. An unknown
/// `LOG_FORMAT` falls back to JSON and is reported once tracing is up.
pub fn init(service: &'static str) {
    let parsed = std::env::var("LOG_FORMAT")
        .ok()
        .map(|raw| raw.parse::<LogFormat>())
        .transpose();

    let format = parsed.clone().ok().flatten().unwrap_or_default();
    tracing::init(format);

    if let Err(e) = parsed {
        ::tracing::warn!(error = %e, "falling back to JSON logs");
    }
    ::tracing::info!(service, format = format.as_str(), "tracing initialized");
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use tracing::{LogFormat, UnknownLogFormat};
