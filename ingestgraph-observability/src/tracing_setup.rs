use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::{LogFormat, ObservabilityConfig};

/// Initialize the process-wide tracing subscriber: an `EnvFilter` plus a
/// JSON or pretty formatting layer depending on profile. Mirrors
/// `r2e_observability::init_tracing`'s filter-then-format-layer shape,
/// minus the OpenTelemetry export layer (see `DESIGN.md`).
pub fn init_tracing(config: &ObservabilityConfig) {
    let env_filter = config
        .env_filter
        .as_deref()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")));

    match config.log_format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE);

            Registry::default().with(env_filter).with(fmt_layer).init();
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE);

            Registry::default().with(env_filter).with(fmt_layer).init();
        }
    }

    tracing::info!(service = %config.service_name, "tracing initialized");
}
