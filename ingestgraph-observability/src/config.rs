/// Configuration for the tracing stack.
///
/// Scoped down from the OpenTelemetry SDK + OTLP exporter the teacher
/// wires up (`r2e-observability`'s `ObservabilityConfig`): no span
/// exporter is carried because the workspace has no `opentelemetry_sdk`
/// dependency, so this only governs the local `tracing-subscriber`
/// formatting layer. See `DESIGN.md` for the full scoping note.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Service name attached to every log line.
    pub service_name: String,
    /// Log output format: `Pretty` for local dev, `Json` for production.
    pub log_format: LogFormat,
    /// `tracing_subscriber::EnvFilter` directive string. Falls back to
    /// `"info,tower_http=debug"` when unset.
    pub env_filter: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl ObservabilityConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into(), log_format: LogFormat::Pretty, env_filter: None }
    }

    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    pub fn with_env_filter(mut self, directive: impl Into<String>) -> Self {
        self.env_filter = Some(directive.into());
        self
    }

    /// Production profile: JSON logs, same default filter.
    pub fn production(service_name: impl Into<String>) -> Self {
        Self::new(service_name).with_log_format(LogFormat::Json)
    }
}
