//! Logging setup, W3C trace-context propagation, and request-id
//! middleware shared by the webhook (C8) and stream-router (C9) HTTP
//! surfaces.

mod config;
mod middleware;
mod propagation;
mod tracing_setup;

pub use config::{LogFormat, ObservabilityConfig};
pub use middleware::{trace_layer, MakeRequestUuid, REQUEST_ID_HEADER};
pub use propagation::{new_span_id, new_trace_id, parse_traceparent, render_traceparent, TraceContext};
pub use tracing_setup::init_tracing;
