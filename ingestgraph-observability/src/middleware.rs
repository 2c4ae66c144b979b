//! Request-id and trace-context middleware for the webhook/stream-router
//! HTTP boundary. The teacher implements its own `tower::Service` wrapper
//! (`OtelTraceService`, backed by `pin_project_lite`); this workspace has
//! no `pin-project-lite` dependency, so the same per-request span is built
//! on top of `tower_http::trace::TraceLayer`, which already owns the
//! pinning for its response future.

use http::{HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::propagation::{new_span_id, new_trace_id, parse_traceparent};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// [`MakeRequestId`] that mints a UUIDv4 per request when the client
/// didn't already send one.
#[derive(Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl<B> MakeRequestId<B> for MakeRequestUuid {
    fn make_request_id(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Build a `tower_http` trace layer whose span carries the inbound
/// `traceparent` (or a freshly minted trace id if absent/invalid) plus the
/// request id, so every log line inside a handler can be correlated back
/// to the originating HTTP request.
pub fn trace_layer<B>() -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>, impl Fn(&Request<B>) -> Span + Clone>
{
    TraceLayer::new_for_http().make_span_with(|request: &Request<B>| {
        let traceparent = request.headers().get("traceparent").and_then(|v| v.to_str().ok()).and_then(parse_traceparent);

        let (trace_id, parent_id) = match traceparent {
            Some(ctx) => (ctx.trace_id, ctx.parent_id),
            None => (new_trace_id(), new_span_id()),
        };

        let request_id = request.headers().get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();

        tracing::info_span!(
            "http_request",
            method = %request.method(),
            path = %request.uri().path(),
            trace_id = %trace_id,
            parent_id = %parent_id,
            request_id = %request_id,
            status = tracing::field::Empty,
        )
    })
}
