//! Hand-rolled W3C `traceparent` propagation.
//!
//! The teacher installs a full OpenTelemetry `TraceContextPropagator`
//! (`r2e_observability::propagation::install_propagator`); this workspace
//! has no `opentelemetry_sdk` dependency to back that, so the same
//! `traceparent: 00-{trace-id}-{parent-id}-{flags}` wire format (W3C Trace
//! Context, version `00`) is parsed and generated directly against the
//! header string.

/// A parsed `traceparent` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: String,
    pub parent_id: String,
    pub sampled: bool,
}

/// Parse a `traceparent` header value. Returns `None` for anything that
/// isn't a well-formed version-00 header; malformed input is treated as
/// absent rather than an error, same as the teacher's propagator falling
/// back to a fresh context on extraction failure.
pub fn parse_traceparent(header: &str) -> Option<TraceContext> {
    let parts: Vec<&str> = header.trim().split('-').collect();
    if parts.len() != 4 {
        return None;
    }
    let [version, trace_id, parent_id, flags] = [parts[0], parts[1], parts[2], parts[3]];
    if version != "00" || trace_id.len() != 32 || parent_id.len() != 16 || flags.len() != 2 {
        return None;
    }
    if trace_id.chars().all(|c| c == '0') || parent_id.chars().all(|c| c == '0') {
        return None;
    }
    if !trace_id.bytes().all(|b| b.is_ascii_hexdigit()) || !parent_id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let flag_byte = u8::from_str_radix(flags, 16).ok()?;
    Some(TraceContext { trace_id: trace_id.to_string(), parent_id: parent_id.to_string(), sampled: flag_byte & 0x01 != 0 })
}

/// Render a `traceparent` header for an outbound request, continuing the
/// trace with a fresh span id.
pub fn render_traceparent(trace_id: &str, span_id: &str, sampled: bool) -> String {
    format!("00-{trace_id}-{span_id}-{:02x}", if sampled { 1u8 } else { 0 })
}

/// Generate a fresh 16-byte trace id as lowercase hex, for requests that
/// arrive with no (or an invalid) `traceparent`.
pub fn new_trace_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Generate a fresh 8-byte span id as lowercase hex.
pub fn new_span_id() -> String {
    let full = uuid::Uuid::new_v4().simple().to_string();
    full[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_header() {
        let header = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";
        let ctx = parse_traceparent(header).unwrap();
        assert_eq!(ctx.trace_id, "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(ctx.parent_id, "00f067aa0ba902b7");
        assert!(ctx.sampled);
    }

    #[test]
    fn unsampled_flag_is_honored() {
        let header = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-00";
        let ctx = parse_traceparent(header).unwrap();
        assert!(!ctx.sampled);
    }

    #[test]
    fn rejects_wrong_version() {
        assert!(parse_traceparent("01-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01").is_none());
    }

    #[test]
    fn rejects_all_zero_trace_id() {
        let header = "00-00000000000000000000000000000000-00f067aa0ba902b7-01";
        assert!(parse_traceparent(header).is_none());
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(parse_traceparent("not-a-traceparent").is_none());
    }

    #[test]
    fn render_roundtrips_through_parse() {
        let trace_id = new_trace_id();
        let span_id = new_span_id();
        let header = render_traceparent(&trace_id, &span_id, true);
        let parsed = parse_traceparent(&header).unwrap();
        assert_eq!(parsed.trace_id, trace_id);
        assert_eq!(parsed.parent_id, span_id);
        assert!(parsed.sampled);
    }
}
