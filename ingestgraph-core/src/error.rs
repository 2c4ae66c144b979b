//! The engine-wide error taxonomy (spec §7).
//!
//! Every fallible operation in every `ingestgraph-*` crate eventually bottoms
//! out in [`EngineError`]. Variants are kinds, not source-specific causes —
//! connectors translate their own HTTP/API errors into one of these.

use std::fmt;

/// Engine-wide error, mirroring the kinds in the error handling design.
#[derive(Debug)]
pub enum EngineError {
    /// Timeout, 5xx, DNS failure — retried at rate-limiter-mediated
    /// granularity by the runtime.
    Transient { message: String, source: Option<Box<dyn std::error::Error + Send + Sync>> },
    /// 401/403 with a token present. Aborts the run and marks the connector
    /// `NEEDS_REAUTH`.
    Auth { message: String },
    /// Delta-token expired, path not found. The runtime clears the
    /// `SyncPoint` for that scope and falls back to a full sync next run.
    CursorInvalid { message: String },
    /// 404 on one file/message mid-sync. The runtime skips the entity and
    /// records a warning; the run continues.
    EntityMissing { message: String },
    /// Malformed record from the source. The runtime skips the entity.
    Validation { message: String },
    /// Invariant violation inside the engine itself (not the source). Logged
    /// with context, entity skipped, health counter incremented.
    Internal { message: String, source: Option<Box<dyn std::error::Error + Send + Sync>> },
    /// Downstream store write rejected. Bubbles all the way up; no
    /// checkpoint advance.
    Store { message: String, source: Option<Box<dyn std::error::Error + Send + Sync>> },
}

impl EngineError {
    pub fn transient(message: impl Into<String>) -> Self {
        EngineError::Transient { message: message.into(), source: None }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        EngineError::Auth { message: message.into() }
    }

    pub fn cursor_invalid(message: impl Into<String>) -> Self {
        EngineError::CursorInvalid { message: message.into() }
    }

    pub fn entity_missing(message: impl Into<String>) -> Self {
        EngineError::EntityMissing { message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        EngineError::Internal { message: message.into(), source: None }
    }

    pub fn store(message: impl Into<String>) -> Self {
        EngineError::Store { message: message.into(), source: None }
    }

    /// Whether the runtime's retry policy should retry this error at
    /// batch granularity. Only transient network failures are retryable —
    /// everything else either needs reauth, a cursor reset, or a skip.
    pub fn retryable(&self) -> bool {
        matches!(self, EngineError::Transient { .. })
    }

    /// Short machine-readable kind name, used in health counters and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Transient { .. } => "transient",
            EngineError::Auth { .. } => "auth",
            EngineError::CursorInvalid { .. } => "cursor_invalid",
            EngineError::EntityMissing { .. } => "entity_missing",
            EngineError::Validation { .. } => "validation",
            EngineError::Internal { .. } => "internal",
            EngineError::Store { .. } => "store",
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Transient { message, .. } => write!(f, "transient error: {message}"),
            EngineError::Auth { message } => write!(f, "auth error: {message}"),
            EngineError::CursorInvalid { message } => write!(f, "cursor invalid: {message}"),
            EngineError::EntityMissing { message } => write!(f, "entity missing: {message}"),
            EngineError::Validation { message } => write!(f, "validation error: {message}"),
            EngineError::Internal { message, .. } => write!(f, "internal error: {message}"),
            EngineError::Store { message, .. } => write!(f, "store error: {message}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Transient { source, .. }
            | EngineError::Internal { source, .. }
            | EngineError::Store { source, .. } => {
                source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Internal { message: err.to_string(), source: Some(Box::new(err)) }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Validation { message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_is_retryable() {
        assert!(EngineError::transient("timeout").retryable());
        assert!(!EngineError::auth("expired token").retryable());
        assert!(!EngineError::cursor_invalid("stale delta token").retryable());
    }

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(EngineError::transient("x").kind(), "transient");
        assert_eq!(EngineError::auth("x").kind(), "auth");
        assert_eq!(EngineError::cursor_invalid("x").kind(), "cursor_invalid");
        assert_eq!(EngineError::entity_missing("x").kind(), "entity_missing");
        assert_eq!(EngineError::validation("x").kind(), "validation");
        assert_eq!(EngineError::internal("x").kind(), "internal");
        assert_eq!(EngineError::store("x").kind(), "store");
    }

    #[test]
    fn display_includes_message() {
        assert!(EngineError::entity_missing("msg123 not found").to_string().contains("msg123"));
    }
}
