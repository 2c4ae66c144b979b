//! Connector health reporting — read-only surface aggregated by the runtime
//! and exposed by the CLI's `doctor` subcommand and the webhook crate's
//! `/health` route. Shape follows `r2e_core::health`'s status/response split.

use std::collections::HashMap;

use serde::Serialize;

/// Auth status for a single connector instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ok,
    NeedsReauth,
    Unknown,
}

/// Aggregated health for one connector instance, updated by the runtime
/// after every run. Record counts are keyed by indexing status (spec §7
/// "user-visible failures").
#[derive(Debug, Clone, Serialize)]
pub struct HealthSummary {
    pub connector_id: String,
    pub last_sync_time_ms: Option<i64>,
    pub last_error: Option<String>,
    pub record_counts_by_status: HashMap<String, u64>,
    pub auth_status: HealthStatus,
}

impl HealthSummary {
    pub fn new(connector_id: impl Into<String>) -> Self {
        HealthSummary {
            connector_id: connector_id.into(),
            last_sync_time_ms: None,
            last_error: None,
            record_counts_by_status: HashMap::new(),
            auth_status: HealthStatus::Unknown,
        }
    }

    pub fn record_success(&mut self, at_ms: i64) {
        self.last_sync_time_ms = Some(at_ms);
        self.last_error = None;
        self.auth_status = HealthStatus::Ok;
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn record_auth_failure(&mut self, message: impl Into<String>) {
        self.auth_status = HealthStatus::NeedsReauth;
        self.last_error = Some(message.into());
    }

    pub fn increment_count(&mut self, status: impl Into<String>, by: u64) {
        *self.record_counts_by_status.entry(status.into()).or_insert(0) += by;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_success_clears_error_and_sets_ok() {
        let mut h = HealthSummary::new("dropbox-1");
        h.record_auth_failure("token expired");
        assert_eq!(h.auth_status, HealthStatus::NeedsReauth);
        h.record_success(1000);
        assert_eq!(h.auth_status, HealthStatus::Ok);
        assert!(h.last_error.is_none());
        assert_eq!(h.last_sync_time_ms, Some(1000));
    }

    #[test]
    fn counts_accumulate_by_status() {
        let mut h = HealthSummary::new("linear-1");
        h.increment_count("indexed", 3);
        h.increment_count("indexed", 2);
        h.increment_count("auto_index_off", 1);
        assert_eq!(h.record_counts_by_status["indexed"], 5);
        assert_eq!(h.record_counts_by_status["auto_index_off"], 1);
    }
}
