use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// User-configured sync filter: a date window plus scope include/exclude
/// sets (teams, folders, labels — all represented as opaque scope keys,
/// since the set semantics are identical across connectors).
///
/// Evaluated per source entry before it's handed to the Entity Processor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncFilter {
    pub since: Option<i64>,
    pub until: Option<i64>,
    pub include_scopes: Option<HashSet<String>>,
    pub exclude_scopes: Option<HashSet<String>>,
}

impl SyncFilter {
    pub fn matches(&self, source_updated_at: i64, scope_key: &str) -> bool {
        if let Some(since) = self.since {
            if source_updated_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if source_updated_at > until {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude_scopes {
            if exclude.contains(scope_key) {
                return false;
            }
        }
        if let Some(include) = &self.include_scopes {
            if !include.contains(scope_key) {
                return false;
            }
        }
        true
    }
}
