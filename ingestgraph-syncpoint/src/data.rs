use std::collections::HashMap;

use serde_json::Value;

/// A checkpoint's payload — a loose JSON map, with typed accessors so
/// connectors never touch raw JSON at the call site (spec §4.5 keeps the
/// payload shape source-defined: `{cursor}`, `{historyId}`, or
/// `{last_sync_time}`, never all three at once).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPointData {
    fields: HashMap<String, Value>,
}

impl SyncPointData {
    pub fn new() -> Self {
        SyncPointData::default()
    }

    pub fn from_fields(fields: HashMap<String, Value>) -> Self {
        SyncPointData { fields }
    }

    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.fields
    }

    pub fn cursor(&self) -> Option<&str> {
        self.fields.get("cursor").and_then(Value::as_str)
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.fields.insert("cursor".into(), Value::String(cursor.into()));
        self
    }

    pub fn history_id(&self) -> Option<&str> {
        self.fields.get("historyId").and_then(Value::as_str)
    }

    pub fn with_history_id(mut self, history_id: impl Into<String>) -> Self {
        self.fields.insert("historyId".into(), Value::String(history_id.into()));
        self
    }

    pub fn last_sync_time(&self) -> Option<i64> {
        self.fields.get("last_sync_time").and_then(Value::as_i64)
    }

    pub fn with_last_sync_time(mut self, last_sync_time: i64) -> Self {
        self.fields.insert("last_sync_time".into(), Value::from(last_sync_time));
        self
    }

    pub fn page_token(&self) -> Option<&str> {
        self.fields.get("page_token").and_then(Value::as_str)
    }

    pub fn with_page_token(mut self, page_token: impl Into<String>) -> Self {
        self.fields.insert("page_token".into(), Value::String(page_token.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors_round_trip() {
        let data = SyncPointData::new().with_cursor("abc123").with_last_sync_time(42);
        assert_eq!(data.cursor(), Some("abc123"));
        assert_eq!(data.last_sync_time(), Some(42));
        assert_eq!(data.history_id(), None);
    }
}
