use ingestgraph_types::{ConnectorId, OrgId};

/// Structured key `{record_type}_{scope_group}_{scope_id}` (spec §4.5),
/// namespaced by `(connector_id, org_id)` on the backing store — matching
/// "keyed per `(connector_id, org_id, data_point_type, key)`" in spec §6.
///
/// A typed builder instead of raw string formatting at every call site, so
/// Pattern A/B/C connector code can't typo a key shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncPointKey {
    pub connector_id: ConnectorId,
    pub org_id: OrgId,
    pub data_point_type: String,
    pub key: String,
}

impl SyncPointKey {
    /// `DRIVE_users_{team_member_id}` — a per-user Pattern A scope (Dropbox
    /// personal folder sync).
    pub fn drive_users(connector_id: ConnectorId, org_id: OrgId, team_member_id: &str) -> Self {
        SyncPointKey {
            connector_id,
            org_id,
            data_point_type: "DRIVE".into(),
            key: format!("users_{team_member_id}"),
        }
    }

    /// `team_{team_key}` — a Pattern C per-team watermark scope (Linear).
    pub fn team(connector_id: ConnectorId, org_id: OrgId, team_key: &str) -> Self {
        SyncPointKey { connector_id, org_id, data_point_type: "TEAM".into(), key: format!("team_{team_key}") }
    }

    /// A flat named scope with no further structure, e.g.
    /// `attachments_sync_point` or a connector-wide event cursor.
    pub fn named(connector_id: ConnectorId, org_id: OrgId, name: &str) -> Self {
        SyncPointKey { connector_id, org_id, data_point_type: "NAMED".into(), key: name.to_string() }
    }

    /// A subresource watermark under Pattern C (issues/attachments/
    /// documents/projects each own a checkpoint — spec §4.1 "mixing is a
    /// correctness bug").
    pub fn subresource(connector_id: ConnectorId, org_id: OrgId, subresource: &str, scope_id: &str) -> Self {
        SyncPointKey {
            connector_id,
            org_id,
            data_point_type: subresource.to_uppercase(),
            key: scope_id.to_string(),
        }
    }

    pub fn as_string(&self) -> String {
        format!("{}_{}", self.data_point_type, self.key)
    }
}
