use serde::{Deserialize, Serialize};

use crate::ids::{ConnectorId, OrgId, RecordGroupId};

/// Container of records: a drive, team folder, mailbox label, knowledge
/// base, Linear team, or ticket project (spec §3 "RecordGroup").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordGroup {
    pub id: RecordGroupId,
    pub org_id: OrgId,
    pub connector_id: ConnectorId,
    pub connector_name: String,
    pub version: u64,
    pub created_at: i64,
    pub updated_at: i64,
    pub source_created_at: i64,
    pub source_updated_at: i64,

    pub external_group_id: String,
    pub name: String,
    pub short_name: Option<String>,
    pub group_type: GroupType,
    pub parent_external_group_id: Option<String>,
    pub web_url: Option<String>,
    pub inherit_permissions: bool,
}

/// The kind of container a [`RecordGroup`] represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupType {
    Drive,
    Mailbox,
    Project,
    ServiceNowKb,
    ServiceNowCategory,
    /// Escape hatch for source-specific container kinds not yet modeled —
    /// carries the source's own name verbatim.
    Other(String),
}
