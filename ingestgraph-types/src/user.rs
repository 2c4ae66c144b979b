use serde::{Deserialize, Serialize};

use crate::ids::{ConnectorId, OrgId, UserId};

/// A user discovered in a connector's source (spec §3 "User (AppUser)").
///
/// `email` is unique within `(org_id, connector_id)`. Created on first
/// appearance in a source users API; marked inactive on remove/deactivate;
/// never hard-deleted while any permission edge references it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppUser {
    pub id: UserId,
    pub org_id: OrgId,
    pub connector_id: ConnectorId,
    pub connector_name: String,
    pub version: u64,
    pub created_at: i64,
    pub updated_at: i64,
    pub source_created_at: i64,
    pub source_updated_at: i64,

    pub source_user_id: String,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub title: Option<String>,
}

/// A group of users within a connector (spec §3 "Group (AppUserGroup)").
///
/// Roles, organizational units, and teams all map onto this type;
/// implementations distinguish them by a `name` prefix convention
/// (`ROLE_`, `COMPANY_`) rather than a separate type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppUserGroup {
    pub id: crate::ids::GroupId,
    pub org_id: OrgId,
    pub connector_id: ConnectorId,
    pub connector_name: String,
    pub version: u64,
    pub created_at: i64,
    pub updated_at: i64,
    pub source_created_at: i64,
    pub source_updated_at: i64,

    pub source_user_group_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Nested groups: external ids of direct parents, if any.
    pub parent_external_group_ids: Vec<String>,
}
