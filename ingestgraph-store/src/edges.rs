use ingestgraph_types::{Permission, PermissionEntityKind, PermissionType};
use uuid::Uuid;

/// The two resource kinds a permission or relation edge can target
/// (spec §6 "Persisted-state layout": `permissions` is entity -> resource).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Record,
    RecordGroup,
}

/// A materialized permission edge: `resource` is the internal id of the
/// Record or RecordGroup the permission applies to.
#[derive(Debug, Clone)]
pub struct PermissionEdge {
    pub resource_id: Uuid,
    pub resource_kind: ResourceKind,
    pub permission: Permission,
}

/// The identity of a permission edge for deletion — the same
/// `(entity_type, external_id_or_email, permission_type)` key
/// `permissions_equal` uses for set comparison.
#[derive(Debug, Clone)]
pub struct PermissionKey {
    pub entity_kind: PermissionEntityKind,
    pub identity: String,
    pub permission_type: PermissionType,
}

/// Edge kind for `record_relations` (spec §6 "Persisted-state layout").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    Parent,
    Sibling,
    Attachment,
}
