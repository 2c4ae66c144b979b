use ingestgraph_types::{ConnectorId, PermissionType, RecordId};

/// One or more records were written for the first time (spec §4.5). Carries
/// the internal ids so the indexing pipeline can fetch the full records.
#[derive(Debug, Clone)]
pub struct NewRecords {
    pub record_ids: Vec<RecordId>,
}

#[derive(Debug, Clone)]
pub struct RecordContentUpdated {
    pub record_id: RecordId,
}

#[derive(Debug, Clone)]
pub struct RecordMetadataUpdated {
    pub record_id: RecordId,
}

#[derive(Debug, Clone)]
pub struct RecordPermissionsUpdated {
    pub record_id: RecordId,
}

#[derive(Debug, Clone)]
pub struct RecordDeleted {
    pub record_id: RecordId,
}

/// Emitted at `on_new_records` step 4 when a record's `indexing_status` is
/// not `AUTO_INDEX_OFF` — the (out-of-scope) indexing pipeline subscribes.
#[derive(Debug, Clone)]
pub struct IndexingRequested {
    pub record_id: RecordId,
}

#[derive(Debug, Clone)]
pub struct GroupMemberAdded {
    pub connector_id: ConnectorId,
    pub external_group_id: String,
    pub email: String,
    pub permission_type: PermissionType,
}

#[derive(Debug, Clone)]
pub struct GroupMemberRemoved {
    pub connector_id: ConnectorId,
    pub external_group_id: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct GroupDeleted {
    pub connector_id: ConnectorId,
    pub external_group_id: String,
}

#[derive(Debug, Clone)]
pub struct RecordGroupRenamed {
    pub connector_id: ConnectorId,
    pub external_group_id: String,
    pub old_name: String,
    pub new_name: String,
}
