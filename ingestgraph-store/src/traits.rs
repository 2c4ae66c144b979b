use async_trait::async_trait;
use ingestgraph_types::{
    AppUser, AppUserGroup, ConnectorId, OrgId, RecordGroup, RecordId, RecordKind, RecordType,
};
use uuid::Uuid;

use crate::edges::{PermissionEdge, PermissionKey, RelationType, ResourceKind};
use crate::error::StoreError;

/// Entry point: every write goes through a transaction (spec §6 "Store
/// Interface"). Mirrors `r2e_data_sqlx`'s pool -> tx shape.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin_transaction(&self) -> Result<Box<dyn Tx>, StoreError>;
}

/// The per-record-atomic write surface the Entity Processor drives.
///
/// Object-safe via `async_trait` so `ConnectorRuntime<C>` and
/// `EntityProcessor<S, B>` can hold `Box<dyn Tx>` without a generic
/// parameter per backend.
#[async_trait]
pub trait Tx: Send + Sync {
    async fn get_record_by_external_id(
        &self,
        connector_id: ConnectorId,
        external_id: &str,
    ) -> Result<Option<RecordKind>, StoreError>;

    async fn get_record_group_by_external_id(
        &self,
        connector_id: ConnectorId,
        external_id: &str,
    ) -> Result<Option<RecordGroup>, StoreError>;

    async fn get_user_by_email(
        &self,
        org_id: OrgId,
        connector_id: ConnectorId,
        email: &str,
    ) -> Result<Option<AppUser>, StoreError>;

    async fn get_user_by_source_id(
        &self,
        org_id: OrgId,
        connector_id: ConnectorId,
        source_user_id: &str,
    ) -> Result<Option<AppUser>, StoreError>;

    async fn get_user_group_by_external_id(
        &self,
        connector_id: ConnectorId,
        external_id: &str,
    ) -> Result<Option<AppUserGroup>, StoreError>;

    async fn batch_upsert_records(&self, records: Vec<RecordKind>) -> Result<Vec<RecordKind>, StoreError>;

    async fn batch_upsert_record_groups(
        &self,
        groups: Vec<RecordGroup>,
    ) -> Result<Vec<RecordGroup>, StoreError>;

    async fn batch_upsert_user_groups(
        &self,
        groups: Vec<AppUserGroup>,
    ) -> Result<Vec<AppUserGroup>, StoreError>;

    async fn batch_upsert_users(&self, users: Vec<AppUser>) -> Result<Vec<AppUser>, StoreError>;

    /// Current permission edges on a resource — the read half of the
    /// edge-diff the processor performs before `batch_create_edges`/
    /// `delete_edge` (spec §4.2 step 2). Not explicitly named in spec §6,
    /// but required to implement it; see DESIGN.md.
    async fn get_permissions_for_resource(
        &self,
        resource_id: Uuid,
        resource_kind: ResourceKind,
    ) -> Result<Vec<ingestgraph_types::Permission>, StoreError>;

    async fn batch_create_edges(&self, edges: Vec<PermissionEdge>) -> Result<(), StoreError>;

    async fn delete_edge(
        &self,
        resource_id: Uuid,
        resource_kind: ResourceKind,
        key: PermissionKey,
    ) -> Result<(), StoreError>;

    async fn create_record_relation(
        &self,
        from_id: RecordId,
        to_id: RecordId,
        relation_type: RelationType,
    ) -> Result<(), StoreError>;

    async fn get_records_by_parent(
        &self,
        connector_id: ConnectorId,
        parent_external_id: &str,
        record_type: Option<RecordType>,
    ) -> Result<Vec<RecordKind>, StoreError>;

    async fn get_record_by_path(
        &self,
        connector_name: &str,
        path: &str,
    ) -> Result<Option<RecordKind>, StoreError>;

    async fn delete_record(&self, record_id: RecordId) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
