use std::sync::Arc;

use async_trait::async_trait;
use ingestgraph_core::{Clock, EngineConfig, EngineError};
use ingestgraph_events::DomainEventBus;
use ingestgraph_filter::SyncFilter;
use ingestgraph_processor::EntityProcessor;
use ingestgraph_ratelimit::RateLimiter;
use ingestgraph_store::Store;
use ingestgraph_syncpoint::SyncPointStore;
use ingestgraph_types::{
    AppUser, AppUserGroup, ConnectorId, Permission, PermissionType, RecordGroup, RecordId, RecordKind,
};
use tokio_util::sync::CancellationToken;

/// Object-safe mirror of [`EntityProcessor`]'s write surface (spec §4.2), so
/// a [`crate::ConnectorDriver`] implementation doesn't need to be generic
/// over a concrete `Store` backend — it takes `&SyncContext`, which holds a
/// `dyn EntityWriter`.
#[async_trait]
pub trait EntityWriter: Send + Sync {
    async fn on_new_app_users(&self, users: Vec<AppUser>) -> Result<(), EngineError>;

    async fn on_new_user_groups(
        &self,
        groups: Vec<(AppUserGroup, Vec<(String, PermissionType)>)>,
    ) -> Result<(), EngineError>;

    async fn on_new_record_groups(&self, groups: Vec<(RecordGroup, Vec<Permission>)>) -> Result<(), EngineError>;

    async fn on_new_records(&self, records: Vec<(RecordKind, Vec<Permission>)>) -> Result<(), EngineError>;

    async fn on_record_content_update(&self, record: RecordKind) -> Result<(), EngineError>;

    async fn on_record_metadata_update(&self, record: RecordKind) -> Result<(), EngineError>;

    async fn on_updated_record_permissions(
        &self,
        record_id: RecordId,
        permissions: Vec<Permission>,
    ) -> Result<(), EngineError>;

    async fn on_record_deleted(&self, record_id: RecordId) -> Result<(), EngineError>;

    async fn on_user_group_member_added(
        &self,
        connector_id: ConnectorId,
        external_group_id: String,
        email: String,
        permission_type: PermissionType,
    );

    async fn on_user_group_member_removed(&self, connector_id: ConnectorId, external_group_id: String, email: String);

    async fn on_user_group_deleted(&self, connector_id: ConnectorId, external_group_id: String);

    async fn update_record_group_name(
        &self,
        connector_id: ConnectorId,
        external_group_id: String,
        new_name: String,
        old_name: String,
    ) -> Result<(), EngineError>;
}

#[async_trait]
impl<S: Store + 'static> EntityWriter for EntityProcessor<S> {
    async fn on_new_app_users(&self, users: Vec<AppUser>) -> Result<(), EngineError> {
        EntityProcessor::on_new_app_users(self, users).await
    }

    async fn on_new_user_groups(
        &self,
        groups: Vec<(AppUserGroup, Vec<(String, PermissionType)>)>,
    ) -> Result<(), EngineError> {
        EntityProcessor::on_new_user_groups(self, groups).await
    }

    async fn on_new_record_groups(&self, groups: Vec<(RecordGroup, Vec<Permission>)>) -> Result<(), EngineError> {
        EntityProcessor::on_new_record_groups(self, groups).await
    }

    async fn on_new_records(&self, records: Vec<(RecordKind, Vec<Permission>)>) -> Result<(), EngineError> {
        EntityProcessor::on_new_records(self, records).await
    }

    async fn on_record_content_update(&self, record: RecordKind) -> Result<(), EngineError> {
        EntityProcessor::on_record_content_update(self, record).await
    }

    async fn on_record_metadata_update(&self, record: RecordKind) -> Result<(), EngineError> {
        EntityProcessor::on_record_metadata_update(self, record).await
    }

    async fn on_updated_record_permissions(
        &self,
        record_id: RecordId,
        permissions: Vec<Permission>,
    ) -> Result<(), EngineError> {
        EntityProcessor::on_updated_record_permissions(self, record_id, permissions).await
    }

    async fn on_record_deleted(&self, record_id: RecordId) -> Result<(), EngineError> {
        EntityProcessor::on_record_deleted(self, record_id).await
    }

    async fn on_user_group_member_added(
        &self,
        connector_id: ConnectorId,
        external_group_id: String,
        email: String,
        permission_type: PermissionType,
    ) {
        EntityProcessor::on_user_group_member_added(self, connector_id, external_group_id, email, permission_type)
            .await
    }

    async fn on_user_group_member_removed(&self, connector_id: ConnectorId, external_group_id: String, email: String) {
        EntityProcessor::on_user_group_member_removed(self, connector_id, external_group_id, email).await
    }

    async fn on_user_group_deleted(&self, connector_id: ConnectorId, external_group_id: String) {
        EntityProcessor::on_user_group_deleted(self, connector_id, external_group_id).await
    }

    async fn update_record_group_name(
        &self,
        connector_id: ConnectorId,
        external_group_id: String,
        new_name: String,
        old_name: String,
    ) -> Result<(), EngineError> {
        EntityProcessor::update_record_group_name(self, connector_id, external_group_id, new_name, old_name).await
    }
}

/// Everything a [`crate::ConnectorDriver`] needs to run a sync: the write
/// path, the checkpoint store, the rate limiter, the clock, config, and a
/// cancellation signal. One instance per connector instance (Design Notes:
/// "encapsulate in one runtime struct... avoid process-wide singletons for
/// testability").
#[derive(Clone)]
pub struct SyncContext {
    pub connector_id: ConnectorId,
    pub org_id: ingestgraph_types::OrgId,
    pub store: Arc<dyn Store>,
    pub processor: Arc<dyn EntityWriter>,
    pub sync_points: Arc<dyn SyncPointStore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub clock: Arc<dyn Clock>,
    pub config: EngineConfig,
    pub filter: SyncFilter,
    pub events: DomainEventBus,
    pub cancel: CancellationToken,
}
