use std::sync::Arc;

use ingestgraph_core::EngineError;
use ingestgraph_events::{
    DomainEventBus, GroupDeleted, GroupMemberAdded, GroupMemberRemoved, IndexingRequested,
    NewRecords, RecordContentUpdated, RecordDeleted, RecordGroupRenamed, RecordMetadataUpdated,
    RecordPermissionsUpdated,
};
use ingestgraph_store::{PermissionEdge, RelationType, ResourceKind, Store};
use ingestgraph_types::{
    classify_change, AppUser, AppUserGroup, ConnectorId, IndexingStatus, Permission,
    PermissionType, RecordGroup, RecordId, RecordKind,
};

use crate::diff::diff_permissions;
use crate::pending::PendingChildren;

/// The write path from connector output to the Store plus domain events
/// (spec §4.2 "Entity Processor (C3)"). Grounded on `r2e_data`'s repository
/// pattern for the Store access shape and on
/// `dropbox/connector.py`'s `_process_entry`/
/// `_convert_dropbox_permissions_to_permissions` for the permission-diff
/// algorithm.
///
/// `connector_name` parameters in spec.md's method signatures are taken as
/// already-resolved [`ConnectorId`]s here: every other persisted entity in
/// this crate is keyed by id, not name, and the runtime that calls these
/// methods already holds the id.
pub struct EntityProcessor<S: Store> {
    store: Arc<S>,
    events: DomainEventBus,
    pending: PendingChildren,
}

impl<S: Store> EntityProcessor<S> {
    pub fn new(store: Arc<S>, events: DomainEventBus) -> Self {
        EntityProcessor { store, events, pending: PendingChildren::new() }
    }

    pub async fn on_new_app_users(&self, users: Vec<AppUser>) -> Result<(), EngineError> {
        let tx = self.store.begin_transaction().await?;
        tx.batch_upsert_users(users).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn on_new_user_groups(
        &self,
        groups: Vec<(AppUserGroup, Vec<(String, PermissionType)>)>,
    ) -> Result<(), EngineError> {
        let (user_groups, memberships): (Vec<_>, Vec<_>) = groups.into_iter().unzip();
        let connector_id = user_groups.first().map(|g| g.connector_id);

        let tx = self.store.begin_transaction().await?;
        tx.batch_upsert_user_groups(user_groups.clone()).await?;
        tx.commit().await?;

        for (group, members) in user_groups.iter().zip(memberships) {
            for (email, permission_type) in members {
                self.events
                    .emit(GroupMemberAdded {
                        connector_id: connector_id.unwrap_or(group.connector_id),
                        external_group_id: group.source_user_group_id.clone(),
                        email,
                        permission_type,
                    })
                    .await;
            }
        }
        Ok(())
    }

    pub async fn on_new_record_groups(
        &self,
        groups: Vec<(RecordGroup, Vec<Permission>)>,
    ) -> Result<(), EngineError> {
        for (group, permissions) in groups {
            let tx = self.store.begin_transaction().await?;
            let upserted =
                tx.batch_upsert_record_groups(vec![group]).await?.into_iter().next().ok_or_else(|| {
                    EngineError::internal("batch_upsert_record_groups returned no rows")
                })?;

            let old_perms = tx.get_permissions_for_resource(upserted.id, ResourceKind::RecordGroup).await?;
            let diff = diff_permissions(&old_perms, &permissions);
            if !diff.to_add.is_empty() {
                let edges = diff
                    .to_add
                    .into_iter()
                    .map(|permission| PermissionEdge {
                        resource_id: upserted.id,
                        resource_kind: ResourceKind::RecordGroup,
                        permission,
                    })
                    .collect();
                tx.batch_create_edges(edges).await?;
            }
            for key in diff.to_remove {
                tx.delete_edge(upserted.id, ResourceKind::RecordGroup, key).await?;
            }

            tx.commit().await?;
        }
        Ok(())
    }

    /// Implements spec §4.2's 5-point contract. Each `(record, permissions)`
    /// tuple is written atomically at the per-record granularity; the whole
    /// batch need not be a single transaction.
    pub async fn on_new_records(
        &self,
        records: Vec<(RecordKind, Vec<Permission>)>,
    ) -> Result<(), EngineError> {
        let mut new_record_ids = Vec::new();

        for (record, permissions) in records {
            let (record_id, is_new) = self.upsert_one_record(record, permissions).await?;
            if is_new {
                new_record_ids.push(record_id);
            }
        }

        if !new_record_ids.is_empty() {
            self.events.emit(NewRecords { record_ids: new_record_ids }).await;
        }
        Ok(())
    }

    /// Steps 1-4 of the contract for a single tuple, plus draining any
    /// pending children now that this record exists. Step 5 (per-record
    /// atomicity) is the single `Tx` this function opens and commits.
    async fn upsert_one_record(
        &self,
        mut record: RecordKind,
        permissions: Vec<Permission>,
    ) -> Result<(RecordId, bool), EngineError> {
        let connector_id = record.header().connector_id;
        let external_id = record.header().external_record_id.clone();
        let parent_external_id = record.header().parent_external_record_id.clone();
        let indexing_status = record.header().indexing_status;

        let tx = self.store.begin_transaction().await?;

        let existing = tx.get_record_by_external_id(connector_id, &external_id).await?;
        let old_perms = match &existing {
            Some(existing) => tx.get_permissions_for_resource(existing.header().id, ResourceKind::Record).await?,
            None => Vec::new(),
        };
        let classification = classify_change(existing.as_ref(), &record, &old_perms, &permissions, false);

        if !classification.any_change() {
            let record_id = existing.expect("unchanged record must already exist").header().id;
            tx.commit().await?;
            return Ok((record_id, false));
        }

        // Preserve the internal id across updates and bump the version
        // (spec.md:104 / contract step 1 "preserve the internal id");
        // connector builders always mint a fresh id + version 0.
        if let Some(existing) = &existing {
            record.header_mut().id = existing.header().id;
            record.header_mut().version = existing.header().version + 1;
        }

        let upserted = tx
            .batch_upsert_records(vec![record])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::internal("batch_upsert_records returned no rows"))?;
        let record_id = upserted.header().id;

        if classification.is_new || classification.permissions_changed {
            let diff = diff_permissions(&old_perms, &permissions);
            if !diff.to_add.is_empty() {
                let edges = diff
                    .to_add
                    .into_iter()
                    .map(|permission| PermissionEdge { resource_id: record_id, resource_kind: ResourceKind::Record, permission })
                    .collect();
                tx.batch_create_edges(edges).await?;
            }
            for key in diff.to_remove {
                tx.delete_edge(record_id, ResourceKind::Record, key).await?;
            }
        }

        if let Some(parent_external_id) = &parent_external_id {
            match tx.get_record_by_external_id(connector_id, parent_external_id).await? {
                Some(parent) => {
                    tx.create_record_relation(parent.header().id, record_id, RelationType::Parent).await?;
                }
                None => {
                    if !self.pending.queue(connector_id, &external_id, parent_external_id, record_id) {
                        tracing::warn!(
                            connector_id = %connector_id,
                            external_id = %external_id,
                            parent_external_id = %parent_external_id,
                            "skipping parent edge: would introduce a cycle"
                        );
                    }
                }
            }
        }

        tx.commit().await?;

        if indexing_status != IndexingStatus::AutoIndexOff {
            self.events.emit(IndexingRequested { record_id }).await;
        }

        self.link_pending_children(connector_id, &external_id, record_id).await?;

        Ok((record_id, classification.is_new))
    }

    /// Drains every record waiting on `parent_external_id` and creates the
    /// deferred parent-child edge, now that the parent itself exists.
    async fn link_pending_children(
        &self,
        connector_id: ConnectorId,
        parent_external_id: &str,
        parent_record_id: RecordId,
    ) -> Result<(), EngineError> {
        let children = self.pending.drain(connector_id, parent_external_id);
        if children.is_empty() {
            return Ok(());
        }

        let tx = self.store.begin_transaction().await?;
        for child_id in children {
            tx.create_record_relation(parent_record_id, child_id, RelationType::Parent).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn on_record_content_update(&self, record: RecordKind) -> Result<(), EngineError> {
        let record_id = record.header().id;
        let tx = self.store.begin_transaction().await?;
        tx.batch_upsert_records(vec![record]).await?;
        tx.commit().await?;
        self.events.emit(RecordContentUpdated { record_id }).await;
        Ok(())
    }

    pub async fn on_record_metadata_update(&self, record: RecordKind) -> Result<(), EngineError> {
        let record_id = record.header().id;
        let tx = self.store.begin_transaction().await?;
        tx.batch_upsert_records(vec![record]).await?;
        tx.commit().await?;
        self.events.emit(RecordMetadataUpdated { record_id }).await;
        Ok(())
    }

    /// Same edge-diff discipline as `on_new_records` step 2, applied
    /// standalone when only permissions changed.
    pub async fn on_updated_record_permissions(
        &self,
        record_id: RecordId,
        permissions: Vec<Permission>,
    ) -> Result<(), EngineError> {
        let tx = self.store.begin_transaction().await?;
        let old_perms = tx.get_permissions_for_resource(record_id, ResourceKind::Record).await?;
        let diff = diff_permissions(&old_perms, &permissions);

        if !diff.to_add.is_empty() {
            let edges = diff
                .to_add
                .into_iter()
                .map(|permission| PermissionEdge { resource_id: record_id, resource_kind: ResourceKind::Record, permission })
                .collect();
            tx.batch_create_edges(edges).await?;
        }
        for key in diff.to_remove {
            tx.delete_edge(record_id, ResourceKind::Record, key).await?;
        }
        tx.commit().await?;

        self.events.emit(RecordPermissionsUpdated { record_id }).await;
        Ok(())
    }

    pub async fn on_record_deleted(&self, record_id: RecordId) -> Result<(), EngineError> {
        let tx = self.store.begin_transaction().await?;
        tx.delete_record(record_id).await?;
        tx.commit().await?;
        self.events.emit(RecordDeleted { record_id }).await;
        Ok(())
    }

    /// No membership table exists in the Store interface (spec §6 persists
    /// Users/Groups/RecordGroups/Records + resource permission edges only,
    /// never group membership itself) — this is notification-only, for
    /// downstream consumers that expand group membership into resource
    /// permissions. See DESIGN.md.
    pub async fn on_user_group_member_added(
        &self,
        connector_id: ConnectorId,
        external_group_id: String,
        email: String,
        permission_type: PermissionType,
    ) {
        self.events.emit(GroupMemberAdded { connector_id, external_group_id, email, permission_type }).await;
    }

    pub async fn on_user_group_member_removed(
        &self,
        connector_id: ConnectorId,
        external_group_id: String,
        email: String,
    ) {
        self.events.emit(GroupMemberRemoved { connector_id, external_group_id, email }).await;
    }

    pub async fn on_user_group_deleted(&self, connector_id: ConnectorId, external_group_id: String) {
        self.events.emit(GroupDeleted { connector_id, external_group_id }).await;
    }

    pub async fn update_record_group_name(
        &self,
        connector_id: ConnectorId,
        external_group_id: String,
        new_name: String,
        old_name: String,
    ) -> Result<(), EngineError> {
        let tx = self.store.begin_transaction().await?;
        if let Some(mut group) = tx.get_record_group_by_external_id(connector_id, &external_group_id).await? {
            group.name = new_name.clone();
            tx.batch_upsert_record_groups(vec![group]).await?;
        }
        tx.commit().await?;

        self.events.emit(RecordGroupRenamed { connector_id, external_group_id, old_name, new_name }).await;
        Ok(())
    }
}
