use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use ingestgraph_types::{
    AppUser, AppUserGroup, ConnectorId, GroupId, OrgId, RecordGroup, RecordGroupId, RecordId,
    RecordKind, RecordType, UserId,
};
use uuid::Uuid;

use crate::edges::{PermissionEdge, PermissionKey, RelationType, ResourceKind};
use crate::error::StoreError;
use crate::traits::{Store, Tx};

/// `DashMap`-backed reference [`Store`] implementation. Sufficient to
/// exercise every testable property in spec §8 without a real graph
/// database — used by the test suites across the workspace and by
/// `ingestgraph-test`'s harness.
///
/// Each operation mutates the shared maps directly rather than buffering
/// into a pending changeset: `DashMap`'s per-entry atomicity already gives
/// the per-record-atomic guarantee spec §4.2 step 5 requires, so `commit`
/// and `rollback` on the returned [`InMemoryTx`] are no-ops. A durable
/// backend (not implemented here) would buffer writes and apply them on
/// `commit`.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Arc<Tables>,
}

#[derive(Default)]
struct Tables {
    records: DashMap<RecordId, RecordKind>,
    records_by_external: DashMap<(ConnectorId, String), RecordId>,
    record_groups: DashMap<RecordGroupId, RecordGroup>,
    record_groups_by_external: DashMap<(ConnectorId, String), RecordGroupId>,
    users: DashMap<UserId, AppUser>,
    users_by_email: DashMap<(OrgId, ConnectorId, String), UserId>,
    users_by_source_id: DashMap<(OrgId, ConnectorId, String), UserId>,
    user_groups: DashMap<GroupId, AppUserGroup>,
    user_groups_by_external: DashMap<(ConnectorId, String), GroupId>,
    permissions: DashMap<(Uuid, u8), Vec<ingestgraph_types::Permission>>,
    relations: DashMap<RecordId, Vec<(RecordId, RelationType)>>,
}

fn resource_key(id: Uuid, kind: ResourceKind) -> (Uuid, u8) {
    (id, match kind { ResourceKind::Record => 0, ResourceKind::RecordGroup => 1 })
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore { inner: Arc::new(Tables::default()) }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin_transaction(&self) -> Result<Box<dyn Tx>, StoreError> {
        Ok(Box::new(InMemoryTx { tables: self.inner.clone() }))
    }
}

pub struct InMemoryTx {
    tables: Arc<Tables>,
}

#[async_trait]
impl Tx for InMemoryTx {
    async fn get_record_by_external_id(
        &self,
        connector_id: ConnectorId,
        external_id: &str,
    ) -> Result<Option<RecordKind>, StoreError> {
        let key = (connector_id, external_id.to_string());
        Ok(self
            .tables
            .records_by_external
            .get(&key)
            .and_then(|id| self.tables.records.get(&*id).map(|r| r.clone())))
    }

    async fn get_record_group_by_external_id(
        &self,
        connector_id: ConnectorId,
        external_id: &str,
    ) -> Result<Option<RecordGroup>, StoreError> {
        let key = (connector_id, external_id.to_string());
        Ok(self
            .tables
            .record_groups_by_external
            .get(&key)
            .and_then(|id| self.tables.record_groups.get(&*id).map(|g| g.clone())))
    }

    async fn get_user_by_email(
        &self,
        org_id: OrgId,
        connector_id: ConnectorId,
        email: &str,
    ) -> Result<Option<AppUser>, StoreError> {
        let key = (org_id, connector_id, email.to_string());
        Ok(self
            .tables
            .users_by_email
            .get(&key)
            .and_then(|id| self.tables.users.get(&*id).map(|u| u.clone())))
    }

    async fn get_user_by_source_id(
        &self,
        org_id: OrgId,
        connector_id: ConnectorId,
        source_user_id: &str,
    ) -> Result<Option<AppUser>, StoreError> {
        let key = (org_id, connector_id, source_user_id.to_string());
        Ok(self
            .tables
            .users_by_source_id
            .get(&key)
            .and_then(|id| self.tables.users.get(&*id).map(|u| u.clone())))
    }

    async fn get_user_group_by_external_id(
        &self,
        connector_id: ConnectorId,
        external_id: &str,
    ) -> Result<Option<AppUserGroup>, StoreError> {
        let key = (connector_id, external_id.to_string());
        Ok(self
            .tables
            .user_groups_by_external
            .get(&key)
            .and_then(|id| self.tables.user_groups.get(&*id).map(|g| g.clone())))
    }

    async fn batch_upsert_records(&self, records: Vec<RecordKind>) -> Result<Vec<RecordKind>, StoreError> {
        let mut out = Vec::with_capacity(records.len());
        for record in records {
            let header = record.header();
            let key = (header.connector_id, header.external_record_id.clone());
            self.tables.records_by_external.insert(key, header.id);
            self.tables.records.insert(header.id, record.clone());
            out.push(record);
        }
        Ok(out)
    }

    async fn batch_upsert_record_groups(
        &self,
        groups: Vec<RecordGroup>,
    ) -> Result<Vec<RecordGroup>, StoreError> {
        let mut out = Vec::with_capacity(groups.len());
        for group in groups {
            let key = (group.connector_id, group.external_group_id.clone());
            self.tables.record_groups_by_external.insert(key, group.id);
            self.tables.record_groups.insert(group.id, group.clone());
            out.push(group);
        }
        Ok(out)
    }

    async fn batch_upsert_user_groups(
        &self,
        groups: Vec<AppUserGroup>,
    ) -> Result<Vec<AppUserGroup>, StoreError> {
        let mut out = Vec::with_capacity(groups.len());
        for group in groups {
            let key = (group.connector_id, group.source_user_group_id.clone());
            self.tables.user_groups_by_external.insert(key, group.id);
            self.tables.user_groups.insert(group.id, group.clone());
            out.push(group);
        }
        Ok(out)
    }

    async fn batch_upsert_users(&self, users: Vec<AppUser>) -> Result<Vec<AppUser>, StoreError> {
        let mut out = Vec::with_capacity(users.len());
        for user in users {
            let email_key = (user.org_id, user.connector_id, user.email.clone());
            let source_key = (user.org_id, user.connector_id, user.source_user_id.clone());
            self.tables.users_by_email.insert(email_key, user.id);
            self.tables.users_by_source_id.insert(source_key, user.id);
            self.tables.users.insert(user.id, user.clone());
            out.push(user);
        }
        Ok(out)
    }

    async fn get_permissions_for_resource(
        &self,
        resource_id: Uuid,
        resource_kind: ResourceKind,
    ) -> Result<Vec<ingestgraph_types::Permission>, StoreError> {
        Ok(self
            .tables
            .permissions
            .get(&resource_key(resource_id, resource_kind))
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }

    async fn batch_create_edges(&self, edges: Vec<PermissionEdge>) -> Result<(), StoreError> {
        for edge in edges {
            let key = resource_key(edge.resource_id, edge.resource_kind);
            let mut entry = self.tables.permissions.entry(key).or_default();
            if !entry.contains(&edge.permission) {
                entry.push(edge.permission);
            }
        }
        Ok(())
    }

    async fn delete_edge(
        &self,
        resource_id: Uuid,
        resource_kind: ResourceKind,
        key: PermissionKey,
    ) -> Result<(), StoreError> {
        let map_key = resource_key(resource_id, resource_kind);
        if let Some(mut entry) = self.tables.permissions.get_mut(&map_key) {
            entry.retain(|perm| {
                let identity = perm.external_id.as_deref().or(perm.email.as_deref());
                !(perm.entity_kind == key.entity_kind
                    && perm.permission_type == key.permission_type
                    && identity == Some(key.identity.as_str()))
            });
        }
        Ok(())
    }

    async fn create_record_relation(
        &self,
        from_id: RecordId,
        to_id: RecordId,
        relation_type: RelationType,
    ) -> Result<(), StoreError> {
        self.tables.relations.entry(from_id).or_default().push((to_id, relation_type));
        Ok(())
    }

    async fn get_records_by_parent(
        &self,
        connector_id: ConnectorId,
        parent_external_id: &str,
        record_type: Option<RecordType>,
    ) -> Result<Vec<RecordKind>, StoreError> {
        Ok(self
            .tables
            .records
            .iter()
            .filter(|entry| {
                let header = entry.value().header();
                header.connector_id == connector_id
                    && header.parent_external_record_id.as_deref() == Some(parent_external_id)
                    && record_type.map(|rt| entry.value().record_type() == rt).unwrap_or(true)
            })
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn get_record_by_path(
        &self,
        connector_name: &str,
        path: &str,
    ) -> Result<Option<RecordKind>, StoreError> {
        Ok(self
            .tables
            .records
            .iter()
            .find(|entry| {
                let record = entry.value();
                record.header().connector_name == connector_name
                    && matches!(record, RecordKind::File(f) if f.path.as_deref() == Some(path))
            })
            .map(|entry| entry.value().clone()))
    }

    async fn delete_record(&self, record_id: RecordId) -> Result<(), StoreError> {
        if let Some((_, record)) = self.tables.records.remove(&record_id) {
            let header = record.header();
            self.tables
                .records_by_external
                .remove(&(header.connector_id, header.external_record_id.clone()));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
