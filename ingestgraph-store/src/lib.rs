//! The `Store`/`Tx` abstraction consumed by the Entity Processor (spec §6
//! "Store Interface"), plus an in-memory reference implementation.
//!
//! Grounded on `r2e_data::{Entity, Repository, Page, Pageable, DataError}`
//! and `r2e_data_sqlx`'s transaction shape.

mod edges;
mod error;
mod in_memory;
mod traits;

pub use edges::{PermissionEdge, PermissionKey, RelationType, ResourceKind};
pub use error::StoreError;
pub use in_memory::InMemoryStore;
pub use traits::{Store, Tx};

#[cfg(test)]
mod tests {
    use super::*;
    use ingestgraph_types::{
        FileRecord, GroupType, IndexingStatus, Permission, PermissionEntityKind, PermissionType,
        RecordHeader, RecordId, RecordKind,
    };
    use uuid::Uuid;

    fn file_record(connector_id: Uuid, external_id: &str, revision: &str) -> RecordKind {
        RecordKind::File(FileRecord {
            header: RecordHeader {
                id: Uuid::new_v4(),
                org_id: Uuid::new_v4(),
                connector_id,
                connector_name: "dropbox".into(),
                version: 0,
                created_at: 0,
                updated_at: 0,
                source_created_at: 0,
                source_updated_at: 0,
                external_record_id: external_id.into(),
                record_name: "A.txt".into(),
                record_group_type: GroupType::Drive,
                external_record_group_id: "root".into(),
                parent_external_record_id: None,
                parent_record_type: None,
                mime_type: "text/plain".into(),
                weburl: None,
                preview_renderable: true,
                is_dependent_node: false,
                parent_node_id: None,
                inherit_permissions: true,
                indexing_status: IndexingStatus::NotIndexed,
                external_revision_id: Some(revision.into()),
            },
            size_in_bytes: 10,
            extension: Some("txt".into()),
            is_file: true,
            sha256_hash: None,
            signed_url: None,
            path: Some(format!("/{external_id}")),
        })
    }

    #[tokio::test]
    async fn upsert_then_lookup_by_external_id_round_trips() {
        let store = InMemoryStore::new();
        let connector_id = Uuid::new_v4();
        let tx = store.begin_transaction().await.unwrap();
        let record = file_record(connector_id, "ext-1", "rev1");
        let record_id = record.header().id;
        tx.batch_upsert_records(vec![record]).await.unwrap();
        tx.commit().await.unwrap();

        let tx2 = store.begin_transaction().await.unwrap();
        let found = tx2.get_record_by_external_id(connector_id, "ext-1").await.unwrap().unwrap();
        assert_eq!(found.header().id, record_id);
    }

    #[tokio::test]
    async fn upsert_with_same_external_id_preserves_internal_id() {
        let store = InMemoryStore::new();
        let connector_id = Uuid::new_v4();
        let tx = store.begin_transaction().await.unwrap();
        let first = file_record(connector_id, "ext-1", "rev1");
        let internal_id = first.header().id;
        tx.batch_upsert_records(vec![first]).await.unwrap();

        // Second write reuses the same internal id, simulating the
        // processor's "preserve internal id across updates" contract.
        let mut second = file_record(connector_id, "ext-1", "rev2");
        second.header_mut().id = internal_id;
        tx.batch_upsert_records(vec![second]).await.unwrap();

        let found = tx.get_record_by_external_id(connector_id, "ext-1").await.unwrap().unwrap();
        assert_eq!(found.header().id, internal_id);
        assert_eq!(found.header().external_revision_id.as_deref(), Some("rev2"));
    }

    #[tokio::test]
    async fn permission_edges_add_and_remove() {
        let store = InMemoryStore::new();
        let tx = store.begin_transaction().await.unwrap();
        let resource_id = Uuid::new_v4();
        let perm = Permission {
            entity_kind: PermissionEntityKind::User,
            external_id: Some("u1".into()),
            email: None,
            permission_type: PermissionType::Read,
        };
        tx.batch_create_edges(vec![PermissionEdge {
            resource_id,
            resource_kind: ResourceKind::Record,
            permission: perm.clone(),
        }])
        .await
        .unwrap();

        let fetched = tx.get_permissions_for_resource(resource_id, ResourceKind::Record).await.unwrap();
        assert_eq!(fetched.len(), 1);

        tx.delete_edge(
            resource_id,
            ResourceKind::Record,
            PermissionKey {
                entity_kind: PermissionEntityKind::User,
                identity: "u1".into(),
                permission_type: PermissionType::Read,
            },
        )
        .await
        .unwrap();

        let fetched = tx.get_permissions_for_resource(resource_id, ResourceKind::Record).await.unwrap();
        assert!(fetched.is_empty());
    }

    #[tokio::test]
    async fn get_records_by_parent_filters_by_connector_and_parent() {
        let store = InMemoryStore::new();
        let connector_id = Uuid::new_v4();
        let tx = store.begin_transaction().await.unwrap();
        let mut child = file_record(connector_id, "child-1", "rev1");
        child.header_mut().parent_external_record_id = Some("parent-1".into());
        tx.batch_upsert_records(vec![child]).await.unwrap();

        let mut unrelated = file_record(connector_id, "other", "rev1");
        unrelated.header_mut().parent_external_record_id = Some("parent-2".into());
        tx.batch_upsert_records(vec![unrelated]).await.unwrap();

        let children = tx.get_records_by_parent(connector_id, "parent-1", None).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].header().external_record_id, "child-1");
    }

    #[tokio::test]
    async fn delete_record_removes_external_id_index() {
        let store = InMemoryStore::new();
        let connector_id = Uuid::new_v4();
        let tx = store.begin_transaction().await.unwrap();
        let record = file_record(connector_id, "ext-1", "rev1");
        let record_id: RecordId = record.header().id;
        tx.batch_upsert_records(vec![record]).await.unwrap();
        tx.delete_record(record_id).await.unwrap();

        let found = tx.get_record_by_external_id(connector_id, "ext-1").await.unwrap();
        assert!(found.is_none());
    }
}
