use crate::permission::{permissions_equal, Permission};
use crate::record::RecordKind;

/// Result of classifying one source entry against the store's current state
/// (spec §4.1 "Change classification"). An update is only published when at
/// least one of these is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeClassification {
    pub is_new: bool,
    pub metadata_changed: bool,
    pub content_changed: bool,
    pub permissions_changed: bool,
    pub is_deleted: bool,
}

impl ChangeClassification {
    /// Whether anything changed at all — connectors use this to decide
    /// whether to submit the entry to the Entity Processor.
    pub fn any_change(&self) -> bool {
        self.is_new
            || self.metadata_changed
            || self.content_changed
            || self.permissions_changed
            || self.is_deleted
    }
}

/// Classify an incoming record against the store's current version.
///
/// `is_deleted` is supplied by the connector (the source entry itself
/// signals deletion — tombstone marker, 404-on-lookup, etc.) rather than
/// derived here. `permissions_changed` uses the strict diff
/// (`!permissions_equal`), not an optimistic "always true on
/// re-observation" — see DESIGN.md.
pub fn classify_change(
    existing: Option<&RecordKind>,
    incoming: &RecordKind,
    old_perms: &[Permission],
    new_perms: &[Permission],
    is_deleted: bool,
) -> ChangeClassification {
    let Some(existing) = existing else {
        return ChangeClassification { is_new: true, is_deleted, ..Default::default() };
    };

    let existing_header = existing.header();
    let incoming_header = incoming.header();

    let metadata_changed = existing_header.record_name != incoming_header.record_name
        || existing_header.external_record_group_id != incoming_header.external_record_group_id;
    let content_changed = existing_header.external_revision_id != incoming_header.external_revision_id;
    let permissions_changed = !permissions_equal(old_perms, new_perms);

    ChangeClassification {
        is_new: false,
        metadata_changed,
        content_changed,
        permissions_changed,
        is_deleted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupType;
    use crate::ids::{ConnectorId, OrgId, RecordId};
    use crate::permission::{PermissionEntityKind, PermissionType};
    use crate::record::{FileRecord, IndexingStatus, RecordHeader};

    fn file(name: &str, group: &str, revision: &str) -> RecordKind {
        RecordKind::File(FileRecord {
            header: RecordHeader {
                id: RecordId::nil(),
                org_id: OrgId::nil(),
                connector_id: ConnectorId::nil(),
                connector_name: "dropbox".into(),
                version: 0,
                created_at: 0,
                updated_at: 0,
                source_created_at: 0,
                source_updated_at: 0,
                external_record_id: "abc".into(),
                record_name: name.into(),
                record_group_type: GroupType::Drive,
                external_record_group_id: group.into(),
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
            size_in_bytes: 1,
            extension: Some("txt".into()),
            is_file: true,
            sha256_hash: None,
            signed_url: None,
            path: Some(format!("/{name}")),
        })
    }

    fn owner_perm(id: &str) -> Permission {
        Permission {
            entity_kind: PermissionEntityKind::User,
            external_id: Some(id.into()),
            email: None,
            permission_type: PermissionType::Owner,
        }
    }

    #[test]
    fn brand_new_record_is_new_only() {
        let incoming = file("A.txt", "root", "rev1");
        let result = classify_change(None, &incoming, &[], &[owner_perm("u1")], false);
        assert!(result.is_new);
        assert!(!result.metadata_changed);
        assert!(!result.content_changed);
        assert!(result.any_change());
    }

    #[test]
    fn identical_record_has_no_change() {
        let existing = file("A.txt", "root", "rev1");
        let incoming = file("A.txt", "root", "rev1");
        let perms = vec![owner_perm("u1")];
        let result = classify_change(Some(&existing), &incoming, &perms, &perms, false);
        assert!(!result.any_change());
    }

    #[test]
    fn renamed_record_is_metadata_changed() {
        let existing = file("A.txt", "root", "rev1");
        let incoming = file("A2.txt", "root", "rev1");
        let perms = vec![owner_perm("u1")];
        let result = classify_change(Some(&existing), &incoming, &perms, &perms, false);
        assert!(result.metadata_changed);
        assert!(!result.content_changed);
    }

    #[test]
    fn new_revision_is_content_changed() {
        let existing = file("A.txt", "root", "rev1");
        let incoming = file("A.txt", "root", "rev2");
        let perms = vec![owner_perm("u1")];
        let result = classify_change(Some(&existing), &incoming, &perms, &perms, false);
        assert!(result.content_changed);
        assert!(!result.metadata_changed);
    }

    #[test]
    fn permission_set_change_is_detected_strictly() {
        let existing = file("A.txt", "root", "rev1");
        let incoming = file("A.txt", "root", "rev1");
        let old_perms = vec![owner_perm("u1")];
        let new_perms = vec![owner_perm("u1"), owner_perm("u2")];
        let result = classify_change(Some(&existing), &incoming, &old_perms, &new_perms, false);
        assert!(result.permissions_changed);
        assert!(!result.metadata_changed && !result.content_changed);
    }
}
