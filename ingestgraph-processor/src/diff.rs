use std::collections::HashMap;

use ingestgraph_store::{PermissionKey, ResourceKind};
use ingestgraph_types::Permission;

/// The edge-by-edge change between two permission sets (spec §4.2 step 2:
/// "compute the diff against current edges, delete removed, insert added,
/// no-op on identical" — never a full replace).
pub struct PermissionDiff {
    pub to_add: Vec<Permission>,
    pub to_remove: Vec<PermissionKey>,
}

fn identity(p: &Permission) -> Option<&str> {
    p.external_id.as_deref().or(p.email.as_deref())
}

/// Grounded on `dropbox/connector.py`'s
/// `_convert_dropbox_permissions_to_permissions` followed by the processor's
/// own edge-diff before `on_updated_record_permissions`: both sides are
/// reduced to `(entity_kind, identity, permission_type)` keys and compared,
/// never replaced wholesale.
pub fn diff_permissions(old: &[Permission], new: &[Permission]) -> PermissionDiff {
    let old_by_key: HashMap<_, _> =
        old.iter().filter_map(|p| identity(p).map(|id| ((p.entity_kind, id, p.permission_type), p))).collect();
    let new_by_key: HashMap<_, _> =
        new.iter().filter_map(|p| identity(p).map(|id| ((p.entity_kind, id, p.permission_type), p))).collect();

    let to_add = new_by_key
        .iter()
        .filter(|(key, _)| !old_by_key.contains_key(*key))
        .map(|(_, p)| (*p).clone())
        .collect();

    let to_remove = old_by_key
        .iter()
        .filter(|(key, _)| !new_by_key.contains_key(*key))
        .map(|((entity_kind, identity, permission_type), _)| PermissionKey {
            entity_kind: *entity_kind,
            identity: identity.to_string(),
            permission_type: *permission_type,
        })
        .collect();

    PermissionDiff { to_add, to_remove }
}

/// Identity key helper shared with [`ResourceKind`] callers that need to
/// build a [`PermissionKey`] without going through [`diff_permissions`].
pub fn permission_key(p: &Permission) -> Option<PermissionKey> {
    identity(p)
        .map(|id| PermissionKey { entity_kind: p.entity_kind, identity: id.to_string(), permission_type: p.permission_type })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestgraph_types::{PermissionEntityKind, PermissionType};

    fn perm(id: &str, ty: PermissionType) -> Permission {
        Permission { entity_kind: PermissionEntityKind::User, external_id: Some(id.into()), email: None, permission_type: ty }
    }

    #[test]
    fn identical_sets_produce_no_diff() {
        let old = vec![perm("u1", PermissionType::Read)];
        let new = old.clone();
        let diff = diff_permissions(&old, &new);
        assert!(diff.to_add.is_empty());
        assert!(diff.to_remove.is_empty());
    }

    #[test]
    fn added_entry_is_to_add_only() {
        let old = vec![perm("u1", PermissionType::Read)];
        let new = vec![perm("u1", PermissionType::Read), perm("u2", PermissionType::Write)];
        let diff = diff_permissions(&old, &new);
        assert_eq!(diff.to_add.len(), 1);
        assert!(diff.to_remove.is_empty());
    }

    #[test]
    fn removed_entry_is_to_remove_only() {
        let old = vec![perm("u1", PermissionType::Read), perm("u2", PermissionType::Write)];
        let new = vec![perm("u1", PermissionType::Read)];
        let diff = diff_permissions(&old, &new);
        assert!(diff.to_add.is_empty());
        assert_eq!(diff.to_remove.len(), 1);
        assert_eq!(diff.to_remove[0].identity, "u2");
    }

    #[test]
    fn permission_type_change_is_remove_plus_add_not_noop() {
        let old = vec![perm("u1", PermissionType::Read)];
        let new = vec![perm("u1", PermissionType::Owner)];
        let diff = diff_permissions(&old, &new);
        assert_eq!(diff.to_add.len(), 1);
        assert_eq!(diff.to_remove.len(), 1);
    }
}
