use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// The entity a permission edge originates from. `Org` grants the
/// permission to every active user in the org (spec §3 "Permission edge").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionEntityKind {
    User,
    Group,
    Org,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionType {
    Owner,
    Write,
    Read,
}

/// An edge from `(User|Group|Org)` to a Record or RecordGroup.
///
/// `external_id` is the source-provided identifier of the granting entity
/// (a group id, a user's source id); for `User` entities the user's email
/// is used as the identifying key when `external_id` is absent, since email
/// is the stable cross-connector identity for people (spec Invariant 4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub entity_kind: PermissionEntityKind,
    pub external_id: Option<String>,
    pub email: Option<String>,
    pub permission_type: PermissionType,
}

impl Permission {
    /// The identity key used for set-equality comparisons: `external_id`
    /// when present, otherwise `email`. A permission with neither is
    /// malformed and never compares equal to anything, including itself
    /// under a different instance — callers should reject it at ingestion.
    fn identity_key(&self) -> Option<&str> {
        self.external_id.as_deref().or(self.email.as_deref())
    }

    fn set_key(&self) -> Option<(PermissionEntityKind, &str, PermissionType)> {
        self.identity_key().map(|key| (self.entity_kind, key, self.permission_type))
    }
}

/// Set equality over `(entity_type, external_id_or_email, permission_type)`
/// — order and insertion time are irrelevant (spec Invariant 4, §8
/// "Permission equality").
pub fn permissions_equal(a: &[Permission], b: &[Permission]) -> bool {
    let set_a: HashSet<_> = a.iter().filter_map(Permission::set_key).collect();
    let set_b: HashSet<_> = b.iter().filter_map(Permission::set_key).collect();
    set_a == set_b
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(kind: PermissionEntityKind, id: &str, ty: PermissionType) -> Permission {
        Permission { entity_kind: kind, external_id: Some(id.to_string()), email: None, permission_type: ty }
    }

    #[test]
    fn order_does_not_matter() {
        let a = vec![
            perm(PermissionEntityKind::User, "u1", PermissionType::Read),
            perm(PermissionEntityKind::Group, "g1", PermissionType::Write),
        ];
        let b = vec![
            perm(PermissionEntityKind::Group, "g1", PermissionType::Write),
            perm(PermissionEntityKind::User, "u1", PermissionType::Read),
        ];
        assert!(permissions_equal(&a, &b));
    }

    #[test]
    fn different_permission_type_is_not_equal() {
        let a = vec![perm(PermissionEntityKind::User, "u1", PermissionType::Read)];
        let b = vec![perm(PermissionEntityKind::User, "u1", PermissionType::Write)];
        assert!(!permissions_equal(&a, &b));
    }

    #[test]
    fn email_identity_used_when_external_id_absent() {
        let a = vec![Permission {
            entity_kind: PermissionEntityKind::User,
            external_id: None,
            email: Some("alice@example.com".into()),
            permission_type: PermissionType::Owner,
        }];
        let b = a.clone();
        assert!(permissions_equal(&a, &b));
    }

    #[test]
    fn duplicate_entries_collapse_under_set_equality() {
        let a = vec![
            perm(PermissionEntityKind::User, "u1", PermissionType::Read),
            perm(PermissionEntityKind::User, "u1", PermissionType::Read),
        ];
        let b = vec![perm(PermissionEntityKind::User, "u1", PermissionType::Read)];
        assert!(permissions_equal(&a, &b));
    }

    #[test]
    fn empty_vs_empty_is_equal() {
        assert!(permissions_equal(&[], &[]));
    }
}
