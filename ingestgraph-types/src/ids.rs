//! Identifier aliases. Every entity carries an internal `uuid::Uuid`; source
//! identifiers stay `String` since their shape is source-defined.

use uuid::Uuid;

pub type OrgId = Uuid;
pub type ConnectorId = Uuid;
pub type UserId = Uuid;
pub type GroupId = Uuid;
pub type RecordGroupId = Uuid;
pub type RecordId = Uuid;

/// Source-assigned identifier (`external_record_id`, `external_group_id`, …).
/// Kept distinct from internal ids at the type level via the field name, not
/// a wrapper type — the teacher's `Entity::Id` is similarly just `T: ToString`.
pub type ExternalId = String;
