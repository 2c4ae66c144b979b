//! The entity and permission model every connector emits, plus the pure
//! invariant functions the store and processor rely on.
//!
//! Grounded on `r2e-data::Entity`'s id/table shape and the field lists found
//! across the Dropbox/Gmail/Linear/ServiceNow connectors.

mod change;
mod cycle;
mod group;
mod ids;
mod permission;
mod record;
mod user;

pub use change::{classify_change, ChangeClassification};
pub use cycle::detect_cycle;
pub use group::{GroupType, RecordGroup};
pub use ids::{ConnectorId, ExternalId, GroupId, OrgId, RecordGroupId, RecordId, UserId};
pub use permission::{permissions_equal, Permission, PermissionEntityKind, PermissionType};
pub use record::{
    CommentRecord, FileRecord, IndexingStatus, LinkRecord, MailRecord, PublicVisibility,
    RecordHeader, RecordKind, RecordType, TicketRecord, WebpageRecord,
};
pub use user::{AppUser, AppUserGroup};
