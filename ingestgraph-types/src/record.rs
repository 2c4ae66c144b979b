use serde::{Deserialize, Serialize};

use crate::group::GroupType;
use crate::ids::{ConnectorId, OrgId, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordType {
    File,
    Mail,
    Ticket,
    Comment,
    Link,
    Webpage,
}

/// Whether and how a record has been submitted to the indexing pipeline.
/// `AutoIndexOff` is the gate the Entity Processor checks before emitting an
/// indexing-requested event (spec §4.2 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexingStatus {
    NotIndexed,
    IndexingRequested,
    Indexed,
    AutoIndexOff,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicVisibility {
    Public,
    Private,
    Unknown,
}

/// Fields common to every record subtype (spec §3 "Record (polymorphic)").
/// Embedded via `#[serde(flatten)]` in each [`RecordKind`] variant so the
/// wire representation is a single flat JSON object tagged by `record_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordHeader {
    pub id: RecordId,
    pub org_id: OrgId,
    pub connector_id: ConnectorId,
    pub connector_name: String,
    pub version: u64,
    pub created_at: i64,
    pub updated_at: i64,
    pub source_created_at: i64,
    pub source_updated_at: i64,

    pub external_record_id: String,
    pub record_name: String,
    pub record_group_type: GroupType,
    pub external_record_group_id: String,
    pub parent_external_record_id: Option<String>,
    pub parent_record_type: Option<RecordType>,
    pub mime_type: String,
    pub weburl: Option<String>,
    pub preview_renderable: bool,
    pub is_dependent_node: bool,
    pub parent_node_id: Option<String>,
    pub inherit_permissions: bool,
    pub indexing_status: IndexingStatus,
    pub external_revision_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(flatten)]
    pub header: RecordHeader,
    pub size_in_bytes: u64,
    pub extension: Option<String>,
    pub is_file: bool,
    pub sha256_hash: Option<String>,
    pub signed_url: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailRecord {
    #[serde(flatten)]
    pub header: RecordHeader,
    pub thread_id: String,
    pub label_ids: Vec<String>,
    pub subject: String,
    pub from_email: String,
    pub to_emails: Vec<String>,
    pub cc_emails: Vec<String>,
    pub bcc_emails: Vec<String>,
    pub internet_message_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    #[serde(flatten)]
    pub header: RecordHeader,
    pub status: String,
    pub priority: Option<String>,
    pub ticket_type: Option<String>,
    pub assignee: Option<String>,
    pub assignee_email: Option<String>,
    pub creator_email: Option<String>,
    pub creator_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    #[serde(flatten)]
    pub header: RecordHeader,
    pub author_source_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    #[serde(flatten)]
    pub header: RecordHeader,
    pub url: String,
    pub title: Option<String>,
    pub is_public: PublicVisibility,
    pub linked_record_id: Option<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebpageRecord {
    #[serde(flatten)]
    pub header: RecordHeader,
    // Content is fetched at stream time (spec §3), not stored here.
}

/// The polymorphic Record, tagged by `record_type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record_type")]
pub enum RecordKind {
    #[serde(rename = "FILE")]
    File(FileRecord),
    #[serde(rename = "MAIL")]
    Mail(MailRecord),
    #[serde(rename = "TICKET")]
    Ticket(TicketRecord),
    #[serde(rename = "COMMENT")]
    Comment(CommentRecord),
    #[serde(rename = "LINK")]
    Link(LinkRecord),
    #[serde(rename = "WEBPAGE")]
    Webpage(WebpageRecord),
}

impl RecordKind {
    pub fn header(&self) -> &RecordHeader {
        match self {
            RecordKind::File(r) => &r.header,
            RecordKind::Mail(r) => &r.header,
            RecordKind::Ticket(r) => &r.header,
            RecordKind::Comment(r) => &r.header,
            RecordKind::Link(r) => &r.header,
            RecordKind::Webpage(r) => &r.header,
        }
    }

    pub fn header_mut(&mut self) -> &mut RecordHeader {
        match self {
            RecordKind::File(r) => &mut r.header,
            RecordKind::Mail(r) => &mut r.header,
            RecordKind::Ticket(r) => &mut r.header,
            RecordKind::Comment(r) => &mut r.header,
            RecordKind::Link(r) => &mut r.header,
            RecordKind::Webpage(r) => &mut r.header,
        }
    }

    pub fn record_type(&self) -> RecordType {
        match self {
            RecordKind::File(_) => RecordType::File,
            RecordKind::Mail(_) => RecordType::Mail,
            RecordKind::Ticket(_) => RecordType::Ticket,
            RecordKind::Comment(_) => RecordType::Comment,
            RecordKind::Link(_) => RecordType::Link,
            RecordKind::Webpage(_) => RecordType::Webpage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> RecordHeader {
        RecordHeader {
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
            external_revision_id: Some("rev1".into()),
        }
    }

    #[test]
    fn record_kind_dispatches_to_shared_header() {
        let rec = RecordKind::File(FileRecord {
            header: header(),
            size_in_bytes: 10,
            extension: Some("txt".into()),
            is_file: true,
            sha256_hash: None,
            signed_url: None,
            path: Some("/A.txt".into()),
        });
        assert_eq!(rec.record_type(), RecordType::File);
        assert_eq!(rec.header().external_record_id, "abc");
    }

    #[test]
    fn wire_format_tags_by_record_type_and_flattens_header() {
        let rec = RecordKind::Mail(MailRecord {
            header: header(),
            thread_id: "t1".into(),
            label_ids: vec!["INBOX".into()],
            subject: "Hi".into(),
            from_email: "a@example.com".into(),
            to_emails: vec!["b@example.com".into()],
            cc_emails: vec![],
            bcc_emails: vec![],
            internet_message_id: "<abc@mail>".into(),
        });
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["record_type"], "MAIL");
        assert_eq!(json["external_record_id"], "abc");
        assert_eq!(json["thread_id"], "t1");

        let round_tripped: RecordKind = serde_json::from_value(json).unwrap();
        assert_eq!(round_tripped, rec);
    }
}
