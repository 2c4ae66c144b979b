//! Gmail attachment resolution (spec §4.4):
//!
//! > Gmail attachment, where the stored external id encodes
//! > `{messageId}_{partId}`: fetch the parent message, locate the part with
//! > matching `partId`, resolve the volatile `attachmentId`, then fetch. If
//! > the parent message returns 404, walk sibling messages with the same
//! > `internet_message_id` until one is accessible; if none, 404.
//! >
//! > Gmail attachment fallback to Drive: when the Gmail path fails, retry
//! > with Drive's `get_media`. A failure on both surfaces as 500.
//!
//! Grounded on `gmail/connector.py::_stream_attachment_record`.

use async_trait::async_trait;
use bytes::Bytes;
use ingestgraph_core::EngineError;

/// One part of a Gmail message the streamer can resolve to bytes.
#[derive(Debug, Clone)]
pub struct GmailMessagePart {
    pub part_id: String,
    pub attachment_id: String,
    pub mime_type: String,
    pub filename: String,
}

#[derive(Debug, Clone)]
pub struct GmailMessageInfo {
    pub message_id: String,
    pub internet_message_id: String,
    pub parts: Vec<GmailMessagePart>,
}

/// What the streamer needs from the Gmail API to resolve an attachment
/// record. Implemented by the Gmail connector's API client, not the
/// connector driver itself, since this is a byte-fetch concern the
/// `ConnectorDriver::stream_record` method deliberately doesn't own (spec
/// §4.4, `gmail.rs`'s `stream_record` delegates here).
#[async_trait]
pub trait GmailAttachmentSource: Send + Sync {
    /// `Ok(None)` models a 404 on the message itself.
    async fn get_message(&self, message_id: &str) -> Result<Option<GmailMessageInfo>, EngineError>;

    /// Messages sharing the same RFC `internet_message_id` header, used to
    /// walk siblings when the original message is inaccessible (a thread
    /// can have the same logical message duplicated across mailboxes/
    /// delegated access).
    async fn find_siblings_by_internet_message_id(
        &self,
        internet_message_id: &str,
    ) -> Result<Vec<GmailMessageInfo>, EngineError>;

    async fn fetch_attachment_bytes(&self, message_id: &str, attachment_id: &str) -> Result<Bytes, EngineError>;
}

/// Drive's `files.get_media` as the last-resort fallback when the Gmail
/// attachment path is exhausted.
#[async_trait]
pub trait DriveFallbackSource: Send + Sync {
    async fn get_media(&self, file_id: &str) -> Result<Bytes, EngineError>;
}

pub struct ResolvedAttachment {
    pub bytes: Bytes,
    pub mime_type: String,
    pub filename: String,
}

/// Parse the synthetic external id Gmail attachment records carry:
/// `{messageId}_{partId}`. Message ids and part ids are themselves opaque
/// source strings with no embedded `_`, so a single split on the first
/// underscore is unambiguous in practice; Gmail's ids are base64url/numeric
/// and never contain `_` as a separator character within either half.
pub fn parse_attachment_external_id(external_id: &str) -> Option<(&str, &str)> {
    external_id.split_once('_')
}

/// Resolve a Gmail attachment record to its bytes, per the fallback chain
/// in spec §4.4. `internet_message_id` comes from the parent `MailRecord`
/// already in the store (the streamer's caller looks it up before calling
/// this, since a 404 on the message id alone carries no header to walk
/// siblings by).
pub async fn resolve_gmail_attachment(
    gmail: &dyn GmailAttachmentSource,
    drive: Option<&dyn DriveFallbackSource>,
    external_id: &str,
    internet_message_id: &str,
) -> Result<ResolvedAttachment, EngineError> {
    let (message_id, part_id) = parse_attachment_external_id(external_id)
        .ok_or_else(|| EngineError::validation(format!("malformed gmail attachment id: {external_id}")))?;

    match fetch_via_message(gmail, message_id, part_id).await {
        Ok(Some(resolved)) => return Ok(resolved),
        Ok(None) => {}
        Err(e) if matches!(e, EngineError::EntityMissing { .. }) => {}
        Err(e) => return Err(e),
    }

    // Parent message or the part itself is gone. Walk siblings sharing the
    // same RFC message-id header before giving up on the Gmail surface.
    let siblings = gmail.find_siblings_by_internet_message_id(internet_message_id).await?;
    for sibling in siblings {
        if sibling.message_id == message_id {
            continue;
        }
        if let Some(resolved) = fetch_via_message(gmail, &sibling.message_id, part_id).await.ok().flatten() {
            return Ok(resolved);
        }
    }

    // Gmail exhausted. Fall back to Drive if the driver wired one in.
    if let Some(drive) = drive {
        let bytes = drive.get_media(message_id).await?;
        return Ok(ResolvedAttachment { bytes, mime_type: "application/octet-stream".into(), filename: part_id.into() });
    }

    Err(EngineError::entity_missing(format!(
        "gmail attachment {external_id} unresolvable via message, sibling walk, or drive fallback"
    )))
}

async fn fetch_via_message(
    gmail: &dyn GmailAttachmentSource,
    message_id: &str,
    part_id: &str,
) -> Result<Option<ResolvedAttachment>, EngineError> {
    let Some(message) = gmail.get_message(message_id).await? else {
        return Err(EngineError::entity_missing(format!("gmail message {message_id} not found")));
    };
    let Some(part) = message.parts.iter().find(|p| p.part_id == part_id) else {
        return Ok(None);
    };
    let bytes = gmail.fetch_attachment_bytes(message_id, &part.attachment_id).await?;
    Ok(Some(ResolvedAttachment { bytes, mime_type: part.mime_type.clone(), filename: part.filename.clone() }))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct FakeGmail {
        messages: Mutex<HashMap<String, GmailMessageInfo>>,
        attachment_bytes: Mutex<HashMap<String, Bytes>>,
    }

    #[async_trait]
    impl GmailAttachmentSource for FakeGmail {
        async fn get_message(&self, message_id: &str) -> Result<Option<GmailMessageInfo>, EngineError> {
            Ok(self.messages.lock().unwrap().get(message_id).cloned())
        }

        async fn find_siblings_by_internet_message_id(
            &self,
            internet_message_id: &str,
        ) -> Result<Vec<GmailMessageInfo>, EngineError> {
            Ok(self
                .messages
                .lock()
                .unwrap()
                .values()
                .filter(|m| m.internet_message_id == internet_message_id)
                .cloned()
                .collect())
        }

        async fn fetch_attachment_bytes(&self, message_id: &str, attachment_id: &str) -> Result<Bytes, EngineError> {
            self.attachment_bytes
                .lock()
                .unwrap()
                .get(&format!("{message_id}:{attachment_id}"))
                .cloned()
                .ok_or_else(|| EngineError::entity_missing("attachment bytes not found"))
        }
    }

    impl Clone for GmailMessageInfo {
        fn clone(&self) -> Self {
            GmailMessageInfo {
                message_id: self.message_id.clone(),
                internet_message_id: self.internet_message_id.clone(),
                parts: self.parts.clone(),
            }
        }
    }
    impl Clone for GmailMessagePart {
        fn clone(&self) -> Self {
            GmailMessagePart {
                part_id: self.part_id.clone(),
                attachment_id: self.attachment_id.clone(),
                mime_type: self.mime_type.clone(),
                filename: self.filename.clone(),
            }
        }
    }

    struct FakeDrive {
        bytes: Option<Bytes>,
    }

    #[async_trait]
    impl DriveFallbackSource for FakeDrive {
        async fn get_media(&self, _file_id: &str) -> Result<Bytes, EngineError> {
            self.bytes.clone().ok_or_else(|| EngineError::entity_missing("drive fallback has no bytes"))
        }
    }

    fn part(part_id: &str, attachment_id: &str) -> GmailMessagePart {
        GmailMessagePart { part_id: part_id.into(), attachment_id: attachment_id.into(), mime_type: "image/png".into(), filename: "img.png".into() }
    }

    #[test]
    fn parses_message_and_part_id() {
        assert_eq!(parse_attachment_external_id("msgA_part2"), Some(("msgA", "part2")));
        assert_eq!(parse_attachment_external_id("no-underscore"), None);
    }

    #[tokio::test]
    async fn resolves_directly_when_message_and_part_exist() {
        let gmail = FakeGmail::default();
        gmail.messages.lock().unwrap().insert(
            "msgA".into(),
            GmailMessageInfo { message_id: "msgA".into(), internet_message_id: "<a@mail>".into(), parts: vec![part("part2", "att1")] },
        );
        gmail.attachment_bytes.lock().unwrap().insert("msgA:att1".into(), Bytes::from_static(b"hello"));

        let resolved = resolve_gmail_attachment(&gmail, None, "msgA_part2", "<a@mail>").await.unwrap();
        assert_eq!(resolved.bytes, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn falls_back_to_sibling_message_on_404() {
        // Scenario 6 from spec §8: msgA is 404, msgB is a sibling with the
        // same internet_message_id and has the matching part.
        let gmail = FakeGmail::default();
        gmail.messages.lock().unwrap().insert(
            "msgB".into(),
            GmailMessageInfo { message_id: "msgB".into(), internet_message_id: "<shared@mail>".into(), parts: vec![part("part2", "att-b")] },
        );
        gmail.attachment_bytes.lock().unwrap().insert("msgB:att-b".into(), Bytes::from_static(b"sibling-bytes"));

        let resolved = resolve_gmail_attachment(&gmail, None, "msgA_part2", "<shared@mail>").await.unwrap();
        assert_eq!(resolved.bytes, Bytes::from_static(b"sibling-bytes"));
    }

    #[tokio::test]
    async fn falls_back_to_drive_when_gmail_exhausted() {
        let gmail = FakeGmail::default();
        let drive = FakeDrive { bytes: Some(Bytes::from_static(b"drive-bytes")) };
        let resolved = resolve_gmail_attachment(&gmail, Some(&drive), "msgA_part2", "<none@mail>").await.unwrap();
        assert_eq!(resolved.bytes, Bytes::from_static(b"drive-bytes"));
    }

    #[tokio::test]
    async fn both_surfaces_failing_is_an_error() {
        let gmail = FakeGmail::default();
        let result = resolve_gmail_attachment(&gmail, None, "msgA_part2", "<none@mail>").await;
        assert!(result.is_err());
    }
}
