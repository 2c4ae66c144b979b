use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use futures_util::stream;
use ingestgraph_core::EngineError;
use ingestgraph_runtime::{ConnectorDriver, StreamingResponse, SyncContext};
use ingestgraph_types::{RecordKind, RecordType};
use tokio_util::io::ReaderStream;

use crate::gmail_attachment::{resolve_gmail_attachment, DriveFallbackSource, GmailAttachmentSource};
use crate::mime::google_native_kind;
use crate::pdf::PdfConverter;

/// Parses a Google-native Drive document into structured JSON instead of
/// raw bytes (spec §4.4). Out of scope for this engine (delegates to the
/// excluded document-parsing service) — modeled as a trait boundary.
#[async_trait]
pub trait GoogleNativeDocParser: Send + Sync {
    async fn parse(&self, record: &RecordKind) -> Result<serde_json::Value, EngineError>;
}

/// Dispatches a single record's byte fetch by [`RecordKind`] (spec §4.4).
///
/// Holds the cross-cutting concerns that don't belong to any one connector:
/// the Gmail attachment fallback chain, the Google-native-document parser
/// hookup, and PDF conversion. Generic, connector-owned streaming (the
/// common case) is delegated straight through to
/// [`ConnectorDriver::stream_record`].
pub struct RecordStreamer {
    gmail: Option<Arc<dyn GmailAttachmentSource>>,
    drive_fallback: Option<Arc<dyn DriveFallbackSource>>,
    google_docs: Option<Arc<dyn GoogleNativeDocParser>>,
    pdf_converter: Option<Arc<dyn PdfConverter>>,
}

impl RecordStreamer {
    pub fn new() -> Self {
        RecordStreamer { gmail: None, drive_fallback: None, google_docs: None, pdf_converter: None }
    }

    pub fn with_gmail(mut self, source: Arc<dyn GmailAttachmentSource>) -> Self {
        self.gmail = Some(source);
        self
    }

    pub fn with_drive_fallback(mut self, source: Arc<dyn DriveFallbackSource>) -> Self {
        self.drive_fallback = Some(source);
        self
    }

    pub fn with_google_docs(mut self, parser: Arc<dyn GoogleNativeDocParser>) -> Self {
        self.google_docs = Some(parser);
        self
    }

    pub fn with_pdf_converter(mut self, converter: Arc<dyn PdfConverter>) -> Self {
        self.pdf_converter = Some(converter);
        self
    }

    fn is_gmail_attachment(record: &RecordKind) -> bool {
        let header = record.header();
        matches!(record, RecordKind::File(_))
            && header.parent_record_type == Some(RecordType::Mail)
            && header.external_record_id.contains('_')
    }

    /// Stream a record's bytes, dispatching per spec §4.4. `internet_message_id`
    /// is required only for Gmail attachment records — the caller looks it
    /// up from the parent `MailRecord` in the store before calling this,
    /// since a 404 on the message carries no header to walk siblings by.
    pub async fn stream(
        &self,
        ctx: &SyncContext,
        driver: &dyn ConnectorDriver,
        record: &RecordKind,
        convert_to: Option<&str>,
        internet_message_id: Option<&str>,
    ) -> Result<StreamingResponse, EngineError> {
        let header = record.header();

        if let Some(kind) = google_native_kind(&header.mime_type) {
            let parser = self
                .google_docs
                .as_ref()
                .ok_or_else(|| EngineError::internal("no google-native document parser configured"))?;
            let _ = kind;
            let json = parser.parse(record).await?;
            let bytes = Bytes::from(serde_json::to_vec(&json)?);
            return Ok(StreamingResponse {
                content_type: "application/json".into(),
                content_disposition: None,
                body: single_chunk_stream(bytes),
            });
        }

        if Self::is_gmail_attachment(record) {
            let gmail =
                self.gmail.as_ref().ok_or_else(|| EngineError::internal("no gmail attachment source configured"))?;
            let internet_message_id = internet_message_id
                .ok_or_else(|| EngineError::validation("gmail attachment stream requires the parent internet_message_id"))?;
            let resolved = resolve_gmail_attachment(
                gmail.as_ref(),
                self.drive_fallback.as_deref(),
                &header.external_record_id,
                internet_message_id,
            )
            .await?;
            return Ok(StreamingResponse {
                content_type: resolved.mime_type,
                content_disposition: Some(format!("attachment; filename=\"{}\"", resolved.filename)),
                body: single_chunk_stream(resolved.bytes),
            });
        }

        let response = driver.stream_record(ctx, record, convert_to).await?;

        match convert_to {
            Some(target) if target == "application/pdf" && response.content_type != "application/pdf" => {
                self.convert_response_to_pdf(ctx, response).await
            }
            _ => Ok(response),
        }
    }

    /// Materialize the source stream to a temp file, run the configured
    /// [`PdfConverter`], then stream the converted PDF back chunk by chunk
    /// (spec §4.4: never buffer the whole converted file in memory for the
    /// *response* — only the conversion step itself needs the file on
    /// disk, since the external converter has no streaming API).
    async fn convert_response_to_pdf(
        &self,
        ctx: &SyncContext,
        response: StreamingResponse,
    ) -> Result<StreamingResponse, EngineError> {
        let converter =
            self.pdf_converter.as_ref().ok_or_else(|| EngineError::internal("no pdf converter configured"))?;

        let dir = tempfile::tempdir()?;
        let input_path = dir.path().join("input");
        {
            use tokio::io::AsyncWriteExt;
            let mut file = tokio::fs::File::create(&input_path).await?;
            let mut body = response.body;
            use futures_util::StreamExt;
            while let Some(chunk) = body.next().await {
                file.write_all(&chunk?).await?;
            }
            file.flush().await?;
        }

        let output_path = converter
            .convert(&input_path, dir.path(), ctx.config.pdf_conversion_soft_timeout(), ctx.config.pdf_conversion_hard_kill())
            .await?;

        let file = tokio::fs::File::open(&output_path).await?;
        let reader_stream = ReaderStream::new(file);

        // Keep the tempdir alive for the lifetime of the stream by moving it
        // into the mapped stream's state alongside the reader.
        use futures_util::TryStreamExt;
        let guard = dir;
        let body = reader_stream
            .map_err(|e| EngineError::internal(e.to_string()))
            .map_ok(move |chunk| {
                let _keep_alive = &guard;
                chunk
            });

        Ok(StreamingResponse {
            content_type: "application/pdf".into(),
            content_disposition: response.content_disposition,
            body: Box::pin(body),
        })
    }
}

impl Default for RecordStreamer {
    fn default() -> Self {
        RecordStreamer::new()
    }
}

fn single_chunk_stream(bytes: Bytes) -> Pin<Box<dyn Stream<Item = Result<Bytes, EngineError>> + Send>> {
    Box::pin(stream::once(async move { Ok(bytes) }))
}
