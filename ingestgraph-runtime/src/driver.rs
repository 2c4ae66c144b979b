use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use ingestgraph_core::EngineError;
use ingestgraph_filter::FilterOptionsResponse;
use ingestgraph_types::{RecordId, RecordKind};

use crate::context::SyncContext;

/// A provider webhook notification, already stripped of its outer HTTP
/// envelope by the webhook intake crate — treated as a hint that a scope
/// changed, never as the authoritative change itself (spec §4.1 "Webhook
/// handling": "the handler never applies the notification's payload
/// directly — it always re-fetches via `run_incremental_sync`").
#[derive(Debug, Clone)]
pub struct WebhookNotification {
    pub provider: String,
    pub resource_id: Option<String>,
    pub raw_body: Vec<u8>,
    pub headers: HashMap<String, String>,
}

/// A byte stream response from `stream_record`'s proxy path (spec §4.4
/// "Record Streamer"). Chunks are yielded as they arrive rather than
/// buffered whole, except where PDF conversion requires materializing the
/// converted file first.
pub struct StreamingResponse {
    pub content_type: String,
    pub content_disposition: Option<String>,
    pub body: Pin<Box<dyn Stream<Item = Result<Bytes, EngineError>> + Send>>,
}

/// The per-source implementation the runtime drives (spec §6 "Connector
/// Driver Interface"). Object-safe so the CLI and webhook crates can
/// dispatch to whichever connector instance owns a given connector id
/// without a generic type parameter at the call site.
#[async_trait]
pub trait ConnectorDriver: Send + Sync {
    /// One-time setup (credential validation, capability discovery).
    /// Returns whether the connector is usable.
    async fn init(&self, ctx: &SyncContext) -> Result<bool, EngineError>;

    /// Full sync of every scope this connector instance owns.
    async fn run_sync(&self, ctx: &SyncContext) -> Result<(), EngineError>;

    /// Incremental sync driven by each scope's stored SyncPoint.
    async fn run_incremental_sync(&self, ctx: &SyncContext) -> Result<(), EngineError>;

    async fn handle_webhook_notification(
        &self,
        ctx: &SyncContext,
        notification: WebhookNotification,
    ) -> Result<(), EngineError>;

    async fn test_connection_and_access(&self, ctx: &SyncContext) -> Result<bool, EngineError>;

    async fn stream_record(
        &self,
        ctx: &SyncContext,
        record: &RecordKind,
        convert_to: Option<&str>,
    ) -> Result<StreamingResponse, EngineError>;

    /// `None` when the source has no native signed-URL mechanism — the
    /// caller should fall back to proxying via `stream_record`.
    async fn get_signed_url(&self, ctx: &SyncContext, record: &RecordKind) -> Result<Option<String>, EngineError>;

    async fn reindex_records(&self, ctx: &SyncContext, records: Vec<RecordId>) -> Result<(), EngineError>;

    /// Releases any held resources (API sessions, file handles) on
    /// connector removal.
    async fn cleanup(&self, ctx: &SyncContext) -> Result<(), EngineError>;

    async fn get_filter_options(
        &self,
        ctx: &SyncContext,
        filter_key: &str,
        page: usize,
        limit: usize,
        search: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<FilterOptionsResponse, EngineError>;
}
