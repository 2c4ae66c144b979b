//! The three incremental-sync loop shapes named in spec §4.1. Each is a
//! generic driver function: the connector supplies `fetch`/`process`
//! closures for its own wire format, the driver supplies the
//! checkpoint-after-durable-write discipline, cancellation checks, and
//! cooperative yielding between pages.

use std::future::Future;

use ingestgraph_core::EngineError;
use ingestgraph_syncpoint::{SyncPointData, SyncPointKey, SyncPointStore};
use tokio_util::sync::CancellationToken;

/// One page of entries from a Pattern A (cursor pagination) endpoint.
/// Grounded on Dropbox's `files_list_folder`/`files_list_folder_continue`
/// response shape: an opaque `cursor`, a `has_more` flag, and the page's
/// entries.
pub struct CursorPage<T> {
    pub entries: Vec<T>,
    pub cursor: Option<String>,
    pub has_more: bool,
}

/// Drives Pattern A. `fetch(None)` is the initial page, `fetch(Some(cursor))`
/// every page after. The SyncPoint is only overwritten once `process` has
/// durably accepted the page — a crash between fetch and process simply
/// re-fetches the same page next run.
pub async fn run_cursor_pagination_sync<T, FetchFut, ProcessFut>(
    sync_points: &dyn SyncPointStore,
    key: &SyncPointKey,
    cancel: &CancellationToken,
    mut fetch: impl FnMut(Option<String>) -> FetchFut,
    mut process: impl FnMut(Vec<T>) -> ProcessFut,
) -> Result<(), EngineError>
where
    FetchFut: Future<Output = Result<CursorPage<T>, EngineError>>,
    ProcessFut: Future<Output = Result<(), EngineError>>,
{
    let mut cursor = sync_points.read(key).await.cursor().map(str::to_string);

    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let page = match fetch(cursor.clone()).await {
            Ok(page) => page,
            Err(EngineError::CursorInvalid { message }) => {
                tracing::warn!(key = %key.as_string(), %message, "cursor invalid, clearing for full resync");
                sync_points.clear(key).await;
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let has_more = page.has_more;
        let next_cursor = page.cursor.clone();
        process(page.entries).await?;

        if let Some(next_cursor) = &next_cursor {
            sync_points.update(key, SyncPointData::new().with_cursor(next_cursor.clone())).await;
        }
        cursor = next_cursor;

        if !has_more {
            break;
        }
        tokio::task::yield_now().await;
    }
    Ok(())
}

/// An event-log checkpoint is either an opaque cursor (Dropbox team events)
/// or a provider-assigned history id (Gmail `historyId`) — never both at
/// once for a given scope.
#[derive(Debug, Clone)]
pub enum EventCheckpoint {
    Cursor(String),
    HistoryId(String),
}

impl EventCheckpoint {
    fn write_into(&self, data: SyncPointData) -> SyncPointData {
        match self {
            EventCheckpoint::Cursor(cursor) => data.with_cursor(cursor.clone()),
            EventCheckpoint::HistoryId(history_id) => data.with_history_id(history_id.clone()),
        }
    }

    fn read_from(data: &SyncPointData) -> Option<Self> {
        if let Some(cursor) = data.cursor() {
            return Some(EventCheckpoint::Cursor(cursor.to_string()));
        }
        data.history_id().map(|h| EventCheckpoint::HistoryId(h.to_string()))
    }
}

pub struct EventPage<T> {
    pub entries: Vec<T>,
    pub checkpoint: EventCheckpoint,
    pub has_more: bool,
}

/// Outcome of one fetch attempt against an event-log endpoint.
pub enum EventFetchOutcome<T> {
    Page(EventPage<T>),
    /// 404 or "history too old" — the stored checkpoint can no longer be
    /// resumed from; the caller must fall back to a full sync and establish
    /// a fresh bootstrap checkpoint.
    StaleCheckpoint,
}

pub enum EventLogOutcome {
    Completed,
    /// No checkpoint was stored, or the stored one turned out stale. The
    /// caller is responsible for the bootstrap dance (spec §4.1 Pattern B:
    /// "initialize the checkpoint to `now` *before* the full sync begins,
    /// then run the full sync") since that differs per source — Gmail
    /// stamps `historyId` from the profile it just fetched, Dropbox stamps
    /// the team event cursor from a zero-window events call.
    NeedsFullSyncBootstrap,
}

/// Drives the steady-state stepping part of Pattern B once a checkpoint
/// exists. See [`bootstrap_event_checkpoint`] for establishing the first
/// one.
pub async fn run_event_log_sync<T, FetchFut, ProcessFut>(
    sync_points: &dyn SyncPointStore,
    key: &SyncPointKey,
    cancel: &CancellationToken,
    mut fetch: impl FnMut(EventCheckpoint) -> FetchFut,
    mut process: impl FnMut(Vec<T>) -> ProcessFut,
) -> Result<EventLogOutcome, EngineError>
where
    FetchFut: Future<Output = Result<EventFetchOutcome<T>, EngineError>>,
    ProcessFut: Future<Output = Result<(), EngineError>>,
{
    let existing = sync_points.read(key).await;
    let Some(mut checkpoint) = EventCheckpoint::read_from(&existing) else {
        return Ok(EventLogOutcome::NeedsFullSyncBootstrap);
    };

    loop {
        if cancel.is_cancelled() {
            return Ok(EventLogOutcome::Completed);
        }

        match fetch(checkpoint.clone()).await? {
            EventFetchOutcome::StaleCheckpoint => {
                tracing::warn!(key = %key.as_string(), "event checkpoint stale, clearing for full resync");
                sync_points.clear(key).await;
                return Ok(EventLogOutcome::NeedsFullSyncBootstrap);
            }
            EventFetchOutcome::Page(page) => {
                let has_more = page.has_more;
                let next = page.checkpoint;
                process(page.entries).await?;
                sync_points.update(key, next.write_into(SyncPointData::new())).await;
                checkpoint = next;

                if !has_more {
                    break;
                }
                tokio::task::yield_now().await;
            }
        }
    }
    Ok(EventLogOutcome::Completed)
}

/// Stamps a freshly-minted checkpoint *before* a full-sync bootstrap runs,
/// so events raised while the bootstrap is in flight aren't lost (spec
/// §4.1 Pattern B).
pub async fn bootstrap_event_checkpoint(sync_points: &dyn SyncPointStore, key: &SyncPointKey, checkpoint: EventCheckpoint) {
    sync_points.update(key, checkpoint.write_into(SyncPointData::new())).await;
}

/// One page of entries from a Pattern C (timestamp high-watermark)
/// endpoint, e.g. Linear's `updatedAt`-sorted issue query or ServiceNow's
/// `sys_updated_on` filter.
pub struct WatermarkPage<T> {
    pub entries: Vec<T>,
    pub has_more: bool,
}

/// Drives Pattern C. `process` reports back the maximum `source_updated_at`
/// of the records it actually wrote in this batch (`None` if it wrote
/// nothing, e.g. every entry in the page was filtered out) — the watermark
/// only advances to that value, never to "now" or to the page boundary, so
/// a record whose write failed is naturally re-fetched next run.
pub async fn run_watermark_sync<T, FetchFut, ProcessFut>(
    sync_points: &dyn SyncPointStore,
    key: &SyncPointKey,
    cancel: &CancellationToken,
    mut fetch_since: impl FnMut(Option<i64>) -> FetchFut,
    mut process_and_report_watermark: impl FnMut(Vec<T>) -> ProcessFut,
) -> Result<(), EngineError>
where
    FetchFut: Future<Output = Result<WatermarkPage<T>, EngineError>>,
    ProcessFut: Future<Output = Result<Option<i64>, EngineError>>,
{
    let mut last_sync_time = sync_points.read(key).await.last_sync_time();

    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let page = fetch_since(last_sync_time).await?;
        if page.entries.is_empty() {
            break;
        }
        let has_more = page.has_more;

        if let Some(max_updated_at) = process_and_report_watermark(page.entries).await? {
            sync_points.update(key, SyncPointData::new().with_last_sync_time(max_updated_at)).await;
            last_sync_time = Some(max_updated_at);
        }

        if !has_more {
            break;
        }
        tokio::task::yield_now().await;
    }
    Ok(())
}
