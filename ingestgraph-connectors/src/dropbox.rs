//! Dropbox: Pattern A for per-member file sync (`files/list_folder` and
//! `files/list_folder/continue`), Pattern B for team events (membership,
//! group, and record-group changes). Grounded on
//! `app/connectors/sources/dropbox/dropbox/connector.py`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ingestgraph_core::EngineError;
use ingestgraph_filter::FilterOptionsResponse;
use ingestgraph_runtime::{
    run_cursor_pagination_sync, run_event_log_sync, ConnectorDriver, CursorPage, EventCheckpoint,
    EventFetchOutcome, EventLogOutcome, EventPage, StreamingResponse, SyncContext, WebhookNotification,
};
use ingestgraph_types::{
    FileRecord, GroupType, IndexingStatus, Permission, PermissionEntityKind, PermissionType, RecordId, RecordKind,
};

/// A file/folder entry as returned by `list_folder`/`list_folder_continue`.
#[derive(Debug, Clone)]
pub struct DropboxEntry {
    pub path_lower: String,
    pub id: String,
    pub name: String,
    pub rev: String,
    pub size: u64,
    pub is_deleted: bool,
    pub server_modified_ms: i64,
    pub parent_path_lower: Option<String>,
    pub shared_members: Vec<DropboxShareEntry>,
}

#[derive(Debug, Clone)]
pub struct DropboxShareEntry {
    pub email: String,
    pub access_type: DropboxAccessType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropboxAccessType {
    Owner,
    Editor,
    Viewer,
}

impl DropboxAccessType {
    fn to_permission_type(self) -> PermissionType {
        match self {
            DropboxAccessType::Owner => PermissionType::Owner,
            DropboxAccessType::Editor => PermissionType::Write,
            DropboxAccessType::Viewer => PermissionType::Read,
        }
    }
}

/// A team-event delta: membership or group change (Pattern B scope).
#[derive(Debug, Clone)]
pub enum DropboxTeamEvent {
    MemberAddedToGroup { group_id: String, email: String, access_type: DropboxAccessType },
    MemberRemovedFromGroup { group_id: String, email: String },
    GroupDeleted { group_id: String },
    GroupRenamed { group_id: String, old_name: String, new_name: String },
}

pub struct DropboxFilePage {
    pub entries: Vec<DropboxEntry>,
    pub cursor: String,
    pub has_more: bool,
}

pub struct DropboxEventPage {
    pub events: Vec<DropboxTeamEvent>,
    pub cursor: String,
    pub has_more: bool,
}

/// Source-specific HTTP surface, injectable for tests. A real
/// implementation wraps `reqwest` calls to Dropbox's `/2/files/...` and
/// `/2/team_log/...` endpoints.
#[async_trait]
pub trait DropboxApi: Send + Sync {
    async fn list_folder(&self, team_member_id: &str) -> Result<DropboxFilePage, EngineError>;
    async fn list_folder_continue(&self, team_member_id: &str, cursor: &str) -> Result<DropboxFilePage, EngineError>;
    async fn team_events(&self, cursor: Option<&str>) -> Result<DropboxEventPage, EngineError>;
    /// Per Design Notes: Dropbox deletion webhooks carry a path, not a
    /// stable id, so the deletion path looks the entry up by path rather
    /// than guessing an id-based tombstone scheme the source doesn't
    /// expose. `None` means the path no longer exists on a `get_metadata`
    /// call (true tombstone).
    async fn get_metadata_by_path(&self, path: &str) -> Result<Option<DropboxEntry>, EngineError>;
}

pub struct DropboxConnector {
    api: Arc<dyn DropboxApi>,
    team_member_ids: Vec<String>,
}

impl DropboxConnector {
    pub fn new(api: Arc<dyn DropboxApi>, team_member_ids: Vec<String>) -> Self {
        DropboxConnector { api, team_member_ids }
    }

    fn to_record(&self, ctx: &SyncContext, entry: &DropboxEntry) -> (RecordKind, Vec<Permission>) {
        let permissions = entry
            .shared_members
            .iter()
            .map(|member| Permission {
                entity_kind: PermissionEntityKind::User,
                external_id: None,
                email: Some(member.email.clone()),
                permission_type: member.access_type.to_permission_type(),
            })
            .collect();

        let extension = entry.name.rsplit_once('.').map(|(_, ext)| ext.to_string());
        let record = RecordKind::File(FileRecord {
            header: ingestgraph_types::RecordHeader {
                id: RecordId::new_v4(),
                org_id: ctx.org_id,
                connector_id: ctx.connector_id,
                connector_name: "dropbox".into(),
                version: 0,
                created_at: ctx.clock.now_ms(),
                updated_at: ctx.clock.now_ms(),
                source_created_at: entry.server_modified_ms,
                source_updated_at: entry.server_modified_ms,
                external_record_id: entry.id.clone(),
                record_name: entry.name.clone(),
                record_group_type: GroupType::Drive,
                external_record_group_id: "team_drive".into(),
                parent_external_record_id: entry.parent_path_lower.clone(),
                parent_record_type: entry.parent_path_lower.as_ref().map(|_| ingestgraph_types::RecordType::File),
                mime_type: mime_from_extension(extension.as_deref()),
                weburl: None,
                preview_renderable: true,
                is_dependent_node: false,
                parent_node_id: None,
                inherit_permissions: true,
                indexing_status: IndexingStatus::NotIndexed,
                external_revision_id: Some(entry.rev.clone()),
            },
            size_in_bytes: entry.size,
            extension,
            is_file: true,
            sha256_hash: None,
            signed_url: None,
            path: Some(entry.path_lower.clone()),
        });
        (record, permissions)
    }

    /// Tombstone handling for a deleted delta entry. Per Design Notes
    /// (spec.md:293), Dropbox's own commented-out deletion path is
    /// under-specified; the delta entry's id is not a stable handle for a
    /// removed file, so the lookup goes by `path_lower` instead: confirm
    /// with the source that the path truly no longer resolves, then look
    /// up whatever internal record previously lived at that path and
    /// delete it.
    async fn tombstone_by_path(&self, ctx: &SyncContext, path: &str) -> Result<(), EngineError> {
        if self.api.get_metadata_by_path(path).await?.is_some() {
            tracing::warn!(connector_id = %ctx.connector_id, path, "skipping tombstone: path still resolves on source");
            return Ok(());
        }

        let tx = ctx.store.begin_transaction().await?;
        let existing = tx.get_record_by_path("dropbox", path).await?;
        tx.commit().await?;

        match existing {
            Some(record) => ctx.processor.on_record_deleted(record.header().id).await?,
            None => tracing::warn!(connector_id = %ctx.connector_id, path, "deletion tombstone for a path with no known record"),
        }
        Ok(())
    }

    async fn sync_member_files(&self, ctx: &SyncContext, team_member_id: &str) -> Result<(), EngineError> {
        let key = ingestgraph_syncpoint::SyncPointKey::drive_users(ctx.connector_id, ctx.org_id, team_member_id);
        let api = self.api.clone();
        let member_id = team_member_id.to_string();
        let batch_size = ctx.config.batch_size();

        run_cursor_pagination_sync(
            ctx.sync_points.as_ref(),
            &key,
            &ctx.cancel,
            {
                let api = api.clone();
                let member_id = member_id.clone();
                move |cursor: Option<String>| {
                    let api = api.clone();
                    let member_id = member_id.clone();
                    async move {
                        let page = match cursor {
                            None => api.list_folder(&member_id).await?,
                            Some(cursor) => api.list_folder_continue(&member_id, &cursor).await?,
                        };
                        Ok(CursorPage { entries: page.entries, cursor: Some(page.cursor), has_more: page.has_more })
                    }
                }
            },
            |entries: Vec<DropboxEntry>| {
                let mut records = Vec::with_capacity(entries.len());
                let mut deleted_paths = Vec::new();
                for chunk in entries.chunks(batch_size.max(1)) {
                    for entry in chunk {
                        if entry.is_deleted {
                            deleted_paths.push(entry.path_lower.clone());
                            continue;
                        }
                        records.push(self.to_record(ctx, entry));
                    }
                }
                async move {
                    if !records.is_empty() {
                        ctx.processor.on_new_records(records).await?;
                    }
                    for path in &deleted_paths {
                        self.tombstone_by_path(ctx, path).await?;
                    }
                    Ok(())
                }
            },
        )
        .await
    }

    async fn apply_team_events(&self, ctx: &SyncContext, events: Vec<DropboxTeamEvent>) -> Result<(), EngineError> {
        for event in events {
            match event {
                DropboxTeamEvent::MemberAddedToGroup { group_id, email, access_type } => {
                    ctx.processor
                        .on_user_group_member_added(ctx.connector_id, group_id, email, access_type.to_permission_type())
                        .await;
                }
                DropboxTeamEvent::MemberRemovedFromGroup { group_id, email } => {
                    ctx.processor.on_user_group_member_removed(ctx.connector_id, group_id, email).await;
                }
                DropboxTeamEvent::GroupDeleted { group_id } => {
                    ctx.processor.on_user_group_deleted(ctx.connector_id, group_id).await;
                }
                DropboxTeamEvent::GroupRenamed { group_id, old_name, new_name } => {
                    ctx.processor.update_record_group_name(ctx.connector_id, group_id, new_name, old_name).await?;
                }
            }
        }
        Ok(())
    }

    async fn sync_team_events(&self, ctx: &SyncContext) -> Result<(), EngineError> {
        let key = ingestgraph_syncpoint::SyncPointKey::named(ctx.connector_id, ctx.org_id, "team_events");
        let api = self.api.clone();

        let outcome = run_event_log_sync(
            ctx.sync_points.as_ref(),
            &key,
            &ctx.cancel,
            {
                let api = api.clone();
                move |checkpoint: EventCheckpoint| {
                    let api = api.clone();
                    async move {
                        let cursor = match &checkpoint {
                            EventCheckpoint::Cursor(c) => Some(c.as_str()),
                            EventCheckpoint::HistoryId(_) => None,
                        };
                        let page = api.team_events(cursor).await?;
                        Ok(EventFetchOutcome::Page(EventPage {
                            entries: page.events,
                            checkpoint: EventCheckpoint::Cursor(page.cursor),
                            has_more: page.has_more,
                        }))
                    }
                }
            },
            |events: Vec<DropboxTeamEvent>| {
                let this = self;
                async move { this.apply_team_events(ctx, events).await }
            },
        )
        .await?;

        if let EventLogOutcome::NeedsFullSyncBootstrap = outcome {
            let initial = self.api.team_events(None).await?;
            ingestgraph_runtime::bootstrap_event_checkpoint(
                ctx.sync_points.as_ref(),
                &key,
                EventCheckpoint::Cursor(initial.cursor),
            )
            .await;
            tracing::info!(connector_id = %ctx.connector_id, "bootstrapped dropbox team-events cursor, full resync deferred to next incremental run");
        }
        Ok(())
    }

    /// Syncs every team member's files under `max_concurrent_batches`-bounded
    /// concurrency (spec §4.1 "Scope fan-out"), then the team-events scope.
    /// Concurrency here is plain `await`-level parallelism via
    /// `for_each_concurrent` rather than `tokio::spawn`, since nothing in
    /// the per-member sync needs to outlive this call or run on another
    /// task — spawning would only add a `'static` bound for no benefit.
    async fn sync_all_scopes(&self, ctx: &SyncContext) -> Result<(), EngineError> {
        let max_concurrency = ctx.config.max_concurrent_batches().max(1);
        let first_error = std::sync::Mutex::new(None);

        futures_util::stream::iter(self.team_member_ids.iter())
            .for_each_concurrent(max_concurrency, |member_id| async {
                ctx.rate_limiter.acquire().await;
                if let Err(err) = self.sync_member_files(ctx, member_id).await {
                    let mut slot = first_error.lock().expect("mutex poisoned");
                    if slot.is_none() {
                        *slot = Some(err);
                    }
                }
            })
            .await;

        if let Some(err) = first_error.into_inner().expect("mutex poisoned") {
            return Err(err);
        }

        self.sync_team_events(ctx).await
    }
}

fn mime_from_extension(extension: Option<&str>) -> String {
    match extension {
        Some("pdf") => "application/pdf",
        Some("doc") | Some("docx") => "application/msword",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
    .to_string()
}

#[async_trait]
impl ConnectorDriver for DropboxConnector {
    async fn init(&self, _ctx: &SyncContext) -> Result<bool, EngineError> {
        Ok(true)
    }

    async fn run_sync(&self, ctx: &SyncContext) -> Result<(), EngineError> {
        for member_id in &self.team_member_ids {
            let key = ingestgraph_syncpoint::SyncPointKey::drive_users(ctx.connector_id, ctx.org_id, member_id);
            ctx.sync_points.clear(&key).await;
        }
        let events_key = ingestgraph_syncpoint::SyncPointKey::named(ctx.connector_id, ctx.org_id, "team_events");
        ctx.sync_points.clear(&events_key).await;
        self.sync_all_scopes(ctx).await
    }

    async fn run_incremental_sync(&self, ctx: &SyncContext) -> Result<(), EngineError> {
        self.sync_all_scopes(ctx).await
    }

    async fn handle_webhook_notification(
        &self,
        ctx: &SyncContext,
        _notification: WebhookNotification,
    ) -> Result<(), EngineError> {
        // Dropbox webhooks carry only a hint that *something* changed for a
        // team member; the handler always re-runs the real incremental
        // sync rather than trusting the notification payload.
        self.run_incremental_sync(ctx).await
    }

    async fn test_connection_and_access(&self, _ctx: &SyncContext) -> Result<bool, EngineError> {
        self.api.team_events(None).await.map(|_| true)
    }

    async fn stream_record(
        &self,
        _ctx: &SyncContext,
        record: &RecordKind,
        _convert_to: Option<&str>,
    ) -> Result<StreamingResponse, EngineError> {
        let path = match record {
            RecordKind::File(file) => file.path.clone(),
            _ => None,
        };
        let path = path.ok_or_else(|| EngineError::validation("dropbox record missing path"))?;
        let entry = self
            .api
            .get_metadata_by_path(&path)
            .await?
            .ok_or_else(|| EngineError::entity_missing(format!("{path} no longer exists")))?;
        let _ = entry;
        Err(EngineError::internal("direct byte streaming requires a real Dropbox download endpoint"))
    }

    async fn get_signed_url(&self, _ctx: &SyncContext, _record: &RecordKind) -> Result<Option<String>, EngineError> {
        // Dropbox has no native signed-URL issuance for team-owned content
        // in this integration; callers proxy via `stream_record` instead.
        Ok(None)
    }

    async fn reindex_records(&self, _ctx: &SyncContext, _records: Vec<RecordId>) -> Result<(), EngineError> {
        Ok(())
    }

    async fn cleanup(&self, _ctx: &SyncContext) -> Result<(), EngineError> {
        Ok(())
    }

    async fn get_filter_options(
        &self,
        _ctx: &SyncContext,
        filter_key: &str,
        page: usize,
        limit: usize,
        search: Option<&str>,
        _cursor: Option<&str>,
    ) -> Result<FilterOptionsResponse, EngineError> {
        let options = self
            .team_member_ids
            .iter()
            .map(|id| ingestgraph_filter::FilterOption { id: id.clone(), label: format!("Member {filter_key} {id}") })
            .collect();
        Ok(FilterOptionsResponse::paginate(options, page, limit, search))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestgraph_core::{EngineConfig, FixedClock};
    use ingestgraph_events::DomainEventBus;
    use ingestgraph_filter::SyncFilter;
    use ingestgraph_processor::EntityProcessor;
    use ingestgraph_ratelimit::RateLimiter;
    use ingestgraph_store::InMemoryStore;
    use ingestgraph_syncpoint::InMemorySyncPointStore;
    use ingestgraph_types::ConnectorId;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct FakeApi {
        pages: StdMutex<HashMap<String, Vec<DropboxFilePage>>>,
        team_events: StdMutex<Vec<DropboxEventPage>>,
    }

    #[async_trait]
    impl DropboxApi for FakeApi {
        async fn list_folder(&self, team_member_id: &str) -> Result<DropboxFilePage, EngineError> {
            let mut pages = self.pages.lock().unwrap();
            let queue = pages.get_mut(team_member_id).expect("no pages queued");
            Ok(queue.remove(0))
        }
        async fn list_folder_continue(&self, team_member_id: &str, _cursor: &str) -> Result<DropboxFilePage, EngineError> {
            let mut pages = self.pages.lock().unwrap();
            let queue = pages.get_mut(team_member_id).expect("no pages queued");
            Ok(queue.remove(0))
        }
        async fn team_events(&self, _cursor: Option<&str>) -> Result<DropboxEventPage, EngineError> {
            let mut events = self.team_events.lock().unwrap();
            if events.is_empty() {
                return Ok(DropboxEventPage { events: vec![], cursor: "c0".into(), has_more: false });
            }
            Ok(events.remove(0))
        }
        async fn get_metadata_by_path(&self, _path: &str) -> Result<Option<DropboxEntry>, EngineError> {
            Ok(None)
        }
    }

    fn entry(id: &str) -> DropboxEntry {
        DropboxEntry {
            path_lower: format!("/{id}.txt"),
            id: id.to_string(),
            name: format!("{id}.txt"),
            rev: "rev1".into(),
            size: 10,
            is_deleted: false,
            server_modified_ms: 1_000,
            parent_path_lower: None,
            shared_members: vec![DropboxShareEntry { email: "alice@example.com".into(), access_type: DropboxAccessType::Viewer }],
        }
    }

    fn test_ctx(store: Arc<InMemoryStore>, sync_points: Arc<InMemorySyncPointStore>) -> SyncContext {
        let events = DomainEventBus::new();
        let processor = Arc::new(EntityProcessor::new(store.clone(), events.clone()));
        SyncContext {
            connector_id: ConnectorId::nil(),
            org_id: ingestgraph_types::OrgId::nil(),
            store: store.clone(),
            processor,
            sync_points,
            rate_limiter: Arc::new(RateLimiter::new(1000, Duration::from_secs(1))),
            clock: Arc::new(FixedClock::new(1_000)),
            config: EngineConfig::defaults(),
            filter: SyncFilter::default(),
            events,
            cancel: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn full_sync_walks_every_member_and_writes_records() {
        let store = Arc::new(InMemoryStore::new());
        let sync_points = Arc::new(InMemorySyncPointStore::new());
        let ctx = test_ctx(store.clone(), sync_points.clone());

        let mut pages = HashMap::new();
        pages.insert(
            "member-1".to_string(),
            vec![DropboxFilePage { entries: vec![entry("a")], cursor: "cur1".into(), has_more: false }],
        );
        let api = Arc::new(FakeApi { pages: StdMutex::new(pages), team_events: StdMutex::new(vec![]) });
        let connector = DropboxConnector::new(api, vec!["member-1".to_string()]);

        connector.run_sync(&ctx).await.unwrap();

        let tx = store.begin_transaction().await.unwrap();
        let found = tx.get_record_by_external_id(ctx.connector_id, "a").await.unwrap();
        assert!(found.is_some());
        assert_eq!(sync_points.read(&ingestgraph_syncpoint::SyncPointKey::drive_users(ctx.connector_id, ctx.org_id, "member-1")).await.cursor(), Some("cur1"));
    }

    #[tokio::test]
    async fn deleted_entries_are_skipped_not_written() {
        let store = Arc::new(InMemoryStore::new());
        let sync_points = Arc::new(InMemorySyncPointStore::new());
        let ctx = test_ctx(store.clone(), sync_points.clone());

        let mut deleted = entry("b");
        deleted.is_deleted = true;
        let mut pages = HashMap::new();
        pages.insert("member-1".to_string(), vec![DropboxFilePage { entries: vec![deleted], cursor: "cur1".into(), has_more: false }]);
        let api = Arc::new(FakeApi { pages: StdMutex::new(pages), team_events: StdMutex::new(vec![]) });
        let connector = DropboxConnector::new(api, vec!["member-1".to_string()]);

        connector.run_incremental_sync(&ctx).await.unwrap();

        let tx = store.begin_transaction().await.unwrap();
        assert!(tx.get_record_by_external_id(ctx.connector_id, "b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleted_entry_tombstones_prior_record_at_same_path() {
        let store = Arc::new(InMemoryStore::new());
        let sync_points = Arc::new(InMemorySyncPointStore::new());
        let ctx = test_ctx(store.clone(), sync_points.clone());

        let mut pages = HashMap::new();
        pages.insert(
            "member-1".to_string(),
            vec![
                DropboxFilePage { entries: vec![entry("b")], cursor: "cur1".into(), has_more: true },
                DropboxFilePage { entries: vec![], cursor: "cur1".into(), has_more: false },
            ],
        );
        let api = Arc::new(FakeApi { pages: StdMutex::new(pages), team_events: StdMutex::new(vec![]) });
        let connector = DropboxConnector::new(api, vec!["member-1".to_string()]);
        connector.run_sync(&ctx).await.unwrap();

        let tx = store.begin_transaction().await.unwrap();
        assert!(tx.get_record_by_external_id(ctx.connector_id, "b").await.unwrap().is_some());
        drop(tx);

        let mut deleted = entry("b");
        deleted.is_deleted = true;
        let mut pages = HashMap::new();
        pages.insert("member-1".to_string(), vec![DropboxFilePage { entries: vec![deleted], cursor: "cur2".into(), has_more: false }]);
        let api = Arc::new(FakeApi { pages: StdMutex::new(pages), team_events: StdMutex::new(vec![]) });
        let connector = DropboxConnector::new(api, vec!["member-1".to_string()]);
        connector.run_incremental_sync(&ctx).await.unwrap();

        let tx = store.begin_transaction().await.unwrap();
        assert!(tx.get_record_by_external_id(ctx.connector_id, "b").await.unwrap().is_none(), "tombstoned record must be removed from the store");
    }
}
