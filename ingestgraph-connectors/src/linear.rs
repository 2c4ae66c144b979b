//! Linear: Pattern C, four independent high-watermarks per team (issues,
//! attachments, documents, projects) — Linear doesn't bump `issue.updatedAt`
//! when an attachment or document is added, so each must be its own
//! `sys_updated_on`-style watermark rather than riding on the issue one.
//! Grounded on `app/connectors/sources/linear/connector.py`.

use std::sync::Arc;

use async_trait::async_trait;
use ingestgraph_core::EngineError;
use ingestgraph_filter::FilterOptionsResponse;
use ingestgraph_runtime::{run_watermark_sync, ConnectorDriver, StreamingResponse, SyncContext, WatermarkPage, WebhookNotification};
use ingestgraph_types::{
    CommentRecord, GroupType, IndexingStatus, LinkRecord, Permission, PermissionEntityKind, PermissionType,
    PublicVisibility, RecordGroup, RecordId, RecordKind, RecordType, TicketRecord, WebpageRecord,
};

#[derive(Debug, Clone)]
pub struct LinearTeam {
    pub id: String,
    pub key: String,
    pub name: String,
    pub is_private: bool,
}

#[derive(Debug, Clone)]
pub struct LinearComment {
    pub id: String,
    pub author_source_id: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone)]
pub struct LinearIssue {
    pub id: String,
    pub identifier: String,
    pub title: String,
    pub state_name: String,
    pub priority_label: Option<String>,
    pub assignee_email: Option<String>,
    pub assignee_name: Option<String>,
    pub creator_email: Option<String>,
    pub creator_name: Option<String>,
    pub weburl: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    pub comments: Vec<LinearComment>,
}

#[derive(Debug, Clone)]
pub struct LinearAttachment {
    pub id: String,
    pub issue_id: String,
    pub title: String,
    pub url: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone)]
pub struct LinearDocument {
    pub id: String,
    pub title: String,
    pub weburl: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone)]
pub struct LinearProject {
    pub id: String,
    pub name: String,
    pub weburl: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[async_trait]
pub trait LinearApi: Send + Sync {
    async fn teams(&self) -> Result<Vec<LinearTeam>, EngineError>;
    async fn issues_since(&self, team_id: &str, since: Option<i64>) -> Result<Vec<LinearIssue>, EngineError>;
    async fn attachments_since(&self, team_id: &str, since: Option<i64>) -> Result<Vec<LinearAttachment>, EngineError>;
    async fn documents_since(&self, team_id: &str, since: Option<i64>) -> Result<Vec<LinearDocument>, EngineError>;
    async fn projects_since(&self, team_id: &str, since: Option<i64>) -> Result<Vec<LinearProject>, EngineError>;
}

pub struct LinearConnector {
    api: Arc<dyn LinearApi>,
}

impl LinearConnector {
    pub fn new(api: Arc<dyn LinearApi>) -> Self {
        LinearConnector { api }
    }

    fn team_permissions(team: &LinearTeam) -> Vec<Permission> {
        if team.is_private {
            vec![Permission {
                entity_kind: PermissionEntityKind::Group,
                external_id: Some(team.id.clone()),
                email: None,
                permission_type: PermissionType::Read,
            }]
        } else {
            vec![Permission { entity_kind: PermissionEntityKind::Org, external_id: None, email: None, permission_type: PermissionType::Read }]
        }
    }

    fn header(ctx: &SyncContext, team: &LinearTeam, external_id: &str, name: &str, created_at: i64, updated_at: i64) -> ingestgraph_types::RecordHeader {
        ingestgraph_types::RecordHeader {
            id: RecordId::new_v4(),
            org_id: ctx.org_id,
            connector_id: ctx.connector_id,
            connector_name: "linear".into(),
            version: 0,
            created_at: ctx.clock.now_ms(),
            updated_at: ctx.clock.now_ms(),
            source_created_at: created_at,
            source_updated_at: updated_at,
            external_record_id: external_id.to_string(),
            record_name: name.to_string(),
            record_group_type: GroupType::Project,
            external_record_group_id: team.id.clone(),
            parent_external_record_id: None,
            parent_record_type: None,
            mime_type: "application/json".into(),
            weburl: None,
            preview_renderable: true,
            is_dependent_node: false,
            parent_node_id: None,
            inherit_permissions: true,
            indexing_status: IndexingStatus::NotIndexed,
            external_revision_id: None,
        }
    }

    fn issue_to_records(ctx: &SyncContext, team: &LinearTeam, issue: &LinearIssue) -> Vec<(RecordKind, Vec<Permission>)> {
        let mut header = Self::header(ctx, team, &issue.id, &issue.title, issue.created_at_ms, issue.updated_at_ms);
        header.weburl = issue.weburl.clone();
        let ticket = RecordKind::Ticket(TicketRecord {
            header,
            status: issue.state_name.clone(),
            priority: issue.priority_label.clone(),
            ticket_type: Some("issue".into()),
            assignee: issue.assignee_name.clone(),
            assignee_email: issue.assignee_email.clone(),
            creator_email: issue.creator_email.clone(),
            creator_name: issue.creator_name.clone(),
        });
        let mut records = vec![(ticket, vec![])];
        for comment in &issue.comments {
            let mut comment_header = Self::header(ctx, team, &comment.id, "comment", comment.created_at_ms, comment.updated_at_ms);
            comment_header.parent_external_record_id = Some(issue.id.clone());
            comment_header.parent_record_type = Some(RecordType::Ticket);
            comment_header.mime_type = "text/plain".into();
            records.push((RecordKind::Comment(CommentRecord { header: comment_header, author_source_id: comment.author_source_id.clone() }), vec![]));
        }
        records
    }

    fn attachment_to_record(ctx: &SyncContext, team: &LinearTeam, attachment: &LinearAttachment) -> (RecordKind, Vec<Permission>) {
        let mut header = Self::header(ctx, team, &attachment.id, &attachment.title, attachment.created_at_ms, attachment.updated_at_ms);
        header.parent_external_record_id = Some(attachment.issue_id.clone());
        header.parent_record_type = Some(RecordType::Ticket);
        header.mime_type = "text/uri-list".into();
        let record = RecordKind::Link(LinkRecord {
            header,
            url: attachment.url.clone(),
            title: Some(attachment.title.clone()),
            is_public: PublicVisibility::Unknown,
            linked_record_id: None,
        });
        (record, vec![])
    }

    fn document_to_record(ctx: &SyncContext, team: &LinearTeam, document: &LinearDocument) -> (RecordKind, Vec<Permission>) {
        let mut header = Self::header(ctx, team, &document.id, &document.title, document.created_at_ms, document.updated_at_ms);
        header.weburl = document.weburl.clone();
        header.mime_type = "text/html".into();
        (RecordKind::Webpage(WebpageRecord { header }), vec![])
    }

    fn project_to_record(ctx: &SyncContext, team: &LinearTeam, project: &LinearProject) -> (RecordKind, Vec<Permission>) {
        let mut header = Self::header(ctx, team, &project.id, &project.name, project.created_at_ms, project.updated_at_ms);
        header.weburl = project.weburl.clone();
        let record = RecordKind::Ticket(TicketRecord {
            header,
            status: "project".into(),
            priority: None,
            ticket_type: Some("project".into()),
            assignee: None,
            assignee_email: None,
            creator_email: None,
            creator_name: None,
        });
        (record, vec![])
    }

    async fn sync_team_issues(&self, ctx: &SyncContext, team: &LinearTeam) -> Result<(), EngineError> {
        let key = ingestgraph_syncpoint::SyncPointKey::subresource(ctx.connector_id, ctx.org_id, "issues", &team.key);
        let team = team.clone();
        run_watermark_sync(
            ctx.sync_points.as_ref(),
            &key,
            &ctx.cancel,
            |since| {
                let api = self.api.clone();
                let team_id = team.id.clone();
                async move { Ok(WatermarkPage { entries: api.issues_since(&team_id, since).await?, has_more: false }) }
            },
            |issues: Vec<LinearIssue>| {
                let max = issues.iter().map(|i| i.updated_at_ms).max();
                let records: Vec<_> = issues.iter().flat_map(|i| Self::issue_to_records(ctx, &team, i)).collect();
                async move {
                    if !records.is_empty() {
                        ctx.processor.on_new_records(records).await?;
                    }
                    Ok(max)
                }
            },
        )
        .await
    }

    async fn sync_team_attachments(&self, ctx: &SyncContext, team: &LinearTeam) -> Result<(), EngineError> {
        let key = ingestgraph_syncpoint::SyncPointKey::subresource(ctx.connector_id, ctx.org_id, "attachments", &team.key);
        let team = team.clone();
        run_watermark_sync(
            ctx.sync_points.as_ref(),
            &key,
            &ctx.cancel,
            |since| {
                let api = self.api.clone();
                let team_id = team.id.clone();
                async move { Ok(WatermarkPage { entries: api.attachments_since(&team_id, since).await?, has_more: false }) }
            },
            |attachments: Vec<LinearAttachment>| {
                let max = attachments.iter().map(|a| a.updated_at_ms).max();
                let records: Vec<_> = attachments.iter().map(|a| Self::attachment_to_record(ctx, &team, a)).collect();
                async move {
                    if !records.is_empty() {
                        ctx.processor.on_new_records(records).await?;
                    }
                    Ok(max)
                }
            },
        )
        .await
    }

    async fn sync_team_documents(&self, ctx: &SyncContext, team: &LinearTeam) -> Result<(), EngineError> {
        let key = ingestgraph_syncpoint::SyncPointKey::subresource(ctx.connector_id, ctx.org_id, "documents", &team.key);
        let team = team.clone();
        run_watermark_sync(
            ctx.sync_points.as_ref(),
            &key,
            &ctx.cancel,
            |since| {
                let api = self.api.clone();
                let team_id = team.id.clone();
                async move { Ok(WatermarkPage { entries: api.documents_since(&team_id, since).await?, has_more: false }) }
            },
            |documents: Vec<LinearDocument>| {
                let max = documents.iter().map(|d| d.updated_at_ms).max();
                let records: Vec<_> = documents.iter().map(|d| Self::document_to_record(ctx, &team, d)).collect();
                async move {
                    if !records.is_empty() {
                        ctx.processor.on_new_records(records).await?;
                    }
                    Ok(max)
                }
            },
        )
        .await
    }

    async fn sync_team_projects(&self, ctx: &SyncContext, team: &LinearTeam) -> Result<(), EngineError> {
        let key = ingestgraph_syncpoint::SyncPointKey::subresource(ctx.connector_id, ctx.org_id, "projects", &team.key);
        let team = team.clone();
        run_watermark_sync(
            ctx.sync_points.as_ref(),
            &key,
            &ctx.cancel,
            |since| {
                let api = self.api.clone();
                let team_id = team.id.clone();
                async move { Ok(WatermarkPage { entries: api.projects_since(&team_id, since).await?, has_more: false }) }
            },
            |projects: Vec<LinearProject>| {
                let max = projects.iter().map(|p| p.updated_at_ms).max();
                let records: Vec<_> = projects.iter().map(|p| Self::project_to_record(ctx, &team, p)).collect();
                async move {
                    if !records.is_empty() {
                        ctx.processor.on_new_records(records).await?;
                    }
                    Ok(max)
                }
            },
        )
        .await
    }

    async fn sync_team(&self, ctx: &SyncContext, team: &LinearTeam) -> Result<(), EngineError> {
        let group = RecordGroup {
            id: RecordId::new_v4(),
            org_id: ctx.org_id,
            connector_id: ctx.connector_id,
            connector_name: "linear".into(),
            version: 0,
            created_at: ctx.clock.now_ms(),
            updated_at: ctx.clock.now_ms(),
            source_created_at: ctx.clock.now_ms(),
            source_updated_at: ctx.clock.now_ms(),
            external_group_id: team.id.clone(),
            name: team.name.clone(),
            short_name: Some(team.key.clone()),
            group_type: GroupType::Project,
            parent_external_group_id: None,
            web_url: None,
            inherit_permissions: true,
        };
        ctx.processor.on_new_record_groups(vec![(group, Self::team_permissions(team))]).await?;

        self.sync_team_issues(ctx, team).await?;
        self.sync_team_attachments(ctx, team).await?;
        self.sync_team_documents(ctx, team).await?;
        self.sync_team_projects(ctx, team).await
    }

    async fn sync_all_teams(&self, ctx: &SyncContext) -> Result<(), EngineError> {
        let teams = self.api.teams().await?;
        for team in &teams {
            if ctx.cancel.is_cancelled() {
                return Ok(());
            }
            ctx.rate_limiter.acquire().await;
            self.sync_team(ctx, team).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ConnectorDriver for LinearConnector {
    async fn init(&self, _ctx: &SyncContext) -> Result<bool, EngineError> {
        Ok(true)
    }

    async fn run_sync(&self, ctx: &SyncContext) -> Result<(), EngineError> {
        let teams = self.api.teams().await?;
        for team in &teams {
            for subresource in ["issues", "attachments", "documents", "projects"] {
                let key = ingestgraph_syncpoint::SyncPointKey::subresource(ctx.connector_id, ctx.org_id, subresource, &team.key);
                ctx.sync_points.clear(&key).await;
            }
        }
        self.sync_all_teams(ctx).await
    }

    async fn run_incremental_sync(&self, ctx: &SyncContext) -> Result<(), EngineError> {
        self.sync_all_teams(ctx).await
    }

    async fn handle_webhook_notification(
        &self,
        ctx: &SyncContext,
        _notification: WebhookNotification,
    ) -> Result<(), EngineError> {
        self.run_incremental_sync(ctx).await
    }

    async fn test_connection_and_access(&self, _ctx: &SyncContext) -> Result<bool, EngineError> {
        self.api.teams().await.map(|_| true)
    }

    async fn stream_record(
        &self,
        _ctx: &SyncContext,
        _record: &RecordKind,
        _convert_to: Option<&str>,
    ) -> Result<StreamingResponse, EngineError> {
        Err(EngineError::internal("linear records are rendered from stored metadata, not streamed from source"))
    }

    async fn get_signed_url(&self, _ctx: &SyncContext, record: &RecordKind) -> Result<Option<String>, EngineError> {
        Ok(record.header().weburl.clone())
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
        let teams = self.api.teams().await?;
        let options = teams
            .into_iter()
            .map(|team| ingestgraph_filter::FilterOption { id: team.id, label: format!("{} ({}) [{filter_key}]", team.name, team.key) })
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
        teams: Vec<LinearTeam>,
        issues: StdMutex<Vec<Vec<LinearIssue>>>,
    }

    #[async_trait]
    impl LinearApi for FakeApi {
        async fn teams(&self) -> Result<Vec<LinearTeam>, EngineError> {
            Ok(self.teams.clone())
        }
        async fn issues_since(&self, _team_id: &str, since: Option<i64>) -> Result<Vec<LinearIssue>, EngineError> {
            let mut queue = self.issues.lock().unwrap();
            if queue.is_empty() {
                return Ok(vec![]);
            }
            if since.is_some() && queue.len() == 1 {
                return Ok(vec![]);
            }
            Ok(queue.remove(0))
        }
        async fn attachments_since(&self, _team_id: &str, _since: Option<i64>) -> Result<Vec<LinearAttachment>, EngineError> {
            Ok(vec![])
        }
        async fn documents_since(&self, _team_id: &str, _since: Option<i64>) -> Result<Vec<LinearDocument>, EngineError> {
            Ok(vec![])
        }
        async fn projects_since(&self, _team_id: &str, _since: Option<i64>) -> Result<Vec<LinearProject>, EngineError> {
            Ok(vec![])
        }
    }

    fn issue(id: &str, updated_at_ms: i64) -> LinearIssue {
        LinearIssue {
            id: id.to_string(),
            identifier: format!("ENG-{id}"),
            title: format!("issue {id}"),
            state_name: "Todo".into(),
            priority_label: None,
            assignee_email: None,
            assignee_name: None,
            creator_email: None,
            creator_name: None,
            weburl: None,
            created_at_ms: updated_at_ms,
            updated_at_ms,
            comments: vec![],
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
    async fn full_sync_writes_team_group_and_issues() {
        let store = Arc::new(InMemoryStore::new());
        let sync_points = Arc::new(InMemorySyncPointStore::new());
        let ctx = test_ctx(store.clone(), sync_points.clone());

        let team = LinearTeam { id: "team-1".into(), key: "ENG".into(), name: "Engineering".into(), is_private: false };
        let api = Arc::new(FakeApi { teams: vec![team.clone()], issues: StdMutex::new(vec![vec![issue("i1", 500)]]) });
        let connector = LinearConnector::new(api);

        connector.run_sync(&ctx).await.unwrap();

        let tx = store.begin_transaction().await.unwrap();
        assert!(tx.get_record_group_by_external_id(ctx.connector_id, "team-1").await.unwrap().is_some());
        assert!(tx.get_record_by_external_id(ctx.connector_id, "i1").await.unwrap().is_some());

        let key = ingestgraph_syncpoint::SyncPointKey::subresource(ctx.connector_id, ctx.org_id, "issues", "ENG");
        assert_eq!(sync_points.read(&key).await.last_sync_time(), Some(500));
    }

    #[tokio::test]
    async fn incremental_sync_does_not_refetch_once_watermark_caught_up() {
        let store = Arc::new(InMemoryStore::new());
        let sync_points = Arc::new(InMemorySyncPointStore::new());
        let ctx = test_ctx(store.clone(), sync_points.clone());

        let team = LinearTeam { id: "team-1".into(), key: "ENG".into(), name: "Engineering".into(), is_private: true };
        let api = Arc::new(FakeApi { teams: vec![team.clone()], issues: StdMutex::new(vec![vec![issue("i2", 700)]]) });
        let connector = LinearConnector::new(api);

        connector.run_incremental_sync(&ctx).await.unwrap();

        let key = ingestgraph_syncpoint::SyncPointKey::subresource(ctx.connector_id, ctx.org_id, "issues", "ENG");
        assert_eq!(sync_points.read(&key).await.last_sync_time(), Some(700));
    }
}
