//! ServiceNow: Pattern C, `sys_updated_on` high-watermarks — one each for
//! users, knowledge bases, categories, and articles, since ServiceNow's
//! `sysparm_query` supports `sys_updated_on>X^ORDERBYsys_updated_on` but no
//! opaque cursor. Grounded on
//! `app/connectors/sources/servicenow/servicenow/connector.py`.

use std::sync::Arc;

use async_trait::async_trait;
use ingestgraph_core::EngineError;
use ingestgraph_filter::FilterOptionsResponse;
use ingestgraph_runtime::{run_watermark_sync, ConnectorDriver, StreamingResponse, SyncContext, WatermarkPage, WebhookNotification};
use ingestgraph_types::{
    AppUser, FileRecord, GroupType, IndexingStatus, Permission, PermissionEntityKind, PermissionType, RecordGroup,
    RecordId, RecordKind, RecordType, WebpageRecord,
};

#[derive(Debug, Clone)]
pub struct ServiceNowUser {
    pub sys_id: String,
    pub email: String,
    pub full_name: String,
    pub active: bool,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone)]
pub struct ServiceNowKnowledgeBase {
    pub sys_id: String,
    pub title: String,
    pub owner_sys_id: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone)]
pub struct ServiceNowCategory {
    pub sys_id: String,
    pub label: String,
    pub kb_sys_id: String,
    pub parent_sys_id: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone)]
pub struct ServiceNowAttachment {
    pub sys_id: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone)]
pub struct ServiceNowArticle {
    pub sys_id: String,
    pub short_description: String,
    pub kb_sys_id: String,
    pub category_sys_id: Option<String>,
    pub author_sys_id: Option<String>,
    pub workflow_state: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    pub attachments: Vec<ServiceNowAttachment>,
}

#[async_trait]
pub trait ServiceNowApi: Send + Sync {
    async fn users_since(&self, since: Option<i64>) -> Result<Vec<ServiceNowUser>, EngineError>;
    async fn knowledge_bases_since(&self, since: Option<i64>) -> Result<Vec<ServiceNowKnowledgeBase>, EngineError>;
    async fn categories_since(&self, since: Option<i64>) -> Result<Vec<ServiceNowCategory>, EngineError>;
    async fn articles_since(&self, since: Option<i64>) -> Result<Vec<ServiceNowArticle>, EngineError>;
}

pub struct ServiceNowConnector {
    api: Arc<dyn ServiceNowApi>,
}

impl ServiceNowConnector {
    pub fn new(api: Arc<dyn ServiceNowApi>) -> Self {
        ServiceNowConnector { api }
    }

    fn named_key(ctx: &SyncContext, name: &str) -> ingestgraph_syncpoint::SyncPointKey {
        ingestgraph_syncpoint::SyncPointKey::named(ctx.connector_id, ctx.org_id, name)
    }

    async fn sync_users(&self, ctx: &SyncContext) -> Result<(), EngineError> {
        let key = Self::named_key(ctx, "users");
        run_watermark_sync(
            ctx.sync_points.as_ref(),
            &key,
            &ctx.cancel,
            |since| {
                let api = self.api.clone();
                async move { Ok(WatermarkPage { entries: api.users_since(since).await?, has_more: false }) }
            },
            |users: Vec<ServiceNowUser>| {
                let max = users.iter().map(|u| u.updated_at_ms).max();
                let app_users: Vec<_> = users
                    .iter()
                    .filter(|u| u.active)
                    .map(|u| AppUser {
                        id: RecordId::new_v4(),
                        org_id: ctx.org_id,
                        connector_id: ctx.connector_id,
                        source_user_id: u.sys_id.clone(),
                        email: u.email.clone(),
                        full_name: Some(u.full_name.clone()),
                        is_active: u.active,
                        created_at: u.created_at_ms,
                        updated_at: u.updated_at_ms,
                    })
                    .collect();
                async move {
                    if !app_users.is_empty() {
                        ctx.processor.on_new_app_users(app_users).await?;
                    }
                    Ok(max)
                }
            },
        )
        .await
    }

    async fn sync_knowledge_bases(&self, ctx: &SyncContext) -> Result<(), EngineError> {
        let key = Self::named_key(ctx, "knowledge_bases");
        run_watermark_sync(
            ctx.sync_points.as_ref(),
            &key,
            &ctx.cancel,
            |since| {
                let api = self.api.clone();
                async move { Ok(WatermarkPage { entries: api.knowledge_bases_since(since).await?, has_more: false }) }
            },
            |kbs: Vec<ServiceNowKnowledgeBase>| {
                let max = kbs.iter().map(|kb| kb.updated_at_ms).max();
                let groups: Vec<_> = kbs
                    .iter()
                    .map(|kb| {
                        let group = RecordGroup {
                            id: RecordId::new_v4(),
                            org_id: ctx.org_id,
                            connector_id: ctx.connector_id,
                            connector_name: "servicenow".into(),
                            version: 0,
                            created_at: ctx.clock.now_ms(),
                            updated_at: ctx.clock.now_ms(),
                            source_created_at: kb.created_at_ms,
                            source_updated_at: kb.updated_at_ms,
                            external_group_id: kb.sys_id.clone(),
                            name: kb.title.clone(),
                            short_name: None,
                            group_type: GroupType::ServiceNowKb,
                            parent_external_group_id: None,
                            web_url: None,
                            inherit_permissions: true,
                        };
                        let permissions = kb
                            .owner_sys_id
                            .as_ref()
                            .map(|owner| {
                                vec![Permission {
                                    entity_kind: PermissionEntityKind::User,
                                    external_id: Some(owner.clone()),
                                    email: None,
                                    permission_type: PermissionType::Owner,
                                }]
                            })
                            .unwrap_or_default();
                        (group, permissions)
                    })
                    .collect();
                async move {
                    if !groups.is_empty() {
                        ctx.processor.on_new_record_groups(groups).await?;
                    }
                    Ok(max)
                }
            },
        )
        .await
    }

    async fn sync_categories(&self, ctx: &SyncContext) -> Result<(), EngineError> {
        let key = Self::named_key(ctx, "categories");
        run_watermark_sync(
            ctx.sync_points.as_ref(),
            &key,
            &ctx.cancel,
            |since| {
                let api = self.api.clone();
                async move { Ok(WatermarkPage { entries: api.categories_since(since).await?, has_more: false }) }
            },
            |categories: Vec<ServiceNowCategory>| {
                let max = categories.iter().map(|c| c.updated_at_ms).max();
                let groups: Vec<_> = categories
                    .iter()
                    .map(|category| {
                        let group = RecordGroup {
                            id: RecordId::new_v4(),
                            org_id: ctx.org_id,
                            connector_id: ctx.connector_id,
                            connector_name: "servicenow".into(),
                            version: 0,
                            created_at: ctx.clock.now_ms(),
                            updated_at: ctx.clock.now_ms(),
                            source_created_at: category.created_at_ms,
                            source_updated_at: category.updated_at_ms,
                            external_group_id: category.sys_id.clone(),
                            name: category.label.clone(),
                            short_name: None,
                            group_type: GroupType::ServiceNowCategory,
                            parent_external_group_id: category.parent_sys_id.clone().or_else(|| Some(category.kb_sys_id.clone())),
                            web_url: None,
                            inherit_permissions: true,
                        };
                        (group, vec![])
                    })
                    .collect();
                async move {
                    if !groups.is_empty() {
                        ctx.processor.on_new_record_groups(groups).await?;
                    }
                    Ok(max)
                }
            },
        )
        .await
    }

    fn article_permissions(article: &ServiceNowArticle) -> Vec<Permission> {
        article
            .author_sys_id
            .as_ref()
            .map(|author| {
                vec![Permission {
                    entity_kind: PermissionEntityKind::User,
                    external_id: Some(author.clone()),
                    email: None,
                    permission_type: PermissionType::Owner,
                }]
            })
            .unwrap_or_default()
    }

    fn article_to_record(ctx: &SyncContext, article: &ServiceNowArticle) -> (RecordKind, Vec<Permission>) {
        let indexing_status = if article.workflow_state == "published" { IndexingStatus::NotIndexed } else { IndexingStatus::AutoIndexOff };
        let record = RecordKind::Webpage(WebpageRecord {
            header: ingestgraph_types::RecordHeader {
                id: RecordId::new_v4(),
                org_id: ctx.org_id,
                connector_id: ctx.connector_id,
                connector_name: "servicenow".into(),
                version: 0,
                created_at: ctx.clock.now_ms(),
                updated_at: ctx.clock.now_ms(),
                source_created_at: article.created_at_ms,
                source_updated_at: article.updated_at_ms,
                external_record_id: article.sys_id.clone(),
                record_name: article.short_description.clone(),
                record_group_type: article.category_sys_id.as_ref().map(|_| GroupType::ServiceNowCategory).unwrap_or(GroupType::ServiceNowKb),
                external_record_group_id: article.category_sys_id.clone().unwrap_or_else(|| article.kb_sys_id.clone()),
                parent_external_record_id: None,
                parent_record_type: None,
                mime_type: "text/html".into(),
                weburl: None,
                preview_renderable: true,
                is_dependent_node: false,
                parent_node_id: None,
                inherit_permissions: true,
                indexing_status,
                external_revision_id: None,
            },
        });
        (record, Self::article_permissions(article))
    }

    fn attachment_to_record(ctx: &SyncContext, article: &ServiceNowArticle, attachment: &ServiceNowAttachment) -> (RecordKind, Vec<Permission>) {
        let extension = attachment.file_name.rsplit_once('.').map(|(_, ext)| ext.to_string());
        let record = RecordKind::File(FileRecord {
            header: ingestgraph_types::RecordHeader {
                id: RecordId::new_v4(),
                org_id: ctx.org_id,
                connector_id: ctx.connector_id,
                connector_name: "servicenow".into(),
                version: 0,
                created_at: ctx.clock.now_ms(),
                updated_at: ctx.clock.now_ms(),
                source_created_at: attachment.created_at_ms,
                source_updated_at: attachment.updated_at_ms,
                external_record_id: attachment.sys_id.clone(),
                record_name: attachment.file_name.clone(),
                record_group_type: article.category_sys_id.as_ref().map(|_| GroupType::ServiceNowCategory).unwrap_or(GroupType::ServiceNowKb),
                external_record_group_id: article.category_sys_id.clone().unwrap_or_else(|| article.kb_sys_id.clone()),
                parent_external_record_id: Some(article.sys_id.clone()),
                parent_record_type: Some(RecordType::Webpage),
                mime_type: attachment.content_type.clone(),
                weburl: None,
                preview_renderable: true,
                is_dependent_node: true,
                parent_node_id: None,
                inherit_permissions: true,
                indexing_status: IndexingStatus::NotIndexed,
                external_revision_id: None,
            },
            size_in_bytes: attachment.size_bytes,
            extension,
            is_file: true,
            sha256_hash: None,
            signed_url: None,
            path: None,
        });
        (record, Self::article_permissions(article))
    }

    async fn sync_articles(&self, ctx: &SyncContext) -> Result<(), EngineError> {
        let key = Self::named_key(ctx, "articles");
        run_watermark_sync(
            ctx.sync_points.as_ref(),
            &key,
            &ctx.cancel,
            |since| {
                let api = self.api.clone();
                async move { Ok(WatermarkPage { entries: api.articles_since(since).await?, has_more: false }) }
            },
            |articles: Vec<ServiceNowArticle>| {
                let max = articles.iter().map(|a| a.updated_at_ms).max();
                let mut records = Vec::new();
                for article in &articles {
                    records.push(Self::article_to_record(ctx, article));
                    for attachment in &article.attachments {
                        records.push(Self::attachment_to_record(ctx, article, attachment));
                    }
                }
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

    async fn sync_everything(&self, ctx: &SyncContext) -> Result<(), EngineError> {
        self.sync_users(ctx).await?;
        self.sync_knowledge_bases(ctx).await?;
        self.sync_categories(ctx).await?;
        self.sync_articles(ctx).await
    }
}

#[async_trait]
impl ConnectorDriver for ServiceNowConnector {
    async fn init(&self, _ctx: &SyncContext) -> Result<bool, EngineError> {
        Ok(true)
    }

    async fn run_sync(&self, ctx: &SyncContext) -> Result<(), EngineError> {
        for name in ["users", "knowledge_bases", "categories", "articles"] {
            ctx.sync_points.clear(&Self::named_key(ctx, name)).await;
        }
        self.sync_everything(ctx).await
    }

    async fn run_incremental_sync(&self, ctx: &SyncContext) -> Result<(), EngineError> {
        self.sync_everything(ctx).await
    }

    async fn handle_webhook_notification(
        &self,
        ctx: &SyncContext,
        _notification: WebhookNotification,
    ) -> Result<(), EngineError> {
        self.run_incremental_sync(ctx).await
    }

    async fn test_connection_and_access(&self, _ctx: &SyncContext) -> Result<bool, EngineError> {
        self.api.knowledge_bases_since(None).await.map(|_| true)
    }

    async fn stream_record(
        &self,
        _ctx: &SyncContext,
        _record: &RecordKind,
        _convert_to: Option<&str>,
    ) -> Result<StreamingResponse, EngineError> {
        Err(EngineError::internal("servicenow article/attachment bytes are fetched by the record streamer, not the connector driver"))
    }

    async fn get_signed_url(&self, _ctx: &SyncContext, _record: &RecordKind) -> Result<Option<String>, EngineError> {
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
        let kbs = self.api.knowledge_bases_since(None).await?;
        let options = kbs
            .into_iter()
            .map(|kb| ingestgraph_filter::FilterOption { id: kb.sys_id, label: format!("{} [{filter_key}]", kb.title) })
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
    use ingestgraph_types::{ConnectorId, OrgId};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct FakeApi {
        articles: StdMutex<Vec<Vec<ServiceNowArticle>>>,
    }

    #[async_trait]
    impl ServiceNowApi for FakeApi {
        async fn users_since(&self, _since: Option<i64>) -> Result<Vec<ServiceNowUser>, EngineError> {
            Ok(vec![])
        }
        async fn knowledge_bases_since(&self, _since: Option<i64>) -> Result<Vec<ServiceNowKnowledgeBase>, EngineError> {
            Ok(vec![])
        }
        async fn categories_since(&self, _since: Option<i64>) -> Result<Vec<ServiceNowCategory>, EngineError> {
            Ok(vec![])
        }
        async fn articles_since(&self, _since: Option<i64>) -> Result<Vec<ServiceNowArticle>, EngineError> {
            let mut queue = self.articles.lock().unwrap();
            if queue.is_empty() {
                return Ok(vec![]);
            }
            Ok(queue.remove(0))
        }
    }

    fn article(id: &str, updated_at_ms: i64, attachments: Vec<ServiceNowAttachment>) -> ServiceNowArticle {
        ServiceNowArticle {
            sys_id: id.to_string(),
            short_description: format!("article {id}"),
            kb_sys_id: "kb-1".into(),
            category_sys_id: None,
            author_sys_id: Some("user-1".into()),
            workflow_state: "published".into(),
            created_at_ms: updated_at_ms,
            updated_at_ms,
            attachments,
        }
    }

    fn test_ctx(store: Arc<InMemoryStore>, sync_points: Arc<InMemorySyncPointStore>) -> SyncContext {
        let events = DomainEventBus::new();
        let processor = Arc::new(EntityProcessor::new(store.clone(), events.clone()));
        SyncContext {
            connector_id: ConnectorId::nil(),
            org_id: OrgId::nil(),
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
    async fn articles_and_attachments_write_with_author_owner_permission() {
        let store = Arc::new(InMemoryStore::new());
        let sync_points = Arc::new(InMemorySyncPointStore::new());
        let ctx = test_ctx(store.clone(), sync_points.clone());

        let attachment = ServiceNowAttachment {
            sys_id: "att-1".into(),
            file_name: "notes.pdf".into(),
            size_bytes: 10,
            content_type: "application/pdf".into(),
            created_at_ms: 100,
            updated_at_ms: 100,
        };
        let api = Arc::new(FakeApi { articles: StdMutex::new(vec![vec![article("art-1", 900, vec![attachment])]]) });
        let connector = ServiceNowConnector::new(api);

        connector.run_incremental_sync(&ctx).await.unwrap();

        let tx = store.begin_transaction().await.unwrap();
        assert!(tx.get_record_by_external_id(ctx.connector_id, "art-1").await.unwrap().is_some());
        assert!(tx.get_record_by_external_id(ctx.connector_id, "att-1").await.unwrap().is_some());

        let key = ServiceNowConnector::named_key(&ctx, "articles");
        assert_eq!(sync_points.read(&key).await.last_sync_time(), Some(900));
    }

    #[tokio::test]
    async fn unpublished_articles_are_marked_auto_index_off() {
        let store = Arc::new(InMemoryStore::new());
        let sync_points = Arc::new(InMemorySyncPointStore::new());
        let ctx = test_ctx(store.clone(), sync_points.clone());

        let mut draft = article("art-2", 500, vec![]);
        draft.workflow_state = "draft".into();
        let api = Arc::new(FakeApi { articles: StdMutex::new(vec![vec![draft]]) });
        let connector = ServiceNowConnector::new(api);

        connector.run_incremental_sync(&ctx).await.unwrap();

        let tx = store.begin_transaction().await.unwrap();
        let record = tx.get_record_by_external_id(ctx.connector_id, "art-2").await.unwrap().unwrap();
        assert_eq!(record.header().indexing_status, IndexingStatus::AutoIndexOff);
    }
}
