use std::sync::Arc;

use async_trait::async_trait;
use ingestgraph_core::EngineError;
use ingestgraph_runtime::{ConnectorDriver, SyncContext};

/// Resolves a webhook's provider + resource id (its channel/watch id, the
/// thing Drive/Admin notifications carry to identify which watch fired) to
/// the connector instance that owns it. Mirrors `router.py`'s
/// `container.drive_webhook_handler()`-style DI lookup, simplified to a
/// trait a deployment implements over its own connector registry.
#[async_trait]
pub trait WebhookRegistry: Send + Sync {
    async fn resolve(
        &self,
        provider: &str,
        resource_id: Option<&str>,
    ) -> Result<(Arc<dyn ConnectorDriver>, SyncContext), EngineError>;
}

/// Per-provider secrets: an HMAC key for Drive/Admin signature verification,
/// and a bearer token for Gmail's Pub/Sub push authentication (spec §4.12:
/// "structural-only for Gmail's Pub/Sub push which authenticates via
/// bearer token instead"). Backed by the excluded `ConfigService` in a real
/// deployment — abstracted here the same way `ingestgraph-streamrouter`
/// abstracts its signing secret behind `SecretProvider`.
#[async_trait]
pub trait WebhookSecretProvider: Send + Sync {
    async fn hmac_secret(&self, provider: &str) -> Result<Vec<u8>, EngineError>;
    async fn bearer_token(&self, provider: &str) -> Result<String, EngineError>;
}

#[derive(Clone)]
pub struct WebhookState {
    pub registry: Arc<dyn WebhookRegistry>,
    pub secrets: Arc<dyn WebhookSecretProvider>,
}
