use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use ingestgraph_cli::{Cli, CliContext, ConnectorRegistry, ManagedConnector};
use ingestgraph_core::EngineError;
use ingestgraph_observability::{init_tracing, ObservabilityConfig};
use ingestgraph_runtime::{ConnectorDriver, SyncContext};
use ingestgraph_webhook::{WebhookRegistry, WebhookSecretProvider};

/// Placeholder registry for the stock binary, which has no connectors
/// wired in on its own — a deployment links its own `ConnectorRegistry`/
/// `WebhookRegistry`/`WebhookSecretProvider` impls and calls
/// `Cli::dispatch` directly instead of shipping this binary as-is.
struct UnconfiguredRegistry;

#[async_trait]
impl ConnectorRegistry for UnconfiguredRegistry {
    async fn resolve(&self, connector_id: &str) -> Result<Arc<dyn ManagedConnector>, EngineError> {
        Err(EngineError::internal(format!(
            "no connector registry configured: '{connector_id}' is unknown to the stock binary; \
             link your own ConnectorRegistry and call Cli::dispatch directly"
        )))
    }

    async fn list_ids(&self) -> Vec<String> {
        Vec::new()
    }
}

#[async_trait]
impl WebhookRegistry for UnconfiguredRegistry {
    async fn resolve(&self, _provider: &str, _resource_id: Option<&str>) -> Result<(Arc<dyn ConnectorDriver>, SyncContext), EngineError> {
        Err(EngineError::internal("no webhook registry configured"))
    }
}

#[async_trait]
impl WebhookSecretProvider for UnconfiguredRegistry {
    async fn hmac_secret(&self, _provider: &str) -> Result<Vec<u8>, EngineError> {
        Err(EngineError::internal("no webhook secrets configured"))
    }

    async fn bearer_token(&self, _provider: &str) -> Result<String, EngineError> {
        Err(EngineError::internal("no webhook secrets configured"))
    }
}

#[tokio::main]
async fn main() {
    init_tracing(&ObservabilityConfig::new("ingestgraph-cli"));

    let cli = Cli::parse();
    let registry = Arc::new(UnconfiguredRegistry);
    let ctx = CliContext { connectors: registry.clone(), webhook_registry: registry.clone(), webhook_secrets: registry };

    if let Err(e) = cli.dispatch(&ctx).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
