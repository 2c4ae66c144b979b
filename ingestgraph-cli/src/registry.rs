use async_trait::async_trait;
use ingestgraph_core::{EngineError, HealthSummary};

/// One connector instance under the CLI's management, type-erased so
/// `Cli` doesn't need to be generic over every `ConnectorDriver` impl a
/// deployment links in. A deployment's binary builds one of these per
/// configured connector (typically a thin wrapper around its own
/// `ConnectorRuntime<C>`) and registers it with a [`ConnectorRegistry`].
#[async_trait]
pub trait ManagedConnector: Send + Sync {
    fn id(&self) -> &str;
    async fn run_sync(&self) -> Result<(), EngineError>;
    async fn run_incremental_sync(&self) -> Result<(), EngineError>;
    async fn health(&self) -> HealthSummary;
    /// Clear the checkpoint for `scope` and force a full resync of it —
    /// the operator escape hatch for the cursor-invalid failure mode
    /// (spec §4.16 `replay`).
    async fn clear_scope(&self, scope: &str) -> Result<(), EngineError>;
}

/// Looks up a configured connector instance by the id an operator passes
/// on the command line.
#[async_trait]
pub trait ConnectorRegistry: Send + Sync {
    async fn resolve(&self, connector_id: &str) -> Result<std::sync::Arc<dyn ManagedConnector>, EngineError>;
    async fn list_ids(&self) -> Vec<String>;
}
