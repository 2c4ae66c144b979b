use std::sync::Arc;

use ingestgraph_core::EngineError;
use ingestgraph_webhook::{WebhookRegistry, WebhookSecretProvider, WebhookState};

use crate::registry::ConnectorRegistry;

/// `ingestgraph run <connector-id>`: one-shot `run_sync` if the
/// connector has never completed a cold start, `run_incremental_sync`
/// otherwise — the same choice `ConnectorRuntime::init` already makes by
/// checking whether any SyncPoint exists, so this just resolves the
/// connector and calls through.
pub async fn run(registry: &dyn ConnectorRegistry, connector_id: &str) -> Result<(), EngineError> {
    let connector = registry.resolve(connector_id).await?;
    let health = connector.health().await;
    if health.last_sync_time_ms.is_none() {
        tracing::info!(connector_id, "no prior sync recorded, running cold start");
        connector.run_sync().await
    } else {
        tracing::info!(connector_id, "running incremental sync");
        connector.run_incremental_sync().await
    }
}

/// `ingestgraph doctor`: print a health snapshot for every registered
/// connector. Never fails on an individual connector's bad health — a
/// `NeedsReauth` status is exactly what an operator is running this to
/// find.
pub async fn doctor(registry: &dyn ConnectorRegistry) -> Result<(), EngineError> {
    let ids = registry.list_ids().await;
    if ids.is_empty() {
        println!("no connectors registered");
        return Ok(());
    }

    for id in ids {
        match registry.resolve(&id).await {
            Ok(connector) => {
                let health = connector.health().await;
                let summary = serde_json::to_string_pretty(&health).unwrap_or_else(|_| format!("{health:?}"));
                println!("== {id} ==\n{summary}\n");
            }
            Err(e) => println!("== {id} ==\nfailed to resolve: {e}\n"),
        }
    }
    Ok(())
}

/// `ingestgraph replay <connector-id> <scope>`: clear one scope's
/// checkpoint so the next `run` does a full resync of it instead of an
/// incremental one. The operator escape hatch for a stuck
/// cursor-invalid connector (spec §4.16, §7).
pub async fn replay(registry: &dyn ConnectorRegistry, connector_id: &str, scope: &str) -> Result<(), EngineError> {
    let connector = registry.resolve(connector_id).await?;
    connector.clear_scope(scope).await?;
    tracing::info!(connector_id, scope, "checkpoint cleared, next run will fully resync this scope");
    Ok(())
}

/// `ingestgraph webhook-serve`: boot the C8/C9 Axum router and block
/// until shutdown.
pub async fn webhook_serve(
    registry: Arc<dyn WebhookRegistry>,
    secrets: Arc<dyn WebhookSecretProvider>,
    addr: std::net::SocketAddr,
) -> Result<(), EngineError> {
    let state = WebhookState { registry, secrets };
    let app = ingestgraph_webhook::router(state);

    tracing::info!(%addr, "webhook server listening");
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(EngineError::from)?;
    axum::serve(listener, app).await.map_err(|e| EngineError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use ingestgraph_core::HealthSummary;

    use super::*;
    use crate::registry::ManagedConnector;

    struct FakeConnector {
        id: String,
        synced: AtomicBool,
        cleared_scopes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ManagedConnector for FakeConnector {
        fn id(&self) -> &str {
            &self.id
        }

        async fn run_sync(&self) -> Result<(), EngineError> {
            self.synced.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn run_incremental_sync(&self) -> Result<(), EngineError> {
            Ok(())
        }

        async fn health(&self) -> HealthSummary {
            let mut h = HealthSummary::new(self.id.clone());
            if self.synced.load(Ordering::SeqCst) {
                h.record_success(1_000);
            }
            h
        }

        async fn clear_scope(&self, scope: &str) -> Result<(), EngineError> {
            self.cleared_scopes.lock().unwrap().push(scope.to_string());
            Ok(())
        }
    }

    struct FakeRegistry {
        connector: Arc<FakeConnector>,
    }

    #[async_trait]
    impl ConnectorRegistry for FakeRegistry {
        async fn resolve(&self, connector_id: &str) -> Result<Arc<dyn ManagedConnector>, EngineError> {
            if connector_id == self.connector.id {
                Ok(self.connector.clone())
            } else {
                Err(EngineError::entity_missing(format!("unknown connector {connector_id}")))
            }
        }

        async fn list_ids(&self) -> Vec<String> {
            vec![self.connector.id.clone()]
        }
    }

    fn fake() -> (FakeRegistry, Arc<FakeConnector>) {
        let connector = Arc::new(FakeConnector { id: "dropbox-1".into(), synced: AtomicBool::new(false), cleared_scopes: Mutex::new(Vec::new()) });
        (FakeRegistry { connector: connector.clone() }, connector)
    }

    #[tokio::test]
    async fn run_does_a_cold_start_when_never_synced() {
        let (registry, connector) = fake();
        run(&registry, "dropbox-1").await.unwrap();
        assert!(connector.synced.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn run_does_incremental_once_a_sync_has_happened() {
        let (registry, connector) = fake();
        connector.run_sync().await.unwrap();
        connector.synced.store(false, Ordering::SeqCst);
        run(&registry, "dropbox-1").await.unwrap();
        assert!(!connector.synced.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn replay_clears_the_named_scope() {
        let (registry, connector) = fake();
        replay(&registry, "dropbox-1", "team-42").await.unwrap();
        assert_eq!(connector.cleared_scopes.lock().unwrap().as_slice(), ["team-42"]);
    }

    #[tokio::test]
    async fn doctor_succeeds_even_with_registered_connectors() {
        let (registry, _connector) = fake();
        assert!(doctor(&registry).await.is_ok());
    }

    #[tokio::test]
    async fn run_against_unknown_connector_fails() {
        let (registry, _connector) = fake();
        assert!(run(&registry, "not-registered").await.is_err());
    }
}
