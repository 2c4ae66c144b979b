//! Webhook intake surface (spec §4.1/§4.12): HTTP entry points for
//! provider-pushed change notifications. Verifies, decodes, and hands off
//! to `run_incremental_sync` in the background, answering every request
//! with an immediate 200 so providers never retry-storm a slow connector.

mod envelope;
mod handlers;
mod signature;
mod state;

pub use envelope::decode_gmail_pubsub;
pub use signature::verify_hmac_sha256;
pub use state::{WebhookRegistry, WebhookSecretProvider, WebhookState};

use axum::routing::post;
use axum::Router;

/// Build the webhook intake router. Mount under whatever prefix a
/// deployment wants (`router.py` mounts these at `/drive/webhook`,
/// `/gmail/webhook`, `/admin/webhook` off the API root).
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/drive/webhook", post(handlers::handle_drive_webhook))
        .route("/gmail/webhook", post(handlers::handle_gmail_webhook))
        .route("/admin/webhook", post(handlers::handle_admin_webhook))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use base64::Engine;
    use hmac::{Hmac, Mac};
    use ingestgraph_core::EngineError;
    use ingestgraph_runtime::{ConnectorDriver, SyncContext, WebhookNotification};
    use sha2::Sha256;
    use tower::ServiceExt;

    use super::*;

    fn sign(secret: &[u8], body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret).unwrap();
        mac.update(body);
        mac.finalize().into_bytes().iter().map(|b| format!("{b:02x}")).collect()
    }

    struct FakeSecrets;

    #[async_trait]
    impl WebhookSecretProvider for FakeSecrets {
        async fn hmac_secret(&self, _provider: &str) -> Result<Vec<u8>, EngineError> {
            Ok(b"topsecret".to_vec())
        }

        async fn bearer_token(&self, _provider: &str) -> Result<String, EngineError> {
            Ok("gmail-token".to_string())
        }
    }

    struct RecordingDriver {
        dispatched: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ConnectorDriver for RecordingDriver {
        async fn init(&self, _ctx: &SyncContext) -> Result<(), EngineError> {
            unimplemented!()
        }

        async fn run_sync(&self, _ctx: &SyncContext) -> Result<(), EngineError> {
            unimplemented!()
        }

        async fn run_incremental_sync(&self, _ctx: &SyncContext) -> Result<(), EngineError> {
            Ok(())
        }

        async fn handle_webhook_notification(
            &self,
            _ctx: &SyncContext,
            _notification: WebhookNotification,
        ) -> Result<(), EngineError> {
            self.dispatched.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn test_connection_and_access(&self, _ctx: &SyncContext) -> Result<bool, EngineError> {
            Ok(true)
        }

        async fn stream_record(
            &self,
            _ctx: &SyncContext,
            _record: &ingestgraph_types::RecordKind,
        ) -> Result<ingestgraph_runtime::StreamingResponse, EngineError> {
            unimplemented!()
        }

        async fn get_signed_url(&self, _ctx: &SyncContext, _record: &ingestgraph_types::RecordKind) -> Result<Option<String>, EngineError> {
            Ok(None)
        }

        async fn reindex_records(&self, _ctx: &SyncContext, _record_ids: &[uuid::Uuid]) -> Result<(), EngineError> {
            Ok(())
        }

        async fn cleanup(&self, _ctx: &SyncContext) -> Result<(), EngineError> {
            Ok(())
        }

        async fn get_filter_options(&self, _ctx: &SyncContext) -> Result<serde_json::Value, EngineError> {
            Ok(serde_json::Value::Null)
        }
    }

    struct FakeRegistry {
        driver: Arc<RecordingDriver>,
    }

    #[async_trait]
    impl WebhookRegistry for FakeRegistry {
        async fn resolve(
            &self,
            _provider: &str,
            _resource_id: Option<&str>,
        ) -> Result<(Arc<dyn ConnectorDriver>, SyncContext), EngineError> {
            Ok((self.driver.clone(), test_sync_context()))
        }
    }

    fn test_sync_context() -> SyncContext {
        use ingestgraph_core::{EngineConfig, FixedClock};
        use ingestgraph_events::DomainEventBus;
        use ingestgraph_filter::SyncFilter;
        use ingestgraph_ratelimit::RateLimiter;
        use ingestgraph_store::InMemoryStore;
        use ingestgraph_syncpoint::InMemorySyncPointStore;
        use std::time::Duration;
        use tokio_util::sync::CancellationToken;
        use uuid::Uuid;

        let store = Arc::new(InMemoryStore::new());
        let events = DomainEventBus::new();
        let processor: Arc<dyn ingestgraph_runtime::EntityWriter> =
            Arc::new(ingestgraph_processor::EntityProcessor::new(store.clone(), events.clone()));
        SyncContext {
            connector_id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            store: store as Arc<dyn ingestgraph_store::Store>,
            processor,
            sync_points: Arc::new(InMemorySyncPointStore::new()),
            rate_limiter: Arc::new(RateLimiter::new(50, Duration::from_secs(1))),
            clock: Arc::new(FixedClock::new(0)),
            config: EngineConfig::defaults(),
            filter: SyncFilter::default(),
            events,
            cancel: CancellationToken::new(),
        }
    }

    fn test_state(dispatched: Arc<AtomicUsize>) -> WebhookState {
        WebhookState { registry: Arc::new(FakeRegistry { driver: Arc::new(RecordingDriver { dispatched }) }), secrets: Arc::new(FakeSecrets) }
    }

    async fn wait_for(counter: &AtomicUsize, expected: usize) {
        for _ in 0..50 {
            if counter.load(Ordering::SeqCst) >= expected {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("background dispatch never observed");
    }

    #[tokio::test]
    async fn drive_sync_ping_is_verified_without_dispatch() {
        let dispatched = Arc::new(AtomicUsize::new(0));
        let app = router(test_state(dispatched.clone()));
        let body = b"{}".to_vec();
        let signature = sign(b"topsecret", &body);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/drive/webhook")
                    .header("x-goog-channel-token", signature)
                    .header("x-goog-resource-state", "sync")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(dispatched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn drive_change_notification_dispatches_in_background() {
        let dispatched = Arc::new(AtomicUsize::new(0));
        let app = router(test_state(dispatched.clone()));
        let body = b"{\"fileId\":\"abc\"}".to_vec();
        let signature = sign(b"topsecret", &body);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/drive/webhook")
                    .header("x-goog-channel-token", signature)
                    .header("x-goog-resource-state", "change")
                    .header("x-goog-resource-id", "watch-1")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        wait_for(&dispatched, 1).await;
    }

    #[tokio::test]
    async fn drive_rejects_bad_signature() {
        let dispatched = Arc::new(AtomicUsize::new(0));
        let app = router(test_state(dispatched));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/drive/webhook")
                    .header("x-goog-channel-token", "deadbeef")
                    .body(Body::from(b"{}".to_vec()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn gmail_notification_decodes_envelope_and_dispatches() {
        let dispatched = Arc::new(AtomicUsize::new(0));
        let app = router(test_state(dispatched.clone()));
        let inner = br#"{"emailAddress":"a@example.com","historyId":"1"}"#;
        let encoded = base64::engine::general_purpose::STANDARD.encode(inner);
        let body = serde_json::json!({"message": {"data": encoded}}).to_string();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/gmail/webhook")
                    .header("authorization", "Bearer gmail-token")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        wait_for(&dispatched, 1).await;
    }

    #[tokio::test]
    async fn gmail_rejects_wrong_bearer_token() {
        let dispatched = Arc::new(AtomicUsize::new(0));
        let app = router(test_state(dispatched));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/gmail/webhook")
                    .header("authorization", "Bearer wrong")
                    .body(Body::from(b"{}".to_vec()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_empty_body_is_treated_as_verification() {
        let dispatched = Arc::new(AtomicUsize::new(0));
        let app = router(test_state(dispatched.clone()));
        let body = b"".to_vec();
        let signature = sign(b"topsecret", &body);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/webhook")
                    .header("x-goog-channel-token", signature)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(dispatched.load(Ordering::SeqCst), 0);
    }
}
