use std::future::Future;
use std::sync::{Arc, Mutex};

use ingestgraph_core::{EngineError, HealthSummary};
use ingestgraph_filter::FilterOptionsResponse;
use ingestgraph_types::RecordId;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::context::SyncContext;
use crate::driver::{ConnectorDriver, WebhookNotification};
use crate::retry::{RetryAction, RetryPolicy};

/// Owns one connector instance's lifecycle — `init -> run_sync ->
/// run_incremental_sync -> handle_webhook_notification -> cleanup` (spec
/// §6) — plus its bounded worker pool for scope fan-out and its aggregated
/// health. Grounded on `r2e-scheduler`'s `CancellationToken`-gated run
/// lifecycle.
pub struct ConnectorRuntime<C: ConnectorDriver> {
    driver: Arc<C>,
    ctx: SyncContext,
    scope_semaphore: Arc<Semaphore>,
    health: Mutex<HealthSummary>,
}

impl<C: ConnectorDriver + 'static> ConnectorRuntime<C> {
    pub fn new(driver: Arc<C>, ctx: SyncContext, max_concurrent_batches: usize) -> Self {
        let connector_id = ctx.connector_id.to_string();
        ConnectorRuntime {
            driver,
            ctx,
            scope_semaphore: Arc::new(Semaphore::new(max_concurrent_batches.max(1))),
            health: Mutex::new(HealthSummary::new(connector_id)),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.ctx.cancel.clone()
    }

    pub fn health(&self) -> HealthSummary {
        self.health.lock().expect("health mutex poisoned").clone()
    }

    pub async fn init(&self) -> Result<bool, EngineError> {
        self.driver.init(&self.ctx).await
    }

    pub async fn run_sync(&self) -> Result<(), EngineError> {
        self.run_and_record(|driver, ctx| driver.run_sync(ctx)).await
    }

    pub async fn run_incremental_sync(&self) -> Result<(), EngineError> {
        self.run_and_record(|driver, ctx| driver.run_incremental_sync(ctx)).await
    }

    async fn run_and_record<'a, F, Fut>(&'a self, run: F) -> Result<(), EngineError>
    where
        F: FnOnce(&'a C, &'a SyncContext) -> Fut,
        Fut: Future<Output = Result<(), EngineError>> + 'a,
    {
        let started_at = self.ctx.clock.now_ms();
        match run(self.driver.as_ref(), &self.ctx).await {
            Ok(()) => {
                self.health.lock().expect("health mutex poisoned").record_success(started_at);
                Ok(())
            }
            Err(err) => {
                self.apply_failure_policy(&err);
                Err(err)
            }
        }
    }

    /// Records the run-level consequence of a failure that bubbled all the
    /// way up to the runtime (spec §7). Entity-level skip/continue
    /// decisions already happened inside the connector's own batch loop;
    /// by the time an error reaches here it is either a retry exhaustion,
    /// an auth failure, or a store failure.
    fn apply_failure_policy(&self, err: &EngineError) {
        let mut health = self.health.lock().expect("health mutex poisoned");
        match RetryPolicy::classify(err) {
            RetryAction::AbortNeedsReauth => health.record_auth_failure(err.to_string()),
            _ => health.record_error(err.to_string()),
        }
    }

    pub async fn handle_webhook_notification(&self, notification: WebhookNotification) -> Result<(), EngineError> {
        self.driver.handle_webhook_notification(&self.ctx, notification).await
    }

    pub async fn test_connection_and_access(&self) -> Result<bool, EngineError> {
        self.driver.test_connection_and_access(&self.ctx).await
    }

    pub async fn cleanup(&self) -> Result<(), EngineError> {
        self.driver.cleanup(&self.ctx).await
    }

    pub async fn reindex_records(&self, records: Vec<RecordId>) -> Result<(), EngineError> {
        self.driver.reindex_records(&self.ctx, records).await
    }

    pub async fn get_filter_options(
        &self,
        filter_key: &str,
        page: usize,
        limit: usize,
        search: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<FilterOptionsResponse, EngineError> {
        self.driver.get_filter_options(&self.ctx, filter_key, page, limit, search, cursor).await
    }

    /// Runs `scope_fn` once per scope under `max_concurrent_batches`-bounded
    /// concurrency (spec §4.1 "Scope fan-out": "bounded worker pool, not
    /// one task per scope"). Each scope's own SyncPoint persists
    /// independently, so one scope failing never blocks or rolls back
    /// another. Checks cancellation before spawning each scope and again
    /// once a permit is granted, so a cancelled run drains quickly instead
    /// of starting fresh work.
    pub async fn fan_out_scopes<T, F, Fut>(&self, scopes: Vec<T>, scope_fn: F) -> Vec<Result<(), EngineError>>
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), EngineError>> + Send + 'static,
    {
        bounded_fan_out(scopes, self.scope_semaphore.clone(), &self.ctx.cancel, scope_fn).await
    }
}

/// Runs `scope_fn` once per scope under a `Semaphore`-bounded concurrency
/// limit, checking `cancel` both before spawning each scope and again once
/// a permit is granted (spec §4.1 "Scope fan-out"). Free-standing so both
/// [`ConnectorRuntime::fan_out_scopes`] and connector implementations that
/// don't hold a runtime reference can share the same bounded-concurrency
/// discipline.
pub async fn bounded_fan_out<T, F, Fut>(
    scopes: Vec<T>,
    semaphore: Arc<Semaphore>,
    cancel: &CancellationToken,
    scope_fn: F,
) -> Vec<Result<(), EngineError>>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), EngineError>> + Send + 'static,
{
    let scope_fn = Arc::new(scope_fn);
    let mut handles = Vec::with_capacity(scopes.len());

    for scope in scopes {
        if cancel.is_cancelled() {
            break;
        }
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let f = scope_fn.clone();
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permit;
            if cancel.is_cancelled() {
                return Ok(());
            }
            f(scope).await
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.unwrap_or_else(|join_err| Err(EngineError::internal(join_err.to_string()))));
    }
    results
}
