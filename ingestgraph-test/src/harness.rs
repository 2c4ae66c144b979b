use std::sync::Arc;
use std::time::Duration;

use ingestgraph_core::{EngineConfig, FixedClock};
use ingestgraph_events::DomainEventBus;
use ingestgraph_filter::SyncFilter;
use ingestgraph_processor::EntityProcessor;
use ingestgraph_ratelimit::RateLimiter;
use ingestgraph_runtime::{EntityWriter, SyncContext};
use ingestgraph_store::{InMemoryStore, Store};
use ingestgraph_syncpoint::InMemorySyncPointStore;
use ingestgraph_types::{ConnectorId, OrgId};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Builds the domain plumbing every scenario test needs — an in-memory
/// store, a deterministic clock, an event bus, sync-point storage, and a
/// rate limiter — without touching a real database or network. Grounded
/// on `r2e-test/src/app.rs`'s builder-then-assemble shape
/// (`TestApp::new`/`from_builder`), adapted from an HTTP test client to
/// a domain-level one since this repo's boundary is `ConnectorDriver`,
/// not an HTTP router.
pub struct TestHarness {
    store: Arc<InMemoryStore>,
    clock: Arc<FixedClock>,
    events: DomainEventBus,
    sync_points: Arc<InMemorySyncPointStore>,
    rate_limiter: Arc<RateLimiter>,
    config: EngineConfig,
    filter: SyncFilter,
}

/// Builder for [`TestHarness`]. Every `with_*` method is optional; the
/// default harness is a clean-slate in-memory stack with an unthrottled
/// rate limiter and an `EngineConfig` at its defaults.
#[derive(Default)]
pub struct TestHarnessBuilder {
    store: Option<Arc<InMemoryStore>>,
    clock_ms: Option<i64>,
    rate_limit: Option<(u64, Duration)>,
    config: Option<EngineConfig>,
    filter: Option<SyncFilter>,
}

impl TestHarness {
    pub fn new() -> TestHarnessBuilder {
        TestHarnessBuilder::default()
    }

    pub fn store(&self) -> Arc<InMemoryStore> {
        self.store.clone()
    }

    pub fn clock(&self) -> Arc<FixedClock> {
        self.clock.clone()
    }

    pub fn events(&self) -> DomainEventBus {
        self.events.clone()
    }

    /// Advance the deterministic clock, e.g. between a cold-start sync
    /// and the warm-start incremental sync that follows it in a
    /// scenario test.
    pub fn advance_clock(&self, delta_ms: i64) {
        self.clock.advance(delta_ms);
    }

    /// Build a fresh [`SyncContext`] for one connector instance. Each
    /// call gets its own `EntityProcessor` wired to the shared store and
    /// event bus, and its own `CancellationToken` so tests can cancel
    /// one connector's run without affecting another sharing the same
    /// harness.
    pub fn sync_context(&self, connector_id: ConnectorId, org_id: OrgId) -> SyncContext {
        let processor: Arc<dyn EntityWriter> = Arc::new(EntityProcessor::new(self.store.clone(), self.events.clone()));
        SyncContext {
            connector_id,
            org_id,
            store: self.store.clone() as Arc<dyn Store>,
            processor,
            sync_points: self.sync_points.clone(),
            rate_limiter: self.rate_limiter.clone(),
            clock: self.clock.clone(),
            config: self.config.clone(),
            filter: self.filter.clone(),
            events: self.events.clone(),
            cancel: CancellationToken::new(),
        }
    }

    /// Convenience over [`TestHarness::sync_context`] for tests that
    /// don't care about specific ids.
    pub fn sync_context_with_random_ids(&self) -> SyncContext {
        self.sync_context(Uuid::new_v4(), Uuid::new_v4())
    }
}

impl TestHarnessBuilder {
    pub fn with_store(mut self, store: Arc<InMemoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_clock(mut self, now_ms: i64) -> Self {
        self.clock_ms = Some(now_ms);
        self
    }

    pub fn with_rate_limit(mut self, max: u64, window: Duration) -> Self {
        self.rate_limit = Some((max, window));
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_filter(mut self, filter: SyncFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn build(self) -> TestHarness {
        let (max, window) = self.rate_limit.unwrap_or((1_000, Duration::from_secs(1)));
        TestHarness {
            store: self.store.unwrap_or_else(|| Arc::new(InMemoryStore::new())),
            clock: Arc::new(FixedClock::new(self.clock_ms.unwrap_or(0))),
            events: DomainEventBus::new(),
            sync_points: Arc::new(InMemorySyncPointStore::new()),
            rate_limiter: Arc::new(RateLimiter::new(max, window)),
            config: self.config.unwrap_or_else(EngineConfig::defaults),
            filter: self.filter.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_harness_builds_a_usable_sync_context() {
        let harness = TestHarness::new().build();
        let ctx = harness.sync_context_with_random_ids();
        assert_eq!(ctx.clock.now_ms(), 0);
    }

    #[test]
    fn advancing_the_clock_is_visible_through_every_issued_context() {
        let harness = TestHarness::new().with_clock(1_000).build();
        let ctx = harness.sync_context_with_random_ids();
        harness.advance_clock(500);
        assert_eq!(ctx.clock.now_ms(), 1_500);
    }

    #[test]
    fn every_context_shares_the_same_underlying_store() {
        let harness = TestHarness::new().build();
        assert!(Arc::ptr_eq(&harness.store(), &harness.store()));
    }
}
