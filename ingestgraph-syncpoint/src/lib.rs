//! Durable per-connector/per-scope sync checkpoints (C1).
//!
//! Grounded on the `CacheStore` trait shape in `r2e-cache/src/lib.rs`
//! (pluggable backend, default in-process implementation) but backed by
//! durable storage rather than a TTL cache — checkpoints must survive, not
//! be evicted.

mod data;
mod key;

pub use data::SyncPointData;
pub use key::SyncPointKey;

use async_trait::async_trait;
use dashmap::DashMap;

/// Read/update contract for checkpoints (spec §4.5). Update is an atomic
/// overwrite: readers see either the old or the new state, never partial.
#[async_trait]
pub trait SyncPointStore: Send + Sync {
    async fn read(&self, key: &SyncPointKey) -> SyncPointData;
    async fn update(&self, key: &SyncPointKey, data: SyncPointData);
    async fn clear(&self, key: &SyncPointKey);
}

/// Default in-process implementation. `DashMap::insert` gives the atomic
/// overwrite spec §4.5 requires for free — a durable backend would use a
/// single-row UPSERT instead.
#[derive(Default)]
pub struct InMemorySyncPointStore {
    inner: DashMap<SyncPointKey, SyncPointData>,
}

impl InMemorySyncPointStore {
    pub fn new() -> Self {
        InMemorySyncPointStore::default()
    }
}

#[async_trait]
impl SyncPointStore for InMemorySyncPointStore {
    async fn read(&self, key: &SyncPointKey) -> SyncPointData {
        self.inner.get(key).map(|entry| entry.value().clone()).unwrap_or_default()
    }

    async fn update(&self, key: &SyncPointKey, data: SyncPointData) {
        self.inner.insert(key.clone(), data);
    }

    async fn clear(&self, key: &SyncPointKey) {
        self.inner.remove(key);
    }
}
