//! IngestGraph — a multi-source knowledge ingestion engine.
//!
//! This facade crate re-exports every `ingestgraph-*` sub-crate through a
//! single dependency with feature flags, the way `r2e` re-exports its own
//! sub-crates. Pull in what you need with:
//!
//! ```ignore
//! use ingestgraph::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature         | Default | Crate                      |
//! |-----------------|---------|-----------------------------|
//! | `connectors`    | **yes** | `ingestgraph-connectors`    |
//! | `webhook`       | **yes** | `ingestgraph-webhook`       |
//! | `streamrouter`  | **yes** | `ingestgraph-streamrouter`  |
//! | `observability` | **yes** | `ingestgraph-observability` |
//! | `streamer`      | no      | `ingestgraph-streamer`      |
//! | `retrieval`     | no      | `ingestgraph-retrieval`     |
//! | `test-harness`  | no      | `ingestgraph-test`          |
//! | `full`          | no      | all of the above            |
//!
//! The core (types, store, syncpoint, filter, events, processor, rate
//! limiting, runtime) is never optional — every connector instance needs
//! all of it.

pub extern crate ingestgraph_core;
pub extern crate ingestgraph_events;
pub extern crate ingestgraph_filter;
pub extern crate ingestgraph_processor;
pub extern crate ingestgraph_ratelimit;
pub extern crate ingestgraph_runtime;
pub extern crate ingestgraph_store;
pub extern crate ingestgraph_syncpoint;
pub extern crate ingestgraph_types;

#[cfg(feature = "connectors")]
pub use ingestgraph_connectors;

#[cfg(feature = "streamer")]
pub use ingestgraph_streamer;

#[cfg(feature = "retrieval")]
pub use ingestgraph_retrieval;

#[cfg(feature = "webhook")]
pub use ingestgraph_webhook;

#[cfg(feature = "streamrouter")]
pub use ingestgraph_streamrouter;

#[cfg(feature = "observability")]
pub use ingestgraph_observability;

#[cfg(feature = "test-harness")]
pub use ingestgraph_test;

// Re-export the ambient primitives (error taxonomy, config, clock, health)
// at the top level for convenience, the way `r2e` re-exports `r2e_core`.
pub use ingestgraph_core::*;

/// The types and traits almost every caller needs in scope: the entity
/// model, the `Store`/`SyncPointStore` contracts, the domain event bus,
/// the Entity Processor, and the connector runtime's sync-loop patterns.
pub mod prelude {
    pub use ingestgraph_core::{Clock, EngineConfig, EngineError, FixedClock, HealthStatus, HealthSummary, SystemClock};
    pub use ingestgraph_events::{DomainEventBus, IndexingRequested, NewRecords};
    pub use ingestgraph_filter::{IndexingFilter, SyncFilter};
    pub use ingestgraph_processor::EntityProcessor;
    pub use ingestgraph_ratelimit::RateLimiter;
    pub use ingestgraph_runtime::{
        bounded_fan_out, ConnectorDriver, ConnectorRuntime, EntityWriter, RetryAction, RetryPolicy, SyncContext,
    };
    pub use ingestgraph_store::{InMemoryStore, Store, Tx};
    pub use ingestgraph_syncpoint::{SyncPointData, SyncPointKey, SyncPointStore};
    pub use ingestgraph_types::{
        classify_change, permissions_equal, AppUser, AppUserGroup, ChangeClassification, ConnectorId, ExternalId,
        GroupId, GroupType, OrgId, Permission, PermissionEntityKind, PermissionType, RecordGroup, RecordHeader,
        RecordId, RecordKind, RecordType, UserId,
    };

    #[cfg(feature = "connectors")]
    pub use ingestgraph_connectors::{dropbox, gmail, linear, servicenow};

    #[cfg(feature = "streamer")]
    pub use ingestgraph_streamer::RecordStreamer;

    #[cfg(feature = "retrieval")]
    pub use ingestgraph_retrieval::assemble;

    #[cfg(feature = "webhook")]
    pub use ingestgraph_webhook::WebhookState;

    #[cfg(feature = "streamrouter")]
    pub use ingestgraph_streamrouter::{SignedUrlIssuer, StreamRouter};
}
