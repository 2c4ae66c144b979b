//! The Connector Runtime (C4): connector lifecycle, credential caching, the
//! retry/failure policy, and the three incremental-sync loop shapes every
//! source connector is built from.
//!
//! Grounded on `r2e-scheduler`'s `CancellationToken`-gated run lifecycle for
//! [`ConnectorRuntime`]'s shape, `r2e-core`'s `DashMap`-keyed-by-tuple
//! pattern for [`credential::CredentialCache`], and the Dropbox/Gmail/Linear
//! connectors' own sync loops for the three patterns in [`patterns`].

mod context;
mod credential;
mod driver;
mod patterns;
mod retry;
mod runtime;

pub use context::{EntityWriter, SyncContext};
pub use credential::{CachedCredential, CredentialCache, CredentialRefresher};
pub use driver::{ConnectorDriver, StreamingResponse, WebhookNotification};
pub use patterns::{
    bootstrap_event_checkpoint, run_cursor_pagination_sync, run_event_log_sync, run_watermark_sync, CursorPage,
    EventCheckpoint, EventFetchOutcome, EventLogOutcome, EventPage, WatermarkPage,
};
pub use retry::{RetryAction, RetryPolicy};
pub use runtime::{bounded_fan_out, ConnectorRuntime};
