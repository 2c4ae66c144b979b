//! Domain event bus emitted by the Entity Processor.
//!
//! Grounded on `r2e-events::{EventBus, LocalEventBus}` almost verbatim —
//! typed pub/sub keyed by `TypeId`, bounded concurrency via semaphore
//! backpressure.

mod bus;
mod events;

pub use bus::DomainEventBus;
pub use events::{
    GroupDeleted, GroupMemberAdded, GroupMemberRemoved, IndexingRequested, NewRecords,
    RecordContentUpdated, RecordDeleted, RecordGroupRenamed, RecordMetadataUpdated,
    RecordPermissionsUpdated,
};
