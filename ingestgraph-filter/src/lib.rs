//! Filter Engine (C2): user-configured sync filters and indexing filters.
//!
//! No direct teacher analogue; grounded on `r2e-core/src/validation.rs`'s
//! declarative-rule style and `r2e-security/src/guards.rs`'s "does this
//! request pass" predicate shape, simplified to plain functions since
//! neither `garde` nor the guard-trait machinery has a use here.

mod indexing_filter;
mod options;
mod sync_filter;

pub use indexing_filter::IndexingFilter;
pub use options::{FilterOption, FilterOptionsResponse};
pub use sync_filter::SyncFilter;
