//! The C5 source connectors: one module per provider, each implementing
//! [`ingestgraph_runtime::ConnectorDriver`] against a source-specific HTTP
//! client trait so tests can inject a mock instead of talking to the real
//! API.
//!
//! Grounded directly on the four Python connectors under
//! `app/connectors/sources/` in the original implementation: Dropbox
//! (Pattern A file sync + Pattern B team events), Gmail (Pattern B via
//! `historyId`), Linear (Pattern C, four independent watermarks), and
//! ServiceNow (Pattern C, `sys_updated_on` watermark).

pub mod dropbox;
pub mod gmail;
pub mod linear;
pub mod servicenow;
