//! The Record Streamer (C6): on-demand byte fetch for a single record, with
//! Gmail<->Drive fallback, attachment-id resolution, and optional PDF
//! conversion.
//!
//! Grounded on `gmail/connector.py::_stream_attachment_record` for the
//! fallback/sibling-walk shape and `router.py`'s generator-based chunked
//! response for the non-buffering streaming idiom (mirrored here by
//! `ingestgraph_runtime::StreamingResponse`, itself modeled on
//! `r2e-core::sse`'s `Stream`-of-chunks pattern).

mod gmail_attachment;
mod mime;
mod pdf;
mod streamer;

pub use gmail_attachment::{DriveFallbackSource, GmailAttachmentSource, ResolvedAttachment};
pub use mime::{google_native_kind, GoogleNativeKind};
pub use pdf::{LibreOfficeConverter, PdfConversionOutcome, PdfConverter};
pub use streamer::{GoogleNativeDocParser, RecordStreamer};
