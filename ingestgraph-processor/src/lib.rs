//! The Entity Processor (spec §4.2) — the write path every connector calls
//! against, translating source entries into Store writes plus domain
//! events.

mod diff;
mod pending;
mod processor;

pub use processor::EntityProcessor;
