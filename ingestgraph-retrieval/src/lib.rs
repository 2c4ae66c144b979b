//! The Retrieval Assembler (C7): turns block-granular vector-search hits
//! back into coherent, citation-ready context for an LLM prompt.
//!
//! Grounded line-for-line on `app/utils/chat_helpers.py`
//! (`get_flattened_results`, `checkForLargeTable`, `get_message_content`,
//! `count_tokens_in_records`).

mod assemble;
mod hydrate;
mod model;
mod template;
mod tokens;

pub use assemble::assemble;
pub use hydrate::{BlobStore, VectorPointSource};
pub use model::{
    AssembledPayload, Block, BlockGroup, BlockType, ImageHandling, RecordBlob, RenderedBlock, RenderedContent,
    RenderedRecord, VectorHit,
};
pub use template::render_prompt;
pub use tokens::TokenCounter;
