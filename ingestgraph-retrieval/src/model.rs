use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A ranked vector-search hit, the retrieval assembler's sole input (spec
/// §4.3: "a ranked list of vector-search hits, each carrying
/// `{virtual_record_id, block_index, is_block_group, score, metadata}`").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorHit {
    pub virtual_record_id: Uuid,
    pub block_index: u32,
    pub is_block_group: bool,
    pub score: f32,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    Text,
    Image,
    TableRow,
    Table,
}

/// One addressable unit inside a record's blob. `TableRow`s carry
/// `parent_block_group_index`, pointing at the `Table` block-group they
/// belong to (spec §4.3 step 2: "`TABLE_ROW`: defer — collect by parent
/// block-group").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub index: u32,
    pub block_type: BlockType,
    pub text: String,
    /// `Some` only for `Image` blocks with an inline-renderable source.
    pub image_data_uri: Option<String>,
    pub parent_block_group_index: Option<u32>,
}

/// A `Table` block-group: the summary block plus its child `TableRow`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockGroup {
    pub index: u32,
    pub summary_text: String,
    pub markdown: String,
    pub child_block_indices: Vec<u32>,
}

/// A full record's hydrated blob: every block plus every block-group,
/// keyed implicitly by `virtual_record_id` at the hydration layer (spec
/// §4.3 step 1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordBlob {
    pub blocks: Vec<Block>,
    pub block_groups: Vec<BlockGroup>,
    /// Semantic metadata rendered into the `<record>` preface — title,
    /// source connector, weburl, whatever the indexing pipeline attached.
    pub metadata: serde_json::Value,
}

impl RecordBlob {
    pub fn block(&self, index: u32) -> Option<&Block> {
        self.blocks.iter().find(|b| b.index == index)
    }

    pub fn block_group(&self, index: u32) -> Option<&BlockGroup> {
        self.block_groups.iter().find(|g| g.index == index)
    }
}

/// Whether the downstream LLM accepts inline image content, decided by
/// the caller (spec §4.3 step 2: "if the downstream LLM is multimodal,
/// emit as `image_url`... otherwise emit the image's description text").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageHandling {
    Multimodal,
    TextOnly,
}

/// A single rendered content fragment in emit order, carrying its stable
/// citation label.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedBlock {
    pub citation: String,
    pub block_index: u32,
    pub content: RenderedContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedContent {
    Text { text: String },
    ImageUrl { data_uri: String },
    TableSummary { summary: String, truncated: bool },
    TableRow { text: String },
}

/// One `<record>` in the assembled prompt: its 1-based emit position (used
/// in every citation label under it), its metadata, and its rendered
/// blocks in block-index order.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedRecord {
    pub record_number: u32,
    pub virtual_record_id: Uuid,
    pub metadata: serde_json::Value,
    pub blocks: Vec<RenderedBlock>,
}

/// The assembler's output: a message-content payload plus the ids of
/// every record that ended up surfaced (spec §4.3: "Output: a
/// message-content payload for an LLM, plus a list of surfaced record
/// IDs").
#[derive(Debug, Clone, Serialize)]
pub struct AssembledPayload {
    pub records: Vec<RenderedRecord>,
    pub surfaced_record_ids: Vec<Uuid>,
    /// Token count across all hydrated records excluding `Image` blocks
    /// (spec §4.3 step 6). The assembler never drops records itself —
    /// the caller compares this against its own budget.
    pub token_count: usize,
}
