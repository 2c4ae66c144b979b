//! The assembly algorithm proper (spec §4.3 steps 2-6): classify each hit
//! by block type, expand tables and adjacent context, dedupe, and render
//! into citation-labeled records.

use std::collections::{HashMap, HashSet};

use ingestgraph_core::EngineError;
use uuid::Uuid;

use crate::hydrate::{hydrate_records, BlobStore, VectorPointSource};
use crate::model::{
    AssembledPayload, BlockGroup, BlockType, ImageHandling, RecordBlob, RenderedBlock, RenderedContent,
    RenderedRecord, VectorHit,
};
use crate::tokens::TokenCounter;

/// Run the full assembler: hydrate, classify, expand adjacency, dedupe,
/// render, count tokens. `large_table_word_threshold` is read from
/// `EngineConfig` by the caller and passed in directly so this crate
/// doesn't need to depend on the config type for one integer.
pub async fn assemble(
    hits: &[VectorHit],
    blobs: &dyn BlobStore,
    points: &dyn VectorPointSource,
    large_table_word_threshold: usize,
    image_handling: ImageHandling,
) -> Result<AssembledPayload, EngineError> {
    let cache = hydrate_records(hits, blobs, points).await?;

    let mut record_order = Vec::new();
    let mut record_number_of = HashMap::new();
    for hit in hits {
        if !record_number_of.contains_key(&hit.virtual_record_id) {
            record_number_of.insert(hit.virtual_record_id, record_order.len() as u32 + 1);
            record_order.push(hit.virtual_record_id);
        }
    }

    let mut per_record: HashMap<Uuid, Vec<(u32, RenderedContent)>> = HashMap::new();
    let mut emitted: HashSet<(Uuid, u32)> = HashSet::new();
    let mut adjacency_candidates: Vec<(Uuid, i64)> = Vec::new();
    let mut deferred_tables: HashSet<(Uuid, u32)> = HashSet::new();

    for hit in hits {
        let vr = hit.virtual_record_id;
        let Some(blob) = cache.get(&vr) else { continue };

        if hit.is_block_group {
            let Some(group) = blob.block_group(hit.block_index) else {
                tracing::warn!(virtual_record_id = %vr, block_index = hit.block_index, "table hit has no matching block-group");
                continue;
            };
            if emitted.contains(&(vr, group.index)) {
                continue;
            }
            emitted.insert((vr, group.index));
            let (entries, adj) = expand_table(group, blob, large_table_word_threshold);
            per_record.entry(vr).or_default().extend(entries);
            adjacency_candidates.push((vr, adj.0));
            adjacency_candidates.push((vr, adj.1));
            continue;
        }

        let Some(block) = blob.block(hit.block_index) else {
            tracing::warn!(virtual_record_id = %vr, block_index = hit.block_index, "hit has no matching block");
            continue;
        };

        match block.block_type {
            BlockType::Text => {
                if emitted.insert((vr, block.index)) {
                    per_record.entry(vr).or_default().push((block.index, RenderedContent::Text { text: block.text.clone() }));
                    adjacency_candidates.push((vr, block.index as i64 - 1));
                    adjacency_candidates.push((vr, block.index as i64 + 1));
                }
            }
            BlockType::Image => {
                if emitted.insert((vr, block.index)) {
                    let content = match (image_handling, &block.image_data_uri) {
                        (ImageHandling::Multimodal, Some(uri)) => RenderedContent::ImageUrl { data_uri: uri.clone() },
                        _ => RenderedContent::Text { text: block.text.clone() },
                    };
                    per_record.entry(vr).or_default().push((block.index, content));
                    adjacency_candidates.push((vr, block.index as i64 - 1));
                    adjacency_candidates.push((vr, block.index as i64 + 1));
                }
            }
            BlockType::TableRow => {
                if let Some(group_index) = block.parent_block_group_index {
                    deferred_tables.insert((vr, group_index));
                } else {
                    tracing::warn!(virtual_record_id = %vr, block_index = hit.block_index, "table row has no parent block-group");
                }
            }
            BlockType::Table => {
                // A non-group hit classified as Table shouldn't occur in
                // practice (tables are addressed via `is_block_group`); treat
                // defensively like a deferred table row with itself as parent.
                deferred_tables.insert((vr, block.index));
            }
        }
    }

    for (vr, group_index) in deferred_tables {
        if emitted.contains(&(vr, group_index)) {
            continue;
        }
        let Some(blob) = cache.get(&vr) else { continue };
        let Some(group) = blob.block_group(group_index) else { continue };
        emitted.insert((vr, group_index));
        let (entries, adj) = expand_table(group, blob, large_table_word_threshold);
        per_record.entry(vr).or_default().extend(entries);
        adjacency_candidates.push((vr, adj.0));
        adjacency_candidates.push((vr, adj.1));
    }

    for (vr, adj_index) in adjacency_candidates {
        if adj_index < 0 {
            continue;
        }
        let adj_index = adj_index as u32;
        if emitted.contains(&(vr, adj_index)) {
            continue;
        }
        let Some(blob) = cache.get(&vr) else { continue };
        let Some(block) = blob.block(adj_index) else { continue };
        emitted.insert((vr, adj_index));
        per_record.entry(vr).or_default().push((adj_index, RenderedContent::Text { text: block.text.clone() }));
    }

    let counter = TokenCounter::new();
    let mut token_count = 0usize;
    let mut records = Vec::new();
    let mut surfaced_record_ids = Vec::new();

    for vr in record_order {
        let Some(mut entries) = per_record.remove(&vr) else { continue };
        if entries.is_empty() {
            continue;
        }
        entries.sort_by_key(|(idx, _)| *idx);

        let record_number = record_number_of[&vr];
        let metadata = cache.get(&vr).map(|b| b.metadata.clone()).unwrap_or(serde_json::json!({}));

        let mut rendered_blocks = Vec::with_capacity(entries.len());
        for (block_index, content) in entries {
            token_count += count_content_tokens(&counter, &content);
            rendered_blocks.push(RenderedBlock { citation: format!("R{record_number}-{block_index}"), block_index, content });
        }

        surfaced_record_ids.push(vr);
        records.push(RenderedRecord { record_number, virtual_record_id: vr, metadata, blocks: rendered_blocks });
    }

    Ok(AssembledPayload { records, surfaced_record_ids, token_count })
}

/// Expand a table block-group into its rendered entries plus the adjacency
/// candidates around its first/last child block index (spec §4.3 step 2).
/// Returns `(entries, (before_first, after_last))`.
fn expand_table(group: &BlockGroup, blob: &RecordBlob, large_table_word_threshold: usize) -> (Vec<(u32, RenderedContent)>, (i64, i64)) {
    let word_count = group.markdown.split_whitespace().count();
    let large = word_count > large_table_word_threshold;

    let mut entries = vec![(group.index, RenderedContent::TableSummary { summary: group.summary_text.clone(), truncated: large })];

    if !large {
        for &child_idx in &group.child_block_indices {
            if let Some(row) = blob.block(child_idx) {
                entries.push((child_idx, RenderedContent::TableRow { text: row.text.clone() }));
            }
        }
    }

    let first = group.child_block_indices.iter().min().copied().unwrap_or(group.index);
    let last = group.child_block_indices.iter().max().copied().unwrap_or(group.index);
    (entries, (first as i64 - 1, last as i64 + 1))
}

fn count_content_tokens(counter: &TokenCounter, content: &RenderedContent) -> usize {
    match content {
        RenderedContent::Text { text } => counter.count(text),
        RenderedContent::TableSummary { summary, .. } => counter.count(summary),
        RenderedContent::TableRow { text } => counter.count(text),
        // Images are excluded from the token budget (spec §4.3 step 6).
        RenderedContent::ImageUrl { .. } => 0,
    }
}
