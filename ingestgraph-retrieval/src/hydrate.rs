//! Record hydration (spec §4.3 step 1): load each distinct record's blob
//! once, falling back to a synthetic reconstruction from the vector store
//! when blob storage has no entry for it.

use std::collections::HashMap;

use async_trait::async_trait;
use ingestgraph_core::EngineError;
use uuid::Uuid;

use crate::model::{Block, BlockGroup, RecordBlob, VectorHit};

/// Blob storage lookup for a record's full block/block-group content. The
/// concrete store (object storage, a document DB) is out of scope — this
/// is the seam a deployment wires in.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get_record_blob(&self, virtual_record_id: Uuid) -> Result<Option<RecordBlob>, EngineError>;
}

/// Scrolls every vector point for a `virtual_record_id`, used only when
/// `BlobStore` has no blob for it — "legacy vector-index entries without
/// a blob" (spec §4.3 step 1).
#[async_trait]
pub trait VectorPointSource: Send + Sync {
    async fn scroll_points(&self, virtual_record_id: Uuid) -> Result<Vec<VectorHit>, EngineError>;
}

/// Hydrate every distinct `virtual_record_id` referenced by `hits` exactly
/// once, caching in the returned map. Falls back to
/// [`reconstruct_synthetic_blob`] when the blob store has nothing for a
/// record.
pub async fn hydrate_records(
    hits: &[VectorHit],
    blobs: &dyn BlobStore,
    points: &dyn VectorPointSource,
) -> Result<HashMap<Uuid, RecordBlob>, EngineError> {
    let mut cache = HashMap::new();
    let mut seen = std::collections::HashSet::new();

    for hit in hits {
        if !seen.insert(hit.virtual_record_id) {
            continue;
        }

        let blob = match blobs.get_record_blob(hit.virtual_record_id).await? {
            Some(blob) => blob,
            None => {
                tracing::warn!(virtual_record_id = %hit.virtual_record_id, "no blob, reconstructing from vector points");
                reconstruct_synthetic_blob(hit.virtual_record_id, points).await?
            }
        };
        cache.insert(hit.virtual_record_id, blob);
    }

    Ok(cache)
}

/// Reconstruct a record's blob from its vector points when the blob is
/// missing: scroll every point, map each to a block, sort by block index
/// (spec §4.3 step 1). Block-groups (tables) can't be recovered this way
/// since point payloads don't carry table-group structure — the
/// reconstruction yields text/image blocks only.
async fn reconstruct_synthetic_blob(
    virtual_record_id: Uuid,
    points: &dyn VectorPointSource,
) -> Result<RecordBlob, EngineError> {
    let mut hits = points.scroll_points(virtual_record_id).await?;
    hits.sort_by_key(|h| h.block_index);

    let blocks = hits
        .into_iter()
        .filter(|h| !h.is_block_group)
        .map(|h| Block {
            index: h.block_index,
            block_type: crate::model::BlockType::Text,
            text: h
                .metadata
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            image_data_uri: None,
            parent_block_group_index: None,
        })
        .collect();

    Ok(RecordBlob { blocks, block_groups: Vec::new(), metadata: serde_json::json!({}) })
}
