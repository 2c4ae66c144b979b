use std::collections::HashSet;

use ingestgraph_types::{IndexingStatus, RecordType};
use serde::{Deserialize, Serialize};

/// Which `RecordType`/extension combinations are eligible for indexing.
/// Evaluated by the Entity Processor at `on_new_records` step 4 to decide
/// whether `indexing_status` starts as `AUTO_INDEX_OFF` or
/// `IndexingRequested`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexingFilter {
    /// Record types excluded from indexing entirely (e.g. an org disables
    /// comment indexing). Empty means every record type is eligible.
    pub disabled_record_types: HashSet<RecordType>,
    /// File extensions excluded from indexing (e.g. `.exe`, `.dmg`), checked
    /// only for `RecordType::File`.
    pub disabled_extensions: HashSet<String>,
}

impl IndexingFilter {
    pub fn indexing_status_for(&self, record_type: RecordType, extension: Option<&str>) -> IndexingStatus {
        if self.disabled_record_types.contains(&record_type) {
            return IndexingStatus::AutoIndexOff;
        }
        if record_type == RecordType::File {
            if let Some(ext) = extension {
                if self.disabled_extensions.contains(&ext.to_lowercase()) {
                    return IndexingStatus::AutoIndexOff;
                }
            }
        }
        IndexingStatus::NotIndexed
    }
}
