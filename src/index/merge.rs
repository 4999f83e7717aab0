//! Merge policy.
//!
//! Small segments accumulate with every commit; the policy decides when the
//! writer folds them together. The merge itself (see
//! `IndexWriter::force_merge`) rewrites live documents into a single fresh
//! segment, which is the only point where logically deleted postings are
//! physically removed.

use crate::index::segment::SegmentMeta;

/// When to compact the segment set.
#[derive(Debug, Clone)]
pub struct MergePolicy {
    /// Merge once the store holds more than this many segments.
    pub max_segments: usize,
    /// Merge once this fraction of all documents is deleted.
    pub deleted_ratio: f64,
}

impl Default for MergePolicy {
    fn default() -> Self {
        MergePolicy {
            max_segments: 8,
            deleted_ratio: 0.3,
        }
    }
}

impl MergePolicy {
    /// Whether the segment set warrants a merge.
    pub fn should_merge(&self, segments: &[SegmentMeta]) -> bool {
        if segments.len() > self.max_segments {
            return true;
        }
        let total: u64 = segments.iter().map(|s| s.doc_count as u64).sum();
        if total == 0 {
            return false;
        }
        let deleted: u64 = segments.iter().map(|s| s.deleted_docs as u64).sum();
        deleted as f64 / total as f64 > self.deleted_ratio
    }
}
