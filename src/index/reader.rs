//! Point-in-time index reader.

use std::sync::Arc;

use crate::document::Document;
use crate::error::{Result, SedumError};
use crate::index::commit::CommitDescriptor;
use crate::index::postings::Term;
use crate::index::segment::SegmentReader;
use crate::schema::Schema;
use crate::storage::Storage;

/// Aggregate statistics for a reader's snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    /// Live (non-deleted) documents visible to this reader.
    pub doc_count: u64,
    /// Logically deleted documents still occupying segments.
    pub deleted_docs: u64,
    /// Number of segments in the snapshot.
    pub segment_count: usize,
    /// Commit generation the snapshot was opened at.
    pub generation: u64,
}

/// A consistent, point-in-time view of one commit.
///
/// The reader captures the commit current at open time and never observes
/// later writes; open a new reader to see them. Segment data is shared via
/// `Arc`, so a reader keeps merged-away segments readable until it drops.
#[derive(Debug)]
pub struct IndexReader {
    schema: Arc<Schema>,
    commit: CommitDescriptor,
    segments: Vec<Arc<SegmentReader>>,
}

impl IndexReader {
    /// Open a reader over the store's current commit.
    pub(crate) fn open(storage: &Arc<dyn Storage>, schema: Arc<Schema>) -> Result<Self> {
        let commit =
            CommitDescriptor::load(storage.as_ref())?.unwrap_or_else(CommitDescriptor::empty);
        let mut segments = Vec::with_capacity(commit.segments.len());
        for meta in &commit.segments {
            segments.push(Arc::new(SegmentReader::open(storage.as_ref(), meta.clone())?));
        }
        Ok(IndexReader {
            schema,
            commit,
            segments,
        })
    }

    /// The schema this reader validates queries against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The commit generation captured by this snapshot.
    pub fn generation(&self) -> u64 {
        self.commit.generation
    }

    /// The segments of the snapshot, in ascending document-ID order.
    pub fn segments(&self) -> &[Arc<SegmentReader>] {
        &self.segments
    }

    /// Number of live documents in the snapshot.
    pub fn doc_count(&self) -> u64 {
        self.segments
            .iter()
            .map(|s| s.live_doc_count() as u64)
            .sum()
    }

    /// Document frequency of `term` across all segments.
    ///
    /// Deleted-but-unmerged postings still count, which keeps scores stable
    /// for a given commit; merging re-baselines the statistic.
    pub fn doc_freq(&self, term: &Term) -> u64 {
        self.segments
            .iter()
            .filter_map(|s| s.postings(term))
            .map(|p| p.doc_freq() as u64)
            .sum()
    }

    /// Average token count of `field` over the documents that carry it.
    pub fn avg_field_length(&self, field: &str) -> f32 {
        let total: u64 = self.segments.iter().map(|s| s.total_tokens(field)).sum();
        let docs: u64 = self
            .segments
            .iter()
            .map(|s| s.docs_with_field(field) as u64)
            .sum();
        if docs == 0 {
            0.0
        } else {
            total as f32 / docs as f32
        }
    }

    /// Fetch the stored fields of a document.
    ///
    /// Fields that are indexed but not stored are absent from the result;
    /// a document whose fields are all unstored comes back empty. Deleted
    /// or unknown IDs fail with [`SedumError::NotFound`].
    pub fn document(&self, doc_id: u64) -> Result<Document> {
        for segment in &self.segments {
            if let Some(ordinal) = segment.ordinal_of(doc_id) {
                if !segment.is_live(ordinal) {
                    return Err(SedumError::NotFound(doc_id));
                }
                return Ok(segment.document(ordinal).cloned().unwrap_or_default());
            }
        }
        Err(SedumError::NotFound(doc_id))
    }

    /// Snapshot statistics.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            doc_count: self.doc_count(),
            deleted_docs: self
                .segments
                .iter()
                .map(|s| s.deleted_count() as u64)
                .sum(),
            segment_count: self.segments.len(),
            generation: self.commit.generation,
        }
    }
}
