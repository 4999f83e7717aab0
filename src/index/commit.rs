//! Commit descriptors.
//!
//! The whole mutable state of a store (which segments are active, which
//! deletion-bitmap generation each one points at, the next document and
//! segment IDs) lives in one immutable descriptor value that is replaced
//! wholesale on every commit. Publication goes through a temporary file and
//! an atomic rename, so readers either see the previous descriptor or the
//! new one, never a partial write.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SedumError};
use crate::index::segment::SegmentMeta;
use crate::storage::Storage;
use crate::storage::structured::{StructReader, StructWriter};

/// File name of the current commit descriptor.
pub const COMMIT_FILE: &str = "commit.json";
const COMMIT_TMP_FILE: &str = "commit.json.tmp";

/// A durable snapshot of the active segment set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitDescriptor {
    /// Descriptor format version.
    pub version: u32,
    /// Monotonically increasing commit generation.
    pub generation: u64,
    /// Next global document ID to assign at flush.
    pub next_doc_id: u64,
    /// Next segment ID to assign.
    pub next_segment_id: u64,
    /// Active segments in ascending document-ID order.
    pub segments: Vec<SegmentMeta>,
}

impl CommitDescriptor {
    /// The descriptor of a brand-new, empty store.
    pub fn empty() -> Self {
        CommitDescriptor {
            version: 1,
            generation: 0,
            next_doc_id: 1,
            next_segment_id: 1,
            segments: Vec::new(),
        }
    }

    /// Load the current descriptor.
    ///
    /// Returns `Ok(None)` when the store has never been committed. A
    /// descriptor that fails its checksum, cannot be parsed, or references
    /// segment files that do not exist is reported as
    /// [`SedumError::CorruptCommit`] — never silently ignored.
    pub fn load(storage: &dyn Storage) -> Result<Option<Self>> {
        if !storage.file_exists(COMMIT_FILE) {
            return Ok(None);
        }
        let mut reader = StructReader::open(storage, COMMIT_FILE)?;
        let payload = reader.read_bytes()?;
        let descriptor: CommitDescriptor = serde_json::from_slice(&payload)
            .map_err(|e| SedumError::corrupt(format!("unreadable commit descriptor: {e}")))?;

        for segment in &descriptor.segments {
            for name in segment.file_names() {
                if !storage.file_exists(&name) {
                    return Err(SedumError::corrupt(format!(
                        "commit generation {} references missing file '{name}'",
                        descriptor.generation
                    )));
                }
            }
        }
        Ok(Some(descriptor))
    }

    /// Atomically publish this descriptor as the current commit.
    pub fn publish(&self, storage: &dyn Storage) -> Result<()> {
        let mut writer = StructWriter::new(storage.create_output(COMMIT_TMP_FILE)?);
        writer.write_bytes(&serde_json::to_vec(self)?)?;
        writer.close()?;
        storage.rename_file(COMMIT_TMP_FILE, COMMIT_FILE)?;
        log::debug!(
            "published commit generation {} ({} segments, next doc id {})",
            self.generation,
            self.segments.len(),
            self.next_doc_id
        );
        Ok(())
    }

    /// Total documents across all segments, deletions not subtracted.
    pub fn doc_count(&self) -> u64 {
        self.segments.iter().map(|s| s.doc_count as u64).sum()
    }
}
