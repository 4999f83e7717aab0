//! Per-segment liveness tracking.
//!
//! Deletions never touch an existing segment's postings; they flip bits in
//! a bitmap kept beside the segment. Each changed bitmap is written to a
//! new generation-stamped `.del` file and the commit descriptor points at
//! the current generation, so older snapshots keep seeing their own
//! deletion state.

use bit_vec::BitVec;

use crate::error::{Result, SedumError};
use crate::storage::Storage;
use crate::storage::structured::{StructReader, StructWriter};

/// Deletion bitmap for one segment, indexed by document ordinal.
#[derive(Debug, Clone)]
pub struct LiveDocs {
    deleted: BitVec,
    deleted_count: u32,
}

impl LiveDocs {
    /// Create a bitmap with every document live.
    pub fn new(doc_count: u32) -> Self {
        LiveDocs {
            deleted: BitVec::from_elem(doc_count as usize, false),
            deleted_count: 0,
        }
    }

    /// Mark `ordinal` deleted. Returns true if it was live before.
    pub fn delete(&mut self, ordinal: u32) -> bool {
        match self.deleted.get(ordinal as usize) {
            Some(false) => {
                self.deleted.set(ordinal as usize, true);
                self.deleted_count += 1;
                true
            }
            _ => false,
        }
    }

    /// Whether `ordinal` has been deleted.
    pub fn is_deleted(&self, ordinal: u32) -> bool {
        self.deleted.get(ordinal as usize).unwrap_or(false)
    }

    /// Number of deleted documents.
    pub fn deleted_count(&self) -> u32 {
        self.deleted_count
    }

    /// Total bitmap capacity.
    pub fn doc_count(&self) -> u32 {
        self.deleted.len() as u32
    }

    /// Persist the bitmap to `name`.
    pub fn write(&self, storage: &dyn Storage, name: &str) -> Result<()> {
        let mut writer = StructWriter::new(storage.create_output(name)?);
        writer.write_u32(self.deleted.len() as u32)?;
        writer.write_bytes(&self.deleted.to_bytes())?;
        writer.close()
    }

    /// Load a bitmap from `name`, verifying it covers `doc_count` documents.
    pub fn read(storage: &dyn Storage, name: &str, doc_count: u32) -> Result<Self> {
        let mut reader = StructReader::open(storage, name)?;
        let bits = reader.read_u32()?;
        if bits != doc_count {
            return Err(SedumError::corrupt(format!(
                "deletion bitmap '{name}' covers {bits} docs, segment has {doc_count}"
            )));
        }
        let bytes = reader.read_bytes()?;
        let mut deleted = BitVec::from_bytes(&bytes);
        deleted.truncate(bits as usize);
        let deleted_count = deleted.iter().filter(|b| *b).count() as u32;
        Ok(LiveDocs {
            deleted,
            deleted_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_delete_tracking() {
        let mut live = LiveDocs::new(5);
        assert_eq!(live.deleted_count(), 0);
        assert!(live.delete(2));
        assert!(!live.delete(2)); // already deleted
        assert!(live.delete(4));
        assert_eq!(live.deleted_count(), 2);
        assert!(live.is_deleted(2));
        assert!(!live.is_deleted(0));
        // Out of range ordinals read as live, never panic.
        assert!(!live.is_deleted(99));
    }

    #[test]
    fn test_round_trip() {
        let storage = MemoryStorage::new();
        let mut live = LiveDocs::new(10);
        live.delete(0);
        live.delete(9);
        live.write(&storage, "seg_000001_1.del").unwrap();

        let back = LiveDocs::read(&storage, "seg_000001_1.del", 10).unwrap();
        assert_eq!(back.deleted_count(), 2);
        assert!(back.is_deleted(0));
        assert!(back.is_deleted(9));
        assert!(!back.is_deleted(5));
    }

    #[test]
    fn test_doc_count_mismatch() {
        let storage = MemoryStorage::new();
        let live = LiveDocs::new(4);
        live.write(&storage, "d.del").unwrap();
        assert!(matches!(
            LiveDocs::read(&storage, "d.del", 8),
            Err(SedumError::CorruptCommit(_))
        ));
    }
}
