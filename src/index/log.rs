//! Write-ahead log for uncommitted writer operations.
//!
//! Every mutating call on the writer appends exactly one record before it
//! touches the in-memory buffer, so an update (delete-then-insert) is a
//! single durable unit: replay after a crash either applies the whole
//! replacement or none of it. The log is truncated once a commit has made
//! its effects durable elsewhere.
//!
//! ## File format
//!
//! `[u32: length][json: LogRecord][u32: crc32]` repeated, each record
//! followed by a sync. Replay stops at the first torn or corrupt record —
//! the expected artifact of a crash mid-append.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::Result;
use crate::storage::{Storage, StorageOutput};

/// File name of the writer's log.
pub const WAL_FILE: &str = "write.log";

/// A log record: the commit generation it was appended on top of, plus
/// the operation itself. Replay skips records whose base generation
/// predates the current commit — the artifact of a crash that landed
/// between publishing a commit and truncating the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub generation: u64,
    pub entry: WalRecord,
}

/// One durable writer operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WalRecord {
    /// Buffer a new document.
    Add { document: Document },
    /// Logically delete every document whose `field` contains `token`.
    Delete { field: String, token: String },
    /// Replace documents matching `(field, token)` with `document`,
    /// atomically from the caller's point of view.
    Replace {
        field: String,
        token: String,
        document: Document,
    },
    /// Drop every document in the store.
    DeleteAll,
}

/// Append-only writer log.
pub struct WriteAheadLog {
    out: Option<Box<dyn StorageOutput>>,
}

impl std::fmt::Debug for WriteAheadLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteAheadLog")
            .field("open", &self.out.is_some())
            .finish()
    }
}

impl WriteAheadLog {
    /// Create a handle; the file is opened lazily on first append.
    pub fn new() -> Self {
        WriteAheadLog { out: None }
    }

    /// Append one record and sync it to durable storage.
    pub fn append(
        &mut self,
        storage: &dyn Storage,
        generation: u64,
        entry: &WalRecord,
    ) -> Result<()> {
        if self.out.is_none() {
            self.out = Some(storage.create_output_append(WAL_FILE)?);
        }

        let record = LogRecord {
            generation,
            entry: entry.clone(),
        };
        let payload = serde_json::to_vec(&record)?;
        let mut header = [0u8; 4];
        LittleEndian::write_u32(&mut header, payload.len() as u32);
        let mut trailer = [0u8; 4];
        LittleEndian::write_u32(&mut trailer, crc32fast::hash(&payload));

        use std::io::Write;
        if let Some(out) = self.out.as_mut() {
            out.write_all(&header)?;
            out.write_all(&payload)?;
            out.write_all(&trailer)?;
            out.flush_and_sync()?;
        }
        Ok(())
    }

    /// Read every intact record from the log.
    ///
    /// A truncated or checksum-failing tail ends replay with a warning; the
    /// records before it are returned.
    pub fn read_all(storage: &dyn Storage) -> Result<Vec<LogRecord>> {
        if !storage.file_exists(WAL_FILE) {
            return Ok(Vec::new());
        }
        let data = crate::storage::read_file(storage, WAL_FILE)?;
        let mut records = Vec::new();
        let mut pos = 0;
        while pos + 4 <= data.len() {
            let len = LittleEndian::read_u32(&data[pos..]) as usize;
            let payload_start = pos + 4;
            let trailer_end = payload_start + len + 4;
            if trailer_end > data.len() {
                log::warn!("write log ends with a torn record; discarding the tail");
                break;
            }
            let payload = &data[payload_start..payload_start + len];
            let stored_crc = LittleEndian::read_u32(&data[payload_start + len..]);
            if crc32fast::hash(payload) != stored_crc {
                log::warn!("write log record failed its checksum; discarding the tail");
                break;
            }
            match serde_json::from_slice(payload) {
                Ok(record) => records.push(record),
                Err(e) => {
                    log::warn!("unparseable write log record ({e}); discarding the tail");
                    break;
                }
            }
            pos = trailer_end;
        }
        Ok(records)
    }

    /// Discard the log after a successful commit or rollback.
    pub fn clear(&mut self, storage: &dyn Storage) -> Result<()> {
        self.out = None;
        storage.delete_file(WAL_FILE)
    }
}

impl Default for WriteAheadLog {
    fn default() -> Self {
        WriteAheadLog::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_append_and_replay() {
        let storage = MemoryStorage::new();
        let mut wal = WriteAheadLog::new();
        wal.append(
            &storage,
            3,
            &WalRecord::Add {
                document: Document::new().add_text("title", "one"),
            },
        )
        .unwrap();
        wal.append(
            &storage,
            3,
            &WalRecord::Delete {
                field: "title".into(),
                token: "one".into(),
            },
        )
        .unwrap();

        let records = WriteAheadLog::read_all(&storage).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].generation, 3);
        assert!(matches!(records[0].entry, WalRecord::Add { .. }));
        assert!(matches!(records[1].entry, WalRecord::Delete { .. }));
    }

    #[test]
    fn test_torn_tail_is_discarded() {
        let storage = MemoryStorage::new();
        let mut wal = WriteAheadLog::new();
        wal.append(
            &storage,
            0,
            &WalRecord::Add {
                document: Document::new().add_text("a", "b"),
            },
        )
        .unwrap();
        wal.append(&storage, 0, &WalRecord::DeleteAll).unwrap();

        // Simulate a crash mid-append of a third record.
        let mut data = crate::storage::read_file(&storage, WAL_FILE).unwrap();
        data.extend_from_slice(&[9, 0, 0, 0, b'{']);
        use std::io::Write;
        let mut out = storage.create_output(WAL_FILE).unwrap();
        out.write_all(&data).unwrap();
        drop(out);

        let records = WriteAheadLog::read_all(&storage).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_clear_removes_log() {
        let storage = MemoryStorage::new();
        let mut wal = WriteAheadLog::new();
        wal.append(&storage, 0, &WalRecord::DeleteAll).unwrap();
        wal.clear(&storage).unwrap();
        assert!(!storage.file_exists(WAL_FILE));
        assert!(WriteAheadLog::read_all(&storage).unwrap().is_empty());
    }
}
