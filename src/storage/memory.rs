//! In-memory storage for tests and ephemeral indexes.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, SedumError};
use crate::storage::{Storage, StorageInput, StorageLock, StorageOutput};

type FileMap = Arc<Mutex<HashMap<String, Arc<Vec<u8>>>>>;
type LockSet = Arc<Mutex<HashSet<String>>>;

/// Storage keeping all files in a shared in-memory map.
///
/// Clones share the same underlying files, so a writer and readers created
/// from clones of one `MemoryStorage` observe the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    files: FileMap,
    locks: LockSet,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }
}

impl Storage for MemoryStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let files = self.files.lock();
        let data = files.get(name).cloned().ok_or_else(|| {
            SedumError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file '{name}'"),
            ))
        })?;
        Ok(Box::new(MemoryInput { data, pos: 0 }))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        Ok(Box::new(MemoryOutput {
            name: name.to_string(),
            buf: Vec::new(),
            files: Arc::clone(&self.files),
        }))
    }

    fn create_output_append(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        let existing = self
            .files
            .lock()
            .get(name)
            .map(|d| d.as_ref().clone())
            .unwrap_or_default();
        Ok(Box::new(MemoryOutput {
            name: name.to_string(),
            buf: existing,
            files: Arc::clone(&self.files),
        }))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.files.lock().contains_key(name)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.files.lock().remove(name);
        Ok(())
    }

    fn rename_file(&self, from: &str, to: &str) -> Result<()> {
        let mut files = self.files.lock();
        let data = files.remove(from).ok_or_else(|| {
            SedumError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file '{from}'"),
            ))
        })?;
        files.insert(to.to_string(), data);
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.files.lock().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn try_lock(&self, name: &str) -> Result<Box<dyn StorageLock>> {
        let mut locks = self.locks.lock();
        if !locks.insert(name.to_string()) {
            return Err(SedumError::locked(format!(
                "lock '{name}' is held by another writer"
            )));
        }
        Ok(Box::new(MemoryLock {
            name: name.to_string(),
            locks: Arc::clone(&self.locks),
        }))
    }
}

struct MemoryInput {
    data: Arc<Vec<u8>>,
    pos: usize,
}

impl Read for MemoryInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = &self.data[self.pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl StorageInput for MemoryInput {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }
}

struct MemoryOutput {
    name: String,
    buf: Vec<u8>,
    files: FileMap,
}

impl MemoryOutput {
    fn publish(&mut self) {
        self.files
            .lock()
            .insert(self.name.clone(), Arc::new(self.buf.clone()));
    }
}

impl std::io::Write for MemoryOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.publish();
        Ok(())
    }
}

impl StorageOutput for MemoryOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.publish();
        Ok(())
    }
}

impl Drop for MemoryOutput {
    fn drop(&mut self) {
        self.publish();
    }
}

struct MemoryLock {
    name: String,
    locks: LockSet,
}

impl StorageLock for MemoryLock {}

impl Drop for MemoryLock {
    fn drop(&mut self) {
        self.locks.lock().remove(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_round_trip() {
        let storage = MemoryStorage::new();
        let mut out = storage.create_output("f").unwrap();
        out.write_all(b"abc").unwrap();
        out.flush_and_sync().unwrap();
        drop(out);

        let data = crate::storage::read_file(&storage, "f").unwrap();
        assert_eq!(data, b"abc");
    }

    #[test]
    fn test_clones_share_files() {
        let storage = MemoryStorage::new();
        let clone = storage.clone();

        let mut out = storage.create_output("shared").unwrap();
        out.write_all(b"x").unwrap();
        drop(out);

        assert!(clone.file_exists("shared"));
    }

    #[test]
    fn test_append_preserves_existing() {
        let storage = MemoryStorage::new();
        let mut out = storage.create_output_append("log").unwrap();
        out.write_all(b"one").unwrap();
        drop(out);
        let mut out = storage.create_output_append("log").unwrap();
        out.write_all(b"two").unwrap();
        drop(out);

        assert_eq!(
            crate::storage::read_file(&storage, "log").unwrap(),
            b"onetwo"
        );
    }

    #[test]
    fn test_lock_exclusive() {
        let storage = MemoryStorage::new();
        let guard = storage.try_lock("write.lock").unwrap();
        assert!(storage.try_lock("write.lock").is_err());
        drop(guard);
        storage.try_lock("write.lock").unwrap();
    }

    #[test]
    fn test_missing_file() {
        let storage = MemoryStorage::new();
        assert!(storage.open_input("missing").is_err());
        assert!(!storage.file_exists("missing"));
    }
}
