//! Pluggable storage backends.
//!
//! Every index component is written against [`Storage`] so the same engine
//! runs on a directory of files in production and on an in-memory map in
//! tests. Outputs expose [`StorageOutput::flush_and_sync`] for durability
//! points and [`Storage::rename_file`] provides the atomic-publish step the
//! commit protocol relies on.

pub mod file;
pub mod memory;
pub mod structured;

use std::io::{Read, Write};

use crate::error::Result;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// A flat namespace of named byte files.
pub trait Storage: std::fmt::Debug + Send + Sync {
    /// Open an existing file for sequential reading.
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create (or truncate) a file for writing.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Open a file for appending, creating it if absent.
    fn create_output_append(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Whether a file with this name exists.
    fn file_exists(&self, name: &str) -> bool;

    /// Delete a file. Deleting a missing file is not an error.
    fn delete_file(&self, name: &str) -> Result<()>;

    /// Atomically rename `from` to `to`, replacing any existing `to`.
    fn rename_file(&self, from: &str, to: &str) -> Result<()>;

    /// List all file names in the store.
    fn list_files(&self) -> Result<Vec<String>>;

    /// Try to acquire an exclusive named lock.
    ///
    /// Fails with [`crate::error::SedumError::StoreLocked`] if another
    /// holder exists. The lock is released when the returned guard drops.
    fn try_lock(&self, name: &str) -> Result<Box<dyn StorageLock>>;
}

/// Sequential read access to one stored file.
pub trait StorageInput: Read + Send {
    /// Total length of the file in bytes.
    fn len(&self) -> u64;

    /// True if the file is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sequential write access to one stored file.
pub trait StorageOutput: Write + Send {
    /// Flush buffered bytes and make them durable.
    fn flush_and_sync(&mut self) -> Result<()>;
}

/// Guard for an exclusive store lock; released on drop.
pub trait StorageLock: Send {}

/// Read an entire stored file into memory.
pub(crate) fn read_file(storage: &dyn Storage, name: &str) -> Result<Vec<u8>> {
    let mut input = storage.open_input(name)?;
    let mut data = Vec::with_capacity(input.len() as usize);
    input.read_to_end(&mut data)?;
    Ok(data)
}
