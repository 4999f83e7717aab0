//! Filesystem-backed storage.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, SedumError};
use crate::storage::{Storage, StorageInput, StorageLock, StorageOutput};

/// Storage rooted at a single directory.
///
/// File names must be plain names without path separators; everything the
/// index writes lives flat inside the root directory.
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open storage at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(FileStorage { root })
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(SedumError::index(format!("invalid file name '{name}'")));
        }
        Ok(self.root.join(name))
    }
}

impl Storage for FileStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let path = self.path_for(name)?;
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        Ok(Box::new(FileInput {
            reader: BufReader::new(file),
            len,
        }))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        let path = self.path_for(name)?;
        let file = File::create(&path)?;
        Ok(Box::new(FileOutput {
            writer: BufWriter::new(file),
        }))
    }

    fn create_output_append(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        let path = self.path_for(name)?;
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Box::new(FileOutput {
            writer: BufWriter::new(file),
        }))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.path_for(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn rename_file(&self, from: &str, to: &str) -> Result<()> {
        let from = self.path_for(from)?;
        let to = self.path_for(to)?;
        std::fs::rename(&from, &to)?;
        // Make the rename itself durable.
        if let Ok(dir) = File::open(&self.root) {
            let _ = dir.sync_all();
        }
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file()
                && let Some(name) = entry.file_name().to_str()
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn try_lock(&self, name: &str) -> Result<Box<dyn StorageLock>> {
        let path = self.path_for(name)?;
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Box::new(FileLock { path })),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(SedumError::locked(
                format!("lock file '{name}' is held by another writer"),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

struct FileInput {
    reader: BufReader<File>,
    len: u64,
}

impl Read for FileInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl StorageInput for FileInput {
    fn len(&self) -> u64 {
        self.len
    }
}

struct FileOutput {
    writer: BufWriter<File>,
}

impl Write for FileOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl StorageOutput for FileOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }
}

struct FileLock {
    path: PathBuf,
}

impl StorageLock for FileLock {}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!("failed to remove lock file {:?}: {e}", self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        let mut out = storage.create_output("data.bin").unwrap();
        out.write_all(b"hello storage").unwrap();
        out.flush_and_sync().unwrap();
        drop(out);

        let mut input = storage.open_input("data.bin").unwrap();
        assert_eq!(input.len(), 13);
        let mut data = Vec::new();
        input.read_to_end(&mut data).unwrap();
        assert_eq!(data, b"hello storage");
    }

    #[test]
    fn test_append() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        let mut out = storage.create_output_append("log").unwrap();
        out.write_all(b"one").unwrap();
        out.flush_and_sync().unwrap();
        drop(out);

        let mut out = storage.create_output_append("log").unwrap();
        out.write_all(b"two").unwrap();
        out.flush_and_sync().unwrap();
        drop(out);

        let data = crate::storage::read_file(&storage, "log").unwrap();
        assert_eq!(data, b"onetwo");
    }

    #[test]
    fn test_rename_replaces() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        let mut out = storage.create_output("a").unwrap();
        out.write_all(b"new").unwrap();
        out.flush_and_sync().unwrap();
        drop(out);

        let mut out = storage.create_output("b").unwrap();
        out.write_all(b"old").unwrap();
        out.flush_and_sync().unwrap();
        drop(out);

        storage.rename_file("a", "b").unwrap();
        assert!(!storage.file_exists("a"));
        assert_eq!(crate::storage::read_file(&storage, "b").unwrap(), b"new");
    }

    #[test]
    fn test_lock_exclusive() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        let guard = storage.try_lock("write.lock").unwrap();
        assert!(matches!(
            storage.try_lock("write.lock"),
            Err(SedumError::StoreLocked(_))
        ));
        drop(guard);
        // Released on drop; can be taken again.
        storage.try_lock("write.lock").unwrap();
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.delete_file("nope").unwrap();
    }

    #[test]
    fn test_rejects_path_separators() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        assert!(storage.create_output("../escape").is_err());
    }
}
