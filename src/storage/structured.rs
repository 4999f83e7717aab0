//! Checksummed structured file I/O.
//!
//! Segment files and the commit descriptor are written through
//! [`StructWriter`], which frames fixed-width integers, length-prefixed byte
//! blocks and strings, and appends a CRC32 trailer over everything written.
//! [`StructReader`] verifies the trailer up front, so any torn or corrupted
//! file surfaces as an error before a single field is decoded.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Result, SedumError};
use crate::storage::{Storage, StorageOutput};

/// Writer for checksummed structured files.
pub struct StructWriter {
    out: Box<dyn StorageOutput>,
    hasher: crc32fast::Hasher,
}

impl StructWriter {
    /// Wrap a storage output.
    pub fn new(out: Box<dyn StorageOutput>) -> Self {
        StructWriter {
            out,
            hasher: crc32fast::Hasher::new(),
        }
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        use std::io::Write;
        self.hasher.update(bytes);
        self.out.write_all(bytes)?;
        Ok(())
    }

    /// Write a fixed-width u32.
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, value);
        self.write_raw(&buf)
    }

    /// Write a fixed-width u64.
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        let mut buf = [0u8; 8];
        LittleEndian::write_u64(&mut buf, value);
        self.write_raw(&buf)
    }

    /// Write a length-prefixed byte block.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u32::try_from(bytes.len())
            .map_err(|_| SedumError::index("byte block exceeds u32::MAX"))?;
        self.write_u32(len)?;
        self.write_raw(bytes)
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.write_bytes(s.as_bytes())
    }

    /// Append the CRC32 trailer and sync the file.
    pub fn close(mut self) -> Result<()> {
        use std::io::Write;
        let crc = self.hasher.clone().finalize();
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, crc);
        self.out.write_all(&buf)?;
        self.out.flush_and_sync()
    }
}

/// Reader for files produced by [`StructWriter`].
pub struct StructReader {
    data: Vec<u8>,
    pos: usize,
}

impl StructReader {
    /// Read and checksum-verify the file `name` from `storage`.
    pub fn open(storage: &dyn Storage, name: &str) -> Result<Self> {
        let data = crate::storage::read_file(storage, name)?;
        if data.len() < 4 {
            return Err(SedumError::corrupt(format!(
                "file '{name}' is too short to hold a checksum"
            )));
        }
        let payload_len = data.len() - 4;
        let expected = LittleEndian::read_u32(&data[payload_len..]);
        let actual = crc32fast::hash(&data[..payload_len]);
        if expected != actual {
            return Err(SedumError::corrupt(format!(
                "checksum mismatch in '{name}' (stored {expected:#010x}, computed {actual:#010x})"
            )));
        }
        Ok(StructReader {
            data: {
                let mut data = data;
                data.truncate(payload_len);
                data
            },
            pos: 0,
        })
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        if self.pos + n > self.data.len() {
            return Err(SedumError::corrupt("structured read past end of file"));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a fixed-width u32.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    /// Read a fixed-width u64.
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    /// Read a length-prefixed byte block.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|_| SedumError::corrupt("invalid UTF-8 in string field"))
    }

    /// True when every payload byte has been consumed.
    pub fn at_end(&self) -> bool {
        self.pos == self.data.len()
    }
}
