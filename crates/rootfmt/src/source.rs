//! Byte-range source.
//!
//! Consumed, not implemented, by the format engine (spec §6): something that
//! can serve an arbitrary `[begin, end)` byte range of the underlying file.
//! Mirrors the split `outlook-pst` draws with its blanket `PstReader: Read +
//! Seek` impl, except here the trait is the seam itself rather than a marker
//! over `std::io`, since RNTuple reads are range-addressed, not stream-addressed.

use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    sync::Mutex,
};

use crate::cursor::Chunk;

pub trait ByteRangeSource: Send + Sync {
    /// Returns the bytes in `[begin, end)`, anchored at `begin`.
    fn chunk(&self, begin: u64, end: u64) -> io::Result<Chunk>;
}

/// A source backed by an in-memory buffer, used throughout this crate's tests
/// and suitable for any caller that has already mapped or loaded the file.
#[derive(Clone, Debug)]
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl ByteRangeSource for MemorySource {
    fn chunk(&self, begin: u64, end: u64) -> io::Result<Chunk> {
        let (begin_u, end_u) = (begin as usize, end as usize);
        let bytes = self.data.get(begin_u..end_u).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("range [{begin}, {end}) is outside a {}-byte buffer", self.data.len()),
            )
        })?;
        Ok(Chunk::new(begin, bytes.to_vec()))
    }
}

/// A source backed by a `File`. Reads are serialized behind a `Mutex` because
/// `Read + Seek` requires `&mut self` while `ByteRangeSource` hands out shared
/// references — the same read-only/shared/no-locking-at-the-format-layer
/// contract spec §5 describes, pushed down to the one place that truly needs
/// a lock: the OS file cursor.
pub struct FileSource {
    file: Mutex<File>,
}

impl FileSource {
    pub fn new(file: File) -> Self {
        Self {
            file: Mutex::new(file),
        }
    }
}

impl ByteRangeSource for FileSource {
    fn chunk(&self, begin: u64, end: u64) -> io::Result<Chunk> {
        let len = (end - begin) as usize;
        let mut buf = vec![0_u8; len];
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("file source mutex poisoned"))?;
        file.seek(SeekFrom::Start(begin))?;
        file.read_exact(&mut buf)?;
        Ok(Chunk::new(begin, buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_range() {
        let source = MemorySource::new((0..16_u8).collect());
        let chunk = source.chunk(4, 8).unwrap();
        assert_eq!(chunk.start(), 4);
        assert_eq!(chunk.raw_data(), &[4, 5, 6, 7]);
    }

    #[test]
    fn test_memory_source_out_of_range() {
        let source = MemorySource::new(vec![0; 4]);
        assert!(source.chunk(2, 8).is_err());
    }
}
