//! Chunk & Cursor.
//!
//! A [`Chunk`] is an immutable byte window fetched from a [`crate::source::ByteRangeSource`]
//! at a known absolute file offset. A [`Cursor`] is a lightweight, `Copy`-able
//! absolute file position; every typed read takes the chunk it reads from
//! explicitly, so a cursor can be copied to look ahead and discarded without
//! disturbing the original read position — the same split `outlook-pst` draws
//! between a `Read + Seek` source and the free-standing offsets its readers
//! pass around by value.

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CursorError {
    #[error("cursor position 0x{pos:X} is outside chunk [0x{start:X}, 0x{end:X})")]
    OutOfRange { pos: u64, start: u64, end: u64 },
    #[error("read of {need} bytes at 0x{pos:X} would overrun chunk ending at 0x{end:X}")]
    UnexpectedEof { pos: u64, need: usize, end: u64 },
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,
}

pub type CursorResult<T> = Result<T, CursorError>;

/// An immutable byte window, anchored at an absolute file offset.
#[derive(Clone, Debug)]
pub struct Chunk {
    start: u64,
    data: Box<[u8]>,
}

impl Chunk {
    pub fn new(start: u64, data: impl Into<Box<[u8]>>) -> Self {
        Self {
            start,
            data: data.into(),
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.start + self.data.len() as u64
    }

    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }

    /// Translates an absolute file offset into a byte slice of at least `len`
    /// bytes, or fails if the read would step outside this chunk's window.
    fn slice(&self, pos: u64, len: usize) -> CursorResult<&[u8]> {
        if pos < self.start || pos > self.end() {
            return Err(CursorError::OutOfRange {
                pos,
                start: self.start,
                end: self.end(),
            });
        }
        let local = (pos - self.start) as usize;
        self.data
            .get(local..local + len)
            .ok_or(CursorError::UnexpectedEof {
                pos,
                need: len,
                end: self.end(),
            })
    }
}

/// An in-chunk cursor: an absolute file position that advances as fields are
/// consumed. Cheap to copy, so look-ahead is just `cursor.copy()`.
#[derive(Clone, Copy, Debug)]
pub struct Cursor {
    pos: u64,
}

impl Cursor {
    pub fn new(pos: u64) -> Self {
        Self { pos }
    }

    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Returns an independent cursor at the same position.
    pub fn copy(&self) -> Self {
        *self
    }

    pub fn move_to(&mut self, pos: u64) {
        self.pos = pos;
    }

    pub fn skip(&mut self, n: u64) {
        self.pos += n;
    }

    fn take<'a>(&mut self, chunk: &'a Chunk, len: usize) -> CursorResult<&'a [u8]> {
        let bytes = chunk.slice(self.pos, len)?;
        self.pos += len as u64;
        Ok(bytes)
    }

    pub fn read_bytes(&mut self, chunk: &Chunk, len: usize) -> CursorResult<Vec<u8>> {
        Ok(self.take(chunk, len)?.to_vec())
    }

    pub fn read_u8(&mut self, chunk: &Chunk) -> CursorResult<u8> {
        Ok(self.take(chunk, 1)?[0])
    }

    pub fn read_u16(&mut self, chunk: &Chunk) -> CursorResult<u16> {
        Ok(LittleEndian::read_u16(self.take(chunk, 2)?))
    }

    pub fn read_u32(&mut self, chunk: &Chunk) -> CursorResult<u32> {
        Ok(LittleEndian::read_u32(self.take(chunk, 4)?))
    }

    pub fn read_i32(&mut self, chunk: &Chunk) -> CursorResult<i32> {
        Ok(LittleEndian::read_i32(self.take(chunk, 4)?))
    }

    pub fn read_u64(&mut self, chunk: &Chunk) -> CursorResult<u64> {
        Ok(LittleEndian::read_u64(self.take(chunk, 8)?))
    }

    pub fn read_i64(&mut self, chunk: &Chunk) -> CursorResult<i64> {
        Ok(LittleEndian::read_i64(self.take(chunk, 8)?))
    }

    /// Reads a length-prefixed (`u32`) UTF-8 string, the encoding every
    /// RNTuple header/footer string field uses.
    pub fn read_string(&mut self, chunk: &Chunk) -> CursorResult<String> {
        let len = self.read_u32(chunk)? as usize;
        let bytes = self.take(chunk, len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CursorError::InvalidUtf8)
    }
}
