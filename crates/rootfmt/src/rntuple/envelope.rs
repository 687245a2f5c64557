//! Envelope and frame codec (spec §4.1/§4.2).
//!
//! Three framing primitives nest inside one another throughout RNTuple:
//! the *envelope* (version header + payload + trailing CRC32), the *record
//! frame* (`u32` size prefix, fixed payload), and the *list frame* (negative
//! `i32` size, `i32` count, then that many payloads). All three are
//! little-endian, unlike the big-endian TTree side of this crate — mirrors
//! the endian split `outlook-pst` draws between its NDB big-endian CRCs and
//! little-endian page payloads.

use thiserror::Error;

use crate::crc::compute_crc32;
use crate::cursor::{Chunk, Cursor, CursorError};
use crate::source::ByteRangeSource;

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error(transparent)]
    Cursor(#[from] CursorError),
    #[error("list frame size {0} is not negative (a record frame appeared where a list was expected)")]
    ListFrameNotNegative(i32),
    #[error("locator has a negative num_bytes ({0}); non-disk locators are unsupported")]
    NegativeLocator(i32),
    #[error("envelope checksum mismatch: computed 0x{computed:08X}, stored 0x{stored:08X}")]
    ChecksumMismatch { computed: u32, stored: u32 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Compression(#[from] crate::compression::CompressionError),
}

pub type EnvelopeResult<T> = Result<T, EnvelopeError>;

/// A contiguous byte range in the file (spec §3/§6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Locator {
    pub num_bytes: u32,
    pub offset: u64,
}

impl Locator {
    pub fn read(cursor: &mut Cursor, chunk: &Chunk) -> EnvelopeResult<Self> {
        let num_bytes = cursor.read_i32(chunk)?;
        if num_bytes < 0 {
            return Err(EnvelopeError::NegativeLocator(num_bytes));
        }
        let offset = cursor.read_u64(chunk)?;
        Ok(Locator {
            num_bytes: num_bytes as u32,
            offset,
        })
    }

    /// Fetches the on-disk bytes this locator addresses, decompressing them
    /// if `uncompressed_size` exceeds what the locator stores.
    pub fn fetch(
        &self,
        source: &dyn ByteRangeSource,
        uncompressed_size: u32,
        codecs: &crate::compression::CodecRegistry,
        codec: crate::compression::Codec,
    ) -> EnvelopeResult<Vec<u8>> {
        let chunk = source.chunk(self.offset, self.offset + self.num_bytes as u64)?;
        if self.num_bytes == uncompressed_size {
            Ok(chunk.raw_data().to_vec())
        } else {
            Ok(codecs.decompress(codec, chunk.raw_data(), uncompressed_size as usize)?)
        }
    }
}

/// `{uncompressed_size, locator}` (spec §3).
#[derive(Clone, Copy, Debug)]
pub struct EnvelopeLink {
    pub uncompressed_size: u32,
    pub locator: Locator,
}

impl EnvelopeLink {
    pub fn read(cursor: &mut Cursor, chunk: &Chunk) -> EnvelopeResult<Self> {
        let uncompressed_size = cursor.read_u32(chunk)?;
        let locator = Locator::read(cursor, chunk)?;
        Ok(EnvelopeLink {
            uncompressed_size,
            locator,
        })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct EnvelopeHeader {
    pub env_version: u16,
    pub min_version: u16,
}

/// Reads a record frame header and returns an inner cursor positioned at the
/// payload start, having advanced `cursor` past the whole frame (spec §4.1).
pub fn read_record_frame(cursor: &mut Cursor, chunk: &Chunk) -> EnvelopeResult<Cursor> {
    let frame_start = cursor.pos();
    let mut inner = cursor.copy();
    let size = inner.read_u32(chunk)?;
    cursor.move_to(frame_start + size as u64);
    Ok(inner)
}

/// Reads a list frame header and returns `(inner cursor at first item, item
/// count)`, having advanced `cursor` past the whole frame (spec §4.1).
pub fn read_list_frame(cursor: &mut Cursor, chunk: &Chunk) -> EnvelopeResult<(Cursor, usize)> {
    let frame_start = cursor.pos();
    let mut inner = cursor.copy();
    let size = inner.read_i32(chunk)?;
    if size >= 0 {
        return Err(EnvelopeError::ListFrameNotNegative(size));
    }
    let count = inner.read_i32(chunk)?;
    cursor.move_to(frame_start + (-size) as u64);
    Ok((inner, count.max(0) as usize))
}

/// Reads a list of items, each itself wrapped in its own record frame — the
/// shape every field/column/alias/extra-type-info list uses (spec §4.3).
pub fn read_list_of_records<T>(
    cursor: &mut Cursor,
    chunk: &Chunk,
    mut read_item: impl FnMut(&mut Cursor, &Chunk) -> EnvelopeResult<T>,
) -> EnvelopeResult<Vec<T>> {
    let (mut inner, count) = read_list_frame(cursor, chunk)?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        let mut record = read_record_frame(&mut inner, chunk)?;
        items.push(read_item(&mut record, chunk)?);
    }
    Ok(items)
}

/// Parses an envelope buffer already fetched (and decompressed if
/// necessary): `{env_version, min_version} + payload + CRC32` (spec §4.2).
pub fn read_envelope<T>(
    buf: &[u8],
    base_offset: u64,
    parse_payload: impl FnOnce(&mut Cursor, &Chunk) -> EnvelopeResult<T>,
) -> EnvelopeResult<(T, EnvelopeHeader)> {
    if buf.len() < 8 + 4 {
        return Err(EnvelopeError::Cursor(CursorError::UnexpectedEof {
            pos: base_offset,
            need: 12,
            end: base_offset + buf.len() as u64,
        }));
    }
    let chunk = Chunk::new(base_offset, buf.to_vec());
    let mut cursor = Cursor::new(base_offset);
    let env_version = cursor.read_u16(&chunk)?;
    let min_version = cursor.read_u16(&chunk)?;

    let payload = parse_payload(&mut cursor, &chunk)?;

    let stored = u32::from_le_bytes(buf[buf.len() - 4..].try_into().unwrap());
    let computed = compute_crc32(0, &buf[..buf.len() - 4]);
    if computed != stored {
        return Err(EnvelopeError::ChecksumMismatch { computed, stored });
    }

    Ok((
        payload,
        EnvelopeHeader {
            env_version,
            min_version,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    #[test]
    fn test_locator_rejects_negative_num_bytes() {
        let chunk = Chunk::new(0, vec![0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut cursor = Cursor::new(0);
        assert!(matches!(
            Locator::read(&mut cursor, &chunk),
            Err(EnvelopeError::NegativeLocator(-1))
        ));
    }

    #[test]
    fn test_record_frame_skips_whole_frame() {
        // size=12 (u32) then 8 bytes of payload; a trailing byte must be untouched.
        let data = vec![12, 0, 0, 0, 0xAA, 0xBB, 0xCC, 0xDD, 0, 0, 0, 0, 0xEE];
        let chunk = Chunk::new(0, data);
        let mut cursor = Cursor::new(0);
        let mut inner = read_record_frame(&mut cursor, &chunk).unwrap();
        assert_eq!(cursor.pos(), 12);
        assert_eq!(inner.read_u8(&chunk).unwrap(), 0xAA);
    }

    #[test]
    fn test_list_frame_rejects_positive_size() {
        let data = vec![5, 0, 0, 0, 0, 0, 0, 0];
        let chunk = Chunk::new(0, data);
        let mut cursor = Cursor::new(0);
        assert!(matches!(
            read_list_frame(&mut cursor, &chunk),
            Err(EnvelopeError::ListFrameNotNegative(5))
        ));
    }

    #[test]
    fn test_list_frame_reads_count_and_skips() {
        // size = -12 (i32 LE), count = 2, 4 bytes of items.
        let mut data = (-12_i32).to_le_bytes().to_vec();
        data.extend_from_slice(&2_i32.to_le_bytes());
        data.extend_from_slice(&[1, 2, 3, 4]);
        data.push(0xFF);
        let chunk = Chunk::new(0, data);
        let mut cursor = Cursor::new(0);
        let (mut inner, count) = read_list_frame(&mut cursor, &chunk).unwrap();
        assert_eq!(count, 2);
        assert_eq!(cursor.pos(), 12);
        assert_eq!(inner.read_u8(&chunk).unwrap(), 1);
    }

    #[test]
    fn test_envelope_round_trip_checksum() {
        let mut buf = vec![1, 0, 0, 0]; // env_version=1, min_version=0
        buf.extend_from_slice(&42_u32.to_le_bytes()); // payload: one u32
        let crc = compute_crc32(0, &buf);
        buf.extend_from_slice(&crc.to_le_bytes());

        let (value, header) = read_envelope(&buf, 0, |cursor, chunk| Ok(cursor.read_u32(chunk)?)).unwrap();
        assert_eq!(value, 42);
        assert_eq!(header.env_version, 1);
    }

    #[test]
    fn test_envelope_checksum_mismatch() {
        let mut buf = vec![1, 0, 0, 0];
        buf.extend_from_slice(&42_u32.to_le_bytes());
        buf.extend_from_slice(&0_u32.to_le_bytes());
        assert!(matches!(
            read_envelope(&buf, 0, |cursor, chunk| Ok(cursor.read_u32(chunk)?)),
            Err(EnvelopeError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_locator_fetch_uncompressed() {
        let source = MemorySource::new((0..20_u8).collect());
        let locator = Locator {
            num_bytes: 4,
            offset: 4,
        };
        let codecs = crate::compression::CodecRegistry::default();
        let out = locator
            .fetch(&source, 4, &codecs, crate::compression::Codec::None)
            .unwrap();
        assert_eq!(out, vec![4, 5, 6, 7]);
    }
}
