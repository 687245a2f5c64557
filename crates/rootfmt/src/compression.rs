//! Decompression.
//!
//! Compression codecs are external collaborators (spec §1/§6): the format
//! engine only ever calls [`Decompressor::decompress`] with a compressed
//! buffer and the uncompressed size the footer/envelope already promised.
//! Concrete codecs live behind Cargo features, the same optional-backend-per-
//! codec shape `parquet2` uses for its own pluggable compression set.

use std::io::{self, Read};

use thiserror::Error;

/// RNTuple locators do not carry the codec id directly — it comes from the
/// header's writer-chosen compression settings, which this crate's reader
/// surface accepts as configuration (see [`crate::ReaderOptions`]) rather
/// than parsing, since the settings byte is emitted by the writer out of
/// this crate's scope. The identifiers below follow ROOT's on-disk
/// convention for the high nibble of `fCompressionSettings`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Codec {
    None = 0,
    Zlib = 1,
    Lz4 = 4,
    Zstd = 5,
}

impl Codec {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Codec::None),
            1 => Some(Codec::Zlib),
            4 => Some(Codec::Lz4),
            5 => Some(Codec::Zstd),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("codec id {0} is not recognized")]
    UnknownCodec(u8),
    #[error("codec {0:?} support was not compiled in (enable its Cargo feature)")]
    CodecNotEnabled(Codec),
    #[error("decompression produced {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub trait Decompressor: Send + Sync {
    fn decompress(&self, compressed: &[u8], uncompressed_size: usize) -> Result<Vec<u8>, CompressionError>;
}

/// Dispatches to a [`Decompressor`] by [`Codec`] id, the registry the reader
/// is parameterized over (spec §1a "compression codecs as a registry, not a
/// hardcode").
pub struct CodecRegistry {
    zlib: Option<Box<dyn Decompressor>>,
    zstd: Option<Box<dyn Decompressor>>,
    lz4: Option<Box<dyn Decompressor>>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self {
            #[cfg(feature = "zlib")]
            zlib: Some(Box::new(ZlibDecompressor)),
            #[cfg(not(feature = "zlib"))]
            zlib: None,
            #[cfg(feature = "zstd")]
            zstd: Some(Box::new(ZstdDecompressor)),
            #[cfg(not(feature = "zstd"))]
            zstd: None,
            #[cfg(feature = "lz4")]
            lz4: Some(Box::new(Lz4Decompressor)),
            #[cfg(not(feature = "lz4"))]
            lz4: None,
        }
    }
}

impl CodecRegistry {
    pub fn decompress(
        &self,
        codec: Codec,
        compressed: &[u8],
        uncompressed_size: usize,
    ) -> Result<Vec<u8>, CompressionError> {
        let backend = match codec {
            Codec::None => return Ok(compressed.to_vec()),
            Codec::Zlib => self.zlib.as_deref(),
            Codec::Zstd => self.zstd.as_deref(),
            Codec::Lz4 => self.lz4.as_deref(),
        }
        .ok_or(CompressionError::CodecNotEnabled(codec))?;

        let out = backend.decompress(compressed, uncompressed_size)?;
        if out.len() != uncompressed_size {
            return Err(CompressionError::SizeMismatch {
                expected: uncompressed_size,
                actual: out.len(),
            });
        }
        Ok(out)
    }
}

#[cfg(feature = "zlib")]
struct ZlibDecompressor;

#[cfg(feature = "zlib")]
impl Decompressor for ZlibDecompressor {
    fn decompress(&self, compressed: &[u8], uncompressed_size: usize) -> Result<Vec<u8>, CompressionError> {
        let mut out = Vec::with_capacity(uncompressed_size);
        flate2::read::ZlibDecoder::new(compressed).read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(feature = "zstd")]
struct ZstdDecompressor;

#[cfg(feature = "zstd")]
impl Decompressor for ZstdDecompressor {
    fn decompress(&self, compressed: &[u8], uncompressed_size: usize) -> Result<Vec<u8>, CompressionError> {
        let mut out = Vec::with_capacity(uncompressed_size);
        zstd::stream::read::Decoder::new(compressed)?.read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(feature = "lz4")]
struct Lz4Decompressor;

#[cfg(feature = "lz4")]
impl Decompressor for Lz4Decompressor {
    fn decompress(&self, compressed: &[u8], uncompressed_size: usize) -> Result<Vec<u8>, CompressionError> {
        lz4_flex::decompress(compressed, uncompressed_size)
            .map_err(|err| CompressionError::Io(io::Error::other(err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_codec_is_identity() {
        let registry = CodecRegistry::default();
        let out = registry.decompress(Codec::None, b"raw bytes", 9).unwrap();
        assert_eq!(out, b"raw bytes");
    }

    #[test]
    fn test_codec_from_id() {
        assert_eq!(Codec::from_id(1), Some(Codec::Zlib));
        assert_eq!(Codec::from_id(200), None);
    }

    #[cfg(feature = "zlib")]
    #[test]
    fn test_zlib_round_trip() {
        use std::io::Write;
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"hello hello hello").unwrap();
        let compressed = encoder.finish().unwrap();

        let registry = CodecRegistry::default();
        let out = registry
            .decompress(Codec::Zlib, &compressed, b"hello hello hello".len())
            .unwrap();
        assert_eq!(out, b"hello hello hello");
    }
}
