//! TKey-style big-endian record header (spec §4.9).
//!
//! Every basket (and, in the full format, the tree record itself) is
//! prefixed by this fixed-size key header. TTree structures are big-endian
//! throughout, the opposite of the little-endian RNTuple side of this crate.

use byteorder::{BigEndian, WriteBytesExt};
use std::io::{self, Write};

/// `fNbytes, fVersion, fObjlen, fDatime, fKeylen, fCycle, fSeekKey, fSeekPdir`
/// (the "big" key format, 8-byte seek positions).
pub const KEY_HEADER_SIZE: usize = 4 + 2 + 4 + 4 + 2 + 2 + 8 + 8;

#[derive(Clone, Copy, Debug)]
pub struct KeyHeader {
    pub n_bytes: i32,
    pub version: i16,
    pub obj_len: i32,
    pub datime: u32,
    pub key_len: i16,
    pub cycle: i16,
    pub seek_key: i64,
    pub seek_pdir: i64,
}

impl KeyHeader {
    pub fn write(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_i32::<BigEndian>(self.n_bytes)?;
        w.write_i16::<BigEndian>(self.version)?;
        w.write_i32::<BigEndian>(self.obj_len)?;
        w.write_u32::<BigEndian>(self.datime)?;
        w.write_i16::<BigEndian>(self.key_len)?;
        w.write_i16::<BigEndian>(self.cycle)?;
        w.write_i64::<BigEndian>(self.seek_key)?;
        w.write_i64::<BigEndian>(self.seek_pdir)?;
        Ok(())
    }
}

/// Writes a length-prefixed (1-byte length, for strings under 255 bytes)
/// ROOT TString, the `uproot.serialization.string` helper's wire format.
pub fn write_tstring(w: &mut impl Write, s: &str) -> io::Result<()> {
    let bytes = s.as_bytes();
    assert!(bytes.len() < 255, "long-string TString encoding is not implemented");
    w.write_u8(bytes.len() as u8)?;
    w.write_all(bytes)?;
    Ok(())
}

pub fn tstring_len(s: &str) -> usize {
    1 + s.len()
}

/// ROOT's "current year since 1995, 5-bit month/day/hour/minute/sec-halves"
/// packed datime. Callers pass the pieces in rather than reading the clock,
/// keeping this crate's writer deterministic and free of a `SystemTime`
/// dependency the teacher's own stack never pulls in.
pub fn pack_datime(year: u32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> u32 {
    ((year.saturating_sub(1995)) << 26) | (month << 22) | (day << 17) | (hour << 12) | (min << 6) | (sec / 2)
}
