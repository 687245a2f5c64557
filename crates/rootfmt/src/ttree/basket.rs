//! Basket emission (spec §4.9).
//!
//! A basket is a self-describing TKey-headed record: key header, three
//! TStrings (class/name/title), a basket sub-header, a trailing zero byte
//! considered part of the key, then the payload. Flat and jagged baskets
//! share everything but the payload shape.

use byteorder::{BigEndian, WriteBytesExt};
use std::io::{self, Write};

use crate::ttree::key::{self, KeyHeader, KEY_HEADER_SIZE};
use crate::ttree::sink::{Sink, SinkResult};

/// `fVersion, fBufferSize, fNevBufSize, fNevBuf, fLast` (spec §4.9).
const TBASKET_SUBHEADER_SIZE: usize = 2 + 4 + 4 + 4 + 4;
const DEFAULT_BUFFER_SIZE: i32 = 32000;
const BASKET_KEY_VERSION: i16 = 1004;

fn tbasket_subheader(w: &mut impl Write, buffer_size: i32, nev_buf_size: i32, nev_buf: i32, last: i32) -> io::Result<()> {
    w.write_i16::<BigEndian>(3)?; // fVersion
    w.write_i32::<BigEndian>(buffer_size)?;
    w.write_i32::<BigEndian>(nev_buf_size)?;
    w.write_i32::<BigEndian>(nev_buf)?;
    w.write_i32::<BigEndian>(last)?;
    Ok(())
}

fn key_len(class_name: &str, branch_name: &str, tree_title: &str) -> usize {
    KEY_HEADER_SIZE + key::tstring_len(class_name) + key::tstring_len(branch_name) + key::tstring_len(tree_title)
        + TBASKET_SUBHEADER_SIZE
        + 1 // the trailing zero byte, counted as part of the key
}

pub struct FlatBasketResult {
    pub n_bytes: i32,
    pub location: u64,
}

/// Writes a flat (non-jagged) basket: big-endian row-major data bytes,
/// nothing else (spec §4.9).
#[allow(clippy::too_many_arguments)]
pub fn write_flat_basket(
    sink: &mut dyn Sink,
    branch_name: &str,
    tree_title: &str,
    parent_location: i64,
    datime: u32,
    itemsize: i32,
    n_entries: i32,
    data_be: &[u8],
) -> SinkResult<FlatBasketResult> {
    let key_len = key_len("TBasket", branch_name, tree_title);
    let obj_len = data_be.len();
    let n_bytes = (key_len + obj_len) as i32;
    let location = sink.allocate(n_bytes as u64);

    let mut out = Vec::with_capacity(n_bytes as usize);
    KeyHeader {
        n_bytes,
        version: BASKET_KEY_VERSION,
        obj_len: obj_len as i32,
        datime,
        key_len: key_len as i16,
        cycle: 0,
        seek_key: location as i64,
        seek_pdir: parent_location,
    }
    .write(&mut out)
    .expect("writing to a Vec<u8> cannot fail");
    key::write_tstring(&mut out, "TBasket").unwrap();
    key::write_tstring(&mut out, branch_name).unwrap();
    key::write_tstring(&mut out, tree_title).unwrap();
    tbasket_subheader(&mut out, DEFAULT_BUFFER_SIZE, itemsize, n_entries, key_len as i32 + obj_len as i32).unwrap();
    out.push(0);
    out.extend_from_slice(data_be);

    sink.write(location, &out)?;
    sink.set_file_length(sink.file_length().max(location + n_bytes as u64));
    sink.flush();

    Ok(FlatBasketResult { n_bytes, location })
}

pub struct JaggedBasketResult {
    pub n_bytes: i32,
    pub location: u64,
    pub entry_offset_len: u32,
}

/// Writes a jagged basket: data bytes, a `u32` offsets count, then the
/// offsets array scaled by `itemsize` and biased by the key length; the
/// true final offset is moved into the sub-header's `fLast` and replaced on
/// disk by a zero sentinel (spec §4.9).
#[allow(clippy::too_many_arguments)]
pub fn write_jagged_basket(
    sink: &mut dyn Sink,
    branch_name: &str,
    tree_title: &str,
    parent_location: i64,
    datime: u32,
    itemsize: i32,
    data_be: &[u8],
    offsets: &[u32],
) -> SinkResult<JaggedBasketResult> {
    assert!(!offsets.is_empty(), "offsets must include the leading 0 and trailing sentinel");
    let key_len = key_len("TBasket", branch_name, tree_title);

    let mut scaled: Vec<u32> = offsets
        .iter()
        .map(|&o| o * itemsize as u32 + key_len as u32)
        .collect();
    let f_last = *scaled.last().unwrap();
    let last_idx = scaled.len() - 1;
    scaled[last_idx] = 0;

    let obj_len = data_be.len() + 4 + scaled.len() * 4;
    let n_bytes = (key_len + obj_len) as i32;
    let location = sink.allocate(n_bytes as u64);

    let mut out = Vec::with_capacity(n_bytes as usize);
    KeyHeader {
        n_bytes,
        version: BASKET_KEY_VERSION,
        obj_len: obj_len as i32,
        datime,
        key_len: key_len as i16,
        cycle: 0,
        seek_key: location as i64,
        seek_pdir: parent_location,
    }
    .write(&mut out)
    .expect("writing to a Vec<u8> cannot fail");
    key::write_tstring(&mut out, "TBasket").unwrap();
    key::write_tstring(&mut out, branch_name).unwrap();
    key::write_tstring(&mut out, tree_title).unwrap();
    tbasket_subheader(
        &mut out,
        DEFAULT_BUFFER_SIZE,
        scaled.len() as i32 + 1,
        scaled.len() as i32 - 1,
        f_last as i32,
    )
    .unwrap();
    out.push(0);

    out.extend_from_slice(data_be);
    out.write_u32::<BigEndian>(scaled.len() as u32).unwrap();
    for value in &scaled {
        out.write_u32::<BigEndian>(*value).unwrap();
    }

    sink.write(location, &out)?;
    sink.set_file_length(sink.file_length().max(location + n_bytes as u64));
    sink.flush();

    Ok(JaggedBasketResult {
        n_bytes,
        location,
        entry_offset_len: 4 * (scaled.len() as u32 - 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ttree::sink::MemorySink;

    #[test]
    fn test_flat_basket_entry_count() {
        let mut sink = MemorySink::new();
        let data: Vec<u8> = (0..16_u8).collect(); // 4 i32 big-endian values
        let result = write_flat_basket(&mut sink, "x", "tree", 0, 0, 4, 4, &data).unwrap();
        assert!(result.n_bytes as usize > data.len());
    }

    #[test]
    fn test_jagged_basket_fencepost_and_sentinel() {
        let mut sink = MemorySink::new();
        let data: Vec<u8> = (0..20_u8).collect(); // 5 i32 values
        let offsets = [0_u32, 2, 5];
        let result = write_jagged_basket(&mut sink, "v", "tree", 0, 0, 4, &data, &offsets).unwrap();
        assert_eq!(result.entry_offset_len, 4 * 2);

        let basket = &sink.bytes()[result.location as usize..(result.location + result.n_bytes as u64) as usize];
        let stored_offsets = &basket[basket.len() - 12..];
        let last = u32::from_be_bytes(stored_offsets[8..12].try_into().unwrap());
        assert_eq!(last, 0, "the on-disk final offset must be the zero sentinel");
    }
}
