//! Footer reader & page-list expansion (spec §4.4).
//!
//! The footer envelope payload is: feature flag, the header's CRC32 (so a
//! footer can be checked against the header it claims to extend), the
//! schema extension, then three list-framed record lists (column groups,
//! cluster summaries, cluster groups) and one plain list of envelope links
//! (meta-block links) — column groups carry no payload of their own besides
//! the list framing (open question in spec §9; the original reader's
//! `ColumnGroupRecordReader` references a field it never sets).

use thiserror::Error;

use crate::cursor::{Chunk, Cursor, CursorError};
use crate::rntuple::envelope::{read_list_frame, read_list_of_records, EnvelopeError, EnvelopeLink};
use crate::rntuple::schema::{SchemaError, SchemaLists};

#[derive(Error, Debug)]
pub enum FooterError {
    #[error(transparent)]
    Cursor(#[from] CursorError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

pub type FooterResult<T> = Result<T, FooterError>;

/// No payload of its own; spec §9 open question, resolved by treating it as
/// a bare marker that consumes one list item and nothing else.
#[derive(Clone, Copy, Debug)]
pub struct ColumnGroupRecord;

#[derive(Clone, Copy, Debug)]
pub struct ClusterSummary {
    pub first_entry: u64,
    pub num_entries: u64,
}

impl ClusterSummary {
    fn read(cursor: &mut Cursor, chunk: &Chunk) -> FooterResult<Self> {
        Ok(ClusterSummary {
            first_entry: cursor.read_u64(chunk)?,
            num_entries: cursor.read_u64(chunk)?,
        })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ClusterGroup {
    pub num_clusters: u32,
    pub page_list_link: EnvelopeLink,
}

impl ClusterGroup {
    fn read(cursor: &mut Cursor, chunk: &Chunk) -> FooterResult<Self> {
        Ok(ClusterGroup {
            num_clusters: cursor.read_u32(chunk)?,
            page_list_link: EnvelopeLink::read(cursor, chunk)?,
        })
    }
}

/// Structurally identical to the header's schema lists, but preceded by a
/// `u32 size` field instead of the header's feature-flag/writer-tag/strings
/// preamble (spec §4.3: "structurally identical... ids continuing past the
/// header's").
#[derive(Clone, Debug)]
pub struct SchemaExtension {
    pub size: u32,
    pub lists: SchemaLists,
}

impl SchemaExtension {
    fn read(cursor: &mut Cursor, chunk: &Chunk, field_id_base: u32, column_id_base: u32) -> FooterResult<Self> {
        let size = cursor.read_u32(chunk)?;
        let lists = SchemaLists::read(cursor, chunk, field_id_base, column_id_base)?;
        Ok(SchemaExtension { size, lists })
    }
}

#[derive(Clone, Debug)]
pub struct FooterPayload {
    pub feature_flag: u64,
    pub header_crc32: u32,
    pub extension: SchemaExtension,
    pub column_groups: Vec<ColumnGroupRecord>,
    pub cluster_summaries: Vec<ClusterSummary>,
    pub cluster_groups: Vec<ClusterGroup>,
    pub meta_block_links: Vec<EnvelopeLink>,
}

impl FooterPayload {
    pub fn read(cursor: &mut Cursor, chunk: &Chunk, header_field_count: u32, header_column_count: u32) -> FooterResult<Self> {
        let feature_flag = cursor.read_u64(chunk)?;
        let header_crc32 = cursor.read_u32(chunk)?;
        let extension = SchemaExtension::read(cursor, chunk, header_field_count, header_column_count)?;

        let column_groups = read_list_of_records(cursor, chunk, |_c, _ch| Ok(ColumnGroupRecord))?;
        let cluster_summaries = read_list_of_records(cursor, chunk, |c, ch| Ok(ClusterSummary::read(c, ch)?))?;
        let cluster_groups = read_list_of_records(cursor, chunk, |c, ch| Ok(ClusterGroup::read(c, ch)?))?;

        let (mut inner, count) = read_list_frame(cursor, chunk)?;
        let mut meta_block_links = Vec::with_capacity(count);
        for _ in 0..count {
            meta_block_links.push(EnvelopeLink::read(&mut inner, chunk)?);
        }

        Ok(FooterPayload {
            feature_flag,
            header_crc32,
            extension,
            column_groups,
            cluster_summaries,
            cluster_groups,
            meta_block_links,
        })
    }

    /// Total logical row count, the sum over cluster summaries' `num_entries`
    /// (spec §3 invariant).
    pub fn total_entries(&self) -> u64 {
        self.cluster_summaries.iter().map(|c| c.num_entries).sum()
    }
}

/// A page descriptor: `{num_elements (sign bit reserved), locator}` (spec
/// §3). The sign bit may mark "no checksum"; we mask it off and otherwise
/// ignore it (spec: "must tolerate but need not act on this").
#[derive(Clone, Copy, Debug)]
pub struct PageDescriptor {
    pub num_elements: u32,
    pub locator: crate::rntuple::envelope::Locator,
}

impl PageDescriptor {
    fn read(cursor: &mut Cursor, chunk: &Chunk) -> FooterResult<Self> {
        let raw = cursor.read_u32(chunk)?;
        let locator = crate::rntuple::envelope::Locator::read(cursor, chunk)?;
        Ok(PageDescriptor {
            num_elements: raw & 0x7FFF_FFFF,
            locator,
        })
    }
}

/// A decoded page-list envelope payload: outer index = cluster within the
/// group, inner index = column id, innermost = pages in page-list order
/// (spec §4.4).
pub type PageList = Vec<Vec<Vec<PageDescriptor>>>;

pub fn read_page_list(cursor: &mut Cursor, chunk: &Chunk) -> FooterResult<PageList> {
    let (mut cluster_cursor, num_clusters) = read_list_frame(cursor, chunk)?;
    let mut clusters = Vec::with_capacity(num_clusters);
    for _ in 0..num_clusters {
        let (mut column_cursor, num_columns) = read_list_frame(&mut cluster_cursor, chunk)?;
        let mut columns = Vec::with_capacity(num_columns);
        for _ in 0..num_columns {
            let (mut page_cursor, num_pages) = read_list_frame(&mut column_cursor, chunk)?;
            let mut pages = Vec::with_capacity(num_pages);
            for _ in 0..num_pages {
                pages.push(PageDescriptor::read(&mut page_cursor, chunk)?);
            }
            columns.push(pages);
        }
        clusters.push(columns);
    }
    Ok(clusters)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_list() -> Vec<u8> {
        let mut v = (-8_i32).to_le_bytes().to_vec();
        v.extend_from_slice(&0_i32.to_le_bytes());
        v
    }

    #[test]
    fn test_footer_payload_minimal() {
        let mut data = 0_u64.to_le_bytes().to_vec(); // feature_flag
        data.extend_from_slice(&1234_u32.to_le_bytes()); // header_crc32
        data.extend_from_slice(&0_u32.to_le_bytes()); // extension.size
        for _ in 0..4 {
            data.extend_from_slice(&empty_list());
        }
        data.extend_from_slice(&empty_list()); // column groups
        data.extend_from_slice(&empty_list()); // cluster summaries
        data.extend_from_slice(&empty_list()); // cluster groups
        data.extend_from_slice(&empty_list()); // meta block links

        let chunk = Chunk::new(0, data);
        let mut cursor = Cursor::new(0);
        let footer = FooterPayload::read(&mut cursor, &chunk, 0, 0).unwrap();
        assert_eq!(footer.header_crc32, 1234);
        assert_eq!(footer.total_entries(), 0);
    }

    #[test]
    fn test_page_descriptor_masks_sign_bit() {
        let mut data = (0x8000_0005_u32).to_le_bytes().to_vec();
        data.extend_from_slice(&4_i32.to_le_bytes());
        data.extend_from_slice(&0_u64.to_le_bytes());
        let chunk = Chunk::new(0, data);
        let mut cursor = Cursor::new(0);
        let desc = PageDescriptor::read(&mut cursor, &chunk).unwrap();
        assert_eq!(desc.num_elements, 5);
    }
}
