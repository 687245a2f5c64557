//! TTree writer — tree state, append protocol, and record (re)serialization
//! (spec §4.7/§4.8).
//!
//! `Tree` owns the branch list and the byte positions inside its own
//! serialized record where mutable counters live. `extend` is the single
//! entry point: it grows and relocates the record when basket capacity is
//! exhausted, splits/validates the caller's batch, emits exactly one basket
//! per branch, and patches every piece of metadata that changed — all
//! before the one `flush` that bounds crash consistency to a single call
//! (spec §5).

use std::collections::{HashMap, HashSet};

use byteorder::{BigEndian, WriteBytesExt};
use thiserror::Error;

use crate::rntuple::coltype::Dtype;
use crate::ttree::basket::{self, FlatBasketResult, JaggedBasketResult};
use crate::ttree::branch::{Branch, BranchKind, Shape};
use crate::ttree::key;
use crate::ttree::sink::{Sink, SinkError};
use crate::rntuple::page::Buffer;

#[derive(Error, Debug)]
pub enum TTreeError {
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("branch {0:?} is missing from the extend batch")]
    MissingBranch(String),
    #[error("extend batch has an unexpected branch {0:?}")]
    UnexpectedBranch(String),
    #[error("branch {name:?} expected dtype {expected}, got {actual}")]
    DtypeMismatch { name: String, expected: Dtype, actual: Dtype },
    #[error("branch {name:?} got {got} rows, expected {expected}")]
    RowCountMismatch { name: String, expected: usize, got: usize },
    #[error("branch {0:?} is jagged but its value was not Jagged")]
    ExpectedJagged(String),
    #[error("branch {0:?} is flat but its value was not Flat")]
    ExpectedFlat(String),
    #[error("jagged branch {name:?} offsets must start at 0 and have length rows+1; got {len} offsets for {rows} rows")]
    BadOffsets { name: String, len: usize, rows: usize },
    #[error("record branch {0:?} got a non-record value")]
    ExpectedRecord(String),
    #[error("record branch {record:?} is missing field {field:?}")]
    MissingRecordField { record: String, field: String },
    #[error("record branch {record:?} got an unexpected field {field:?}")]
    UnexpectedRecordField { record: String, field: String },
}

pub type TTreeResult<T> = Result<T, TTreeError>;

/// One branch's input for a single `extend` call (spec §4.8).
pub enum ExtendValue {
    Flat(Buffer),
    Jagged { data: Buffer, offsets: Vec<u32> },
    /// A structured/column-group input for a `BranchKind::Record` branch,
    /// keyed by field name rather than physical (dot-qualified) branch name
    /// (spec §4.8: "record branches accept structured... inputs and are
    /// split into their sub-branches by field name").
    Record(HashMap<String, ExtendValue>),
}

/// Recursively expands `BranchKind::Record` branches into their physical,
/// dot-qualified sub-branches (spec §4.7 "virtual grouping that expands to
/// one branch per field"), returning the flat branch list plus, for every
/// record branch encountered, `record name -> [(field name, physical
/// branch name)]` in field declaration order.
fn flatten_branches(branches: Vec<Branch>) -> (Vec<Branch>, HashMap<String, Vec<(String, String)>>) {
    let mut flat = Vec::new();
    let mut groups = HashMap::new();
    flatten_into(branches, "", &mut flat, &mut groups);
    (flat, groups)
}

fn flatten_into(
    branches: Vec<Branch>,
    prefix: &str,
    flat: &mut Vec<Branch>,
    groups: &mut HashMap<String, Vec<(String, String)>>,
) {
    for mut branch in branches {
        if branch.kind == BranchKind::Record {
            let record_name = format!("{prefix}{}", branch.name);
            let fields = std::mem::take(&mut branch.children);
            let mut mapping = Vec::with_capacity(fields.len());
            for field in &fields {
                mapping.push((field.name.clone(), format!("{record_name}.{}", field.name)));
            }
            groups.insert(record_name.clone(), mapping);
            flatten_into(fields, &format!("{record_name}."), flat, groups);
        } else {
            branch.name = format!("{prefix}{}", branch.name);
            if let Some(counter) = branch.counter.take() {
                branch.counter = Some(format!("{prefix}{counter}"));
            }
            flat.push(branch);
        }
    }
}

/// `_ttree20_format1`'s sixteen-field block (spec §6), named exactly as the
/// format this was distilled from names them.
struct TreeCounters {
    entries: i64,
    tot_bytes: i64,
    zip_bytes: i64,
    saved_bytes: i64,
    flushed_bytes: i64,
    weight: f64,
    timer_interval: i32,
    scan_field: i32,
    update: i32,
    default_entry_offset_len: i32,
    n_cluster_range: i32,
    max_entries: i64,
    max_entry_loop: i64,
    max_virtual_size: i64,
    auto_save: i64,
    auto_flush: i64,
    estimate: i64,
}

impl TreeCounters {
    fn new() -> Self {
        Self {
            entries: 0,
            tot_bytes: 0,
            zip_bytes: 0,
            saved_bytes: 0,
            flushed_bytes: 0,
            weight: 1.0,
            timer_interval: 0,
            scan_field: 0,
            update: 0,
            default_entry_offset_len: 1000,
            n_cluster_range: 0,
            max_entries: 1_000_000_000_000,
            max_entry_loop: 1_000_000_000_000,
            max_virtual_size: 0,
            auto_save: -300_000_000,
            auto_flush: -30_000_000,
            estimate: 1_000_000,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.write_i64::<BigEndian>(self.entries).unwrap();
        out.write_i64::<BigEndian>(self.tot_bytes).unwrap();
        out.write_i64::<BigEndian>(self.zip_bytes).unwrap();
        out.write_i64::<BigEndian>(self.saved_bytes).unwrap();
        out.write_i64::<BigEndian>(self.flushed_bytes).unwrap();
        out.write_f64::<BigEndian>(self.weight).unwrap();
        out.write_i32::<BigEndian>(self.timer_interval).unwrap();
        out.write_i32::<BigEndian>(self.scan_field).unwrap();
        out.write_i32::<BigEndian>(self.update).unwrap();
        out.write_i32::<BigEndian>(self.default_entry_offset_len).unwrap();
        out.write_i32::<BigEndian>(self.n_cluster_range).unwrap();
        out.write_i64::<BigEndian>(self.max_entries).unwrap();
        out.write_i64::<BigEndian>(self.max_entry_loop).unwrap();
        out.write_i64::<BigEndian>(self.max_virtual_size).unwrap();
        out.write_i64::<BigEndian>(self.auto_save).unwrap();
        out.write_i64::<BigEndian>(self.auto_flush).unwrap();
        out.write_i64::<BigEndian>(self.estimate).unwrap();
    }
}

pub struct Tree {
    name: String,
    title: String,
    branches: Vec<Branch>,
    num_entries: u64,
    num_baskets: usize,
    basket_capacity: usize,
    resize_factor: f64,
    counters: TreeCounters,
    record_location: u64,
    record_len: u64,
    tree_metadata_start: u64,
    /// Record branch name -> `[(field name, physical branch name)]`, built
    /// once at `create` time by `flatten_branches` (spec §4.7/§4.8).
    record_groups: HashMap<String, Vec<(String, String)>>,
}

impl Tree {
    /// Creates a tree with the given branches and writes its initial record
    /// (spec §4.7/§4.9's `write_anew`).
    pub fn create(
        sink: &mut dyn Sink,
        name: impl Into<String>,
        title: impl Into<String>,
        branches: Vec<Branch>,
        initial_basket_capacity: usize,
        resize_factor: f64,
    ) -> TTreeResult<Self> {
        let (mut flat_branches, record_groups) = flatten_branches(branches);
        for branch in &mut flat_branches {
            branch.grow_basket_tables(initial_basket_capacity, 0);
        }
        let mut tree = Tree {
            name: name.into(),
            title: title.into(),
            branches: flat_branches,
            num_entries: 0,
            num_baskets: 0,
            basket_capacity: initial_basket_capacity,
            resize_factor,
            counters: TreeCounters::new(),
            record_location: 0,
            record_len: 0,
            tree_metadata_start: 0,
            record_groups,
        };
        tree.write_record(sink, None)?;
        Ok(tree)
    }

    pub fn num_entries(&self) -> u64 {
        self.num_entries
    }

    pub fn num_baskets(&self) -> usize {
        self.num_baskets
    }

    pub fn basket_capacity(&self) -> usize {
        self.basket_capacity
    }

    pub fn record_location(&self) -> u64 {
        self.record_location
    }

    pub fn branch(&self, name: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.name == name)
    }

    /// Serializes the full tree record at a freshly allocated location,
    /// releasing `old` if this is a relocation rather than the first write
    /// (spec §4.8 "rebuilds the tree record at a new location and releases
    /// the old region").
    fn write_record(&mut self, sink: &mut dyn Sink, old: Option<(u64, u64)>) -> TTreeResult<()> {
        let mut body = Vec::new();

        // Named-object header: class/name/title (spec §6's "TObject+TNamed").
        key::write_tstring(&mut body, "TTree").unwrap();
        key::write_tstring(&mut body, &self.name).unwrap();
        key::write_tstring(&mut body, &self.title).unwrap();

        self.tree_metadata_start = body.len() as u64;
        self.counters.entries = self.num_entries as i64;
        self.counters.write(&mut body);

        // IO-features stub (spec §4.7/§6: out of this crate's scope beyond a marker).
        body.push(0);

        let num_branches = self.branches.len() as u32;
        body.write_u32::<BigEndian>(num_branches).unwrap();

        for branch in &mut self.branches {
            key::write_tstring(&mut body, &branch.name).unwrap();
            let mut title = branch.name.clone();
            title.push_str(&branch.shape.title_suffix());
            title.push('/');
            title.push(crate::ttree::branch::leaf_letter(branch.dtype));
            key::write_tstring(&mut body, &title).unwrap();

            branch.positions.metadata_start = Some(body.len() as u64);
            body.write_i32::<BigEndian>(self.num_baskets as i32).unwrap(); // fWriteBasket
            body.write_i64::<BigEndian>(self.num_entries as i64).unwrap(); // fEntryNumber
            body.write_u32::<BigEndian>(branch.entry_offset_len).unwrap();

            // Embedded TObjArray of baskets (spec §6): zero-length, since
            // every basket this writer emits is flushed to the sink and
            // never retained in memory — the three tables below are the
            // only record of where baskets live on disk, matching ROOT's
            // own on-disk convention for a branch with no baskets cached.
            body.write_u32::<BigEndian>(0).unwrap();

            branch.positions.basket_metadata_start = Some(body.len() as u64);
            body.push(1); // speedbump
            for &b in &branch.basket_bytes {
                body.write_i32::<BigEndian>(b).unwrap();
            }
            body.push(1);
            for &e in &branch.basket_entry {
                body.write_i64::<BigEndian>(e).unwrap();
            }
            body.push(1);
            for &s in &branch.basket_seek {
                body.write_i64::<BigEndian>(s).unwrap();
            }

            // Single TLeaf: generic fields + a per-dtype min/max pair
            // (spec §6/§9's `tleaf_special_struct`).
            body.write_i32::<BigEndian>(branch.shape.product() as i32).unwrap(); // fLen
            body.write_i32::<BigEndian>(branch.dtype.itemsize() as i32).unwrap(); // fLenType
            body.write_i32::<BigEndian>(0).unwrap(); // fOffset
            body.push((branch.kind == BranchKind::Counter) as u8); // fIsRange
            let letter = crate::ttree::branch::leaf_letter(branch.dtype);
            body.push(letter.is_ascii_lowercase() as u8); // fIsUnsigned

            branch.positions.tleaf_special_struct_start = Some(body.len() as u64);
            body.write_i64::<BigEndian>(0).unwrap(); // fMinimum/fMaximum placeholder pair
        }

        // TObjArray of leaf references (spec §6): one entry per branch,
        // since this crate models exactly one TLeaf per branch; each entry
        // is that branch's index into `self.branches`, mirroring the tree's
        // flat `fLeaves` list of pointers into its branches' sole leaf.
        body.write_u32::<BigEndian>(num_branches).unwrap();
        for i in 0..num_branches {
            body.write_i32::<BigEndian>(i as i32).unwrap();
        }

        // Seven trailing null pointers (fAliases, fIndexValues, fIndex,
        // fTreeIndex, fFriends, fUserInfo, fBranchRef) — spec §6.
        body.extend_from_slice(&[0_u8; 4 * 7]);

        self.record_len = body.len() as u64;
        let location = sink.allocate(self.record_len);
        sink.write(location, &body)?;
        self.record_location = location;
        sink.set_file_length(sink.file_length().max(location + self.record_len));

        if let Some((old_start, old_stop)) = old {
            sink.release(old_start, old_stop);
        }
        sink.flush();
        Ok(())
    }

    #[tracing::instrument(skip(self, sink, batch))]
    pub fn extend(&mut self, sink: &mut dyn Sink, batch: HashMap<String, ExtendValue>) -> TTreeResult<()> {
        let mut batch = self.expand_record_values(batch)?;

        if self.num_baskets + 1 >= self.basket_capacity {
            let new_capacity = (self.basket_capacity + 1).max((self.basket_capacity as f64 * self.resize_factor).ceil() as usize);
            for branch in &mut self.branches {
                branch.grow_basket_tables(new_capacity, self.num_entries as i64);
            }
            self.basket_capacity = new_capacity;
            let old = (self.record_location, self.record_location + self.record_len);
            self.write_record(sink, Some(old))?;
        }

        let input_names: HashSet<String> = self
            .branches
            .iter()
            .filter(|b| b.kind != BranchKind::Counter)
            .map(|b| b.name.clone())
            .collect();
        for name in &input_names {
            if !batch.contains_key(name) {
                return Err(TTreeError::MissingBranch(name.clone()));
            }
        }
        for key in batch.keys() {
            if !input_names.contains(key) {
                return Err(TTreeError::UnexpectedBranch(key.clone()));
            }
        }

        let row_count = row_count_of(&batch, &input_names)?;
        let parent_location = self.record_location as i64;
        let mut bytes_written: u64 = 0;

        // Flat/jagged branches carry their own basket; counter branches are
        // derived from their paired jagged branch and emitted alongside it.
        let branch_names: Vec<String> = self.branches.iter().map(|b| b.name.clone()).collect();
        for name in branch_names {
            let idx = self.branches.iter().position(|b| b.name == name).unwrap();
            if self.branches[idx].kind == BranchKind::Counter {
                continue;
            }
            let value = batch.remove(&name).unwrap();
            let counter_name = self.branches[idx].counter.clone();

            match (&self.branches[idx].is_jagged(), value) {
                (false, ExtendValue::Flat(buf)) => {
                    bytes_written += self.emit_flat(sink, idx, parent_location, buf, row_count)?;
                }
                (false, ExtendValue::Jagged { .. }) => return Err(TTreeError::ExpectedFlat(name)),
                (true, ExtendValue::Jagged { data, offsets }) => {
                    if offsets.len() != row_count + 1 || offsets[0] != 0 {
                        return Err(TTreeError::BadOffsets {
                            name,
                            len: offsets.len(),
                            rows: row_count,
                        });
                    }
                    let lengths: Buffer = Buffer::I32(offsets.windows(2).map(|w| (w[1] - w[0]) as i32).collect());
                    let counter_idx = self
                        .branches
                        .iter()
                        .position(|b| Some(&b.name) == counter_name.as_ref())
                        .expect("jagged branch must reference an existing counter branch");
                    bytes_written += self.emit_flat(sink, counter_idx, parent_location, lengths, row_count)?;
                    bytes_written += self.emit_jagged(sink, idx, parent_location, data, offsets)?;
                }
                (true, ExtendValue::Flat(_)) => return Err(TTreeError::ExpectedJagged(name)),
            }
        }

        self.num_baskets += 1;
        self.num_entries += row_count as u64;
        self.counters.tot_bytes += bytes_written as i64;
        self.counters.zip_bytes += bytes_written as i64;

        self.patch_metadata(sink)?;
        sink.flush();
        Ok(())
    }

    /// Replaces every batch entry keyed by a record branch's name with one
    /// entry per physical sub-branch, pulled out of that entry's nested
    /// `ExtendValue::Record` map by field name (spec §4.8 step 2).
    fn expand_record_values(&self, batch: HashMap<String, ExtendValue>) -> TTreeResult<HashMap<String, ExtendValue>> {
        let mut out = HashMap::with_capacity(batch.len());
        for (key, value) in batch {
            let Some(mapping) = self.record_groups.get(&key) else {
                out.insert(key, value);
                continue;
            };
            let ExtendValue::Record(mut fields) = value else {
                return Err(TTreeError::ExpectedRecord(key));
            };
            for (field_name, physical_name) in mapping {
                let field_value = fields.remove(field_name).ok_or_else(|| TTreeError::MissingRecordField {
                    record: key.clone(),
                    field: field_name.clone(),
                })?;
                out.insert(physical_name.clone(), field_value);
            }
            if let Some((field, _)) = fields.into_iter().next() {
                return Err(TTreeError::UnexpectedRecordField { record: key, field });
            }
        }
        Ok(out)
    }

    fn emit_flat(
        &mut self,
        sink: &mut dyn Sink,
        idx: usize,
        parent_location: i64,
        buf: Buffer,
        row_count: usize,
    ) -> TTreeResult<u64> {
        let branch = &mut self.branches[idx];
        if buf.len() != row_count * branch.shape.product() as usize {
            return Err(TTreeError::RowCountMismatch {
                name: branch.name.clone(),
                expected: row_count,
                got: buf.len() / branch.shape.product().max(1) as usize,
            });
        }
        check_dtype(&branch.name, branch.dtype, &buf)?;
        if branch.kind == BranchKind::Counter {
            if let Buffer::I32(v) = &buf {
                branch.max_value = v.iter().copied().map(i64::from).fold(branch.max_value, i64::max);
            }
        }
        let itemsize = (branch.dtype.itemsize() as u64 * branch.shape.product()) as i32;
        let data_be = encode_be(&buf);

        let title = self.title.clone();
        let FlatBasketResult { n_bytes, location } =
            basket::write_flat_basket(sink, &branch.name, &title, parent_location, 0, itemsize, row_count as i32, &data_be)?;

        let slot = self.num_baskets;
        let branch = &mut self.branches[idx];
        branch.basket_bytes[slot] = n_bytes;
        branch.basket_entry[slot] = self.num_entries as i64;
        branch.basket_seek[slot] = location as i64;
        // Writer fencepost (spec §4.8): eagerly record the cumulative entry
        // total one slot ahead so `basket_entry[num_baskets] == num_entries`
        // holds even before the next `extend` touches this slot.
        if slot + 1 < branch.basket_entry.len() {
            branch.basket_entry[slot + 1] = self.num_entries as i64 + row_count as i64;
        }
        Ok(n_bytes as u64)
    }

    fn emit_jagged(
        &mut self,
        sink: &mut dyn Sink,
        idx: usize,
        parent_location: i64,
        data: Buffer,
        offsets: Vec<u32>,
    ) -> TTreeResult<u64> {
        let branch = &mut self.branches[idx];
        check_dtype(&branch.name, branch.dtype, &data)?;
        let first = *offsets.first().unwrap() as usize;
        let last = *offsets.last().unwrap() as usize;
        let trimmed = trim_buffer(&data, first, last);
        let itemsize = branch.dtype.itemsize() as i32;
        let data_be = encode_be(&trimmed);

        let title = self.title.clone();
        let JaggedBasketResult {
            n_bytes,
            location,
            entry_offset_len,
        } = basket::write_jagged_basket(sink, &branch.name, &title, parent_location, 0, itemsize, &data_be, &offsets)?;

        let row_count = offsets.len() - 1;
        let slot = self.num_baskets;
        let branch = &mut self.branches[idx];
        branch.basket_bytes[slot] = n_bytes;
        branch.basket_entry[slot] = self.num_entries as i64;
        branch.basket_seek[slot] = location as i64;
        branch.entry_offset_len = entry_offset_len;
        // Writer fencepost (spec §4.8), mirrored from `emit_flat`.
        if slot + 1 < branch.basket_entry.len() {
            branch.basket_entry[slot + 1] = self.num_entries as i64 + row_count as i64;
        }
        Ok(n_bytes as u64)
    }

    /// Writes back every counter that `extend` just changed in place,
    /// without reserializing the whole record (spec §4.8 step 5).
    fn patch_metadata(&mut self, sink: &mut dyn Sink) -> TTreeResult<()> {
        let base = self.record_location;

        let mut counters_buf = Vec::new();
        self.counters.entries = self.num_entries as i64;
        self.counters.write(&mut counters_buf);
        sink.write(base + self.tree_metadata_start, &counters_buf)?;

        for branch in &self.branches {
            let metadata_start = branch.positions.metadata_start.expect("written by write_record");
            let mut buf = Vec::new();
            buf.write_i32::<BigEndian>(self.num_baskets as i32).unwrap();
            buf.write_i64::<BigEndian>(self.num_entries as i64).unwrap();
            sink.write(base + metadata_start, &buf)?;

            let basket_start = branch.positions.basket_metadata_start.expect("written by write_record");
            let mut tables = Vec::new();
            tables.push(1_u8);
            for &b in &branch.basket_bytes {
                tables.write_i32::<BigEndian>(b).unwrap();
            }
            tables.push(1);
            for &e in &branch.basket_entry {
                tables.write_i64::<BigEndian>(e).unwrap();
            }
            tables.push(1);
            for &s in &branch.basket_seek {
                tables.write_i64::<BigEndian>(s).unwrap();
            }
            sink.write(base + basket_start, &tables)?;
        }
        Ok(())
    }
}

fn row_count_of(batch: &HashMap<String, ExtendValue>, input_names: &HashSet<String>) -> TTreeResult<usize> {
    for name in input_names {
        if let Some(value) = batch.get(name) {
            return Ok(match value {
                ExtendValue::Flat(buf) => buf.len(),
                ExtendValue::Jagged { offsets, .. } => offsets.len().saturating_sub(1),
            });
        }
    }
    Ok(0)
}

fn check_dtype(name: &str, expected: Dtype, buf: &Buffer) -> TTreeResult<()> {
    let actual = dtype_of(buf);
    if actual != expected {
        return Err(TTreeError::DtypeMismatch {
            name: name.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

fn dtype_of(buf: &Buffer) -> Dtype {
    match buf {
        Buffer::Bool(_) => Dtype::Bool,
        Buffer::I8(_) => Dtype::I8,
        Buffer::U8(_) => Dtype::U8,
        Buffer::I16(_) => Dtype::I16,
        Buffer::U16(_) => Dtype::U16,
        Buffer::I32(_) => Dtype::I32,
        Buffer::U32(_) => Dtype::U32,
        Buffer::I64(_) => Dtype::I64,
        Buffer::U64(_) => Dtype::U64,
        Buffer::F32(_) => Dtype::F32,
        Buffer::F64(_) => Dtype::F64,
    }
}

fn trim_buffer(buf: &Buffer, start: usize, stop: usize) -> Buffer {
    match buf {
        Buffer::Bool(v) => Buffer::Bool(v[start..stop].to_vec()),
        Buffer::I8(v) => Buffer::I8(v[start..stop].to_vec()),
        Buffer::U8(v) => Buffer::U8(v[start..stop].to_vec()),
        Buffer::I16(v) => Buffer::I16(v[start..stop].to_vec()),
        Buffer::U16(v) => Buffer::U16(v[start..stop].to_vec()),
        Buffer::I32(v) => Buffer::I32(v[start..stop].to_vec()),
        Buffer::U32(v) => Buffer::U32(v[start..stop].to_vec()),
        Buffer::I64(v) => Buffer::I64(v[start..stop].to_vec()),
        Buffer::U64(v) => Buffer::U64(v[start..stop].to_vec()),
        Buffer::F32(v) => Buffer::F32(v[start..stop].to_vec()),
        Buffer::F64(v) => Buffer::F64(v[start..stop].to_vec()),
    }
}

fn encode_be(buf: &Buffer) -> Vec<u8> {
    let mut out = Vec::new();
    match buf {
        Buffer::Bool(v) => out.extend(v.iter().map(|&b| b as u8)),
        Buffer::I8(v) => out.extend(v.iter().map(|&b| b as u8)),
        Buffer::U8(v) => out.extend_from_slice(v),
        Buffer::I16(v) => v.iter().for_each(|&x| out.write_i16::<BigEndian>(x).unwrap()),
        Buffer::U16(v) => v.iter().for_each(|&x| out.write_u16::<BigEndian>(x).unwrap()),
        Buffer::I32(v) => v.iter().for_each(|&x| out.write_i32::<BigEndian>(x).unwrap()),
        Buffer::U32(v) => v.iter().for_each(|&x| out.write_u32::<BigEndian>(x).unwrap()),
        Buffer::I64(v) => v.iter().for_each(|&x| out.write_i64::<BigEndian>(x).unwrap()),
        Buffer::U64(v) => v.iter().for_each(|&x| out.write_u64::<BigEndian>(x).unwrap()),
        Buffer::F32(v) => v.iter().for_each(|&x| out.write_f32::<BigEndian>(x).unwrap()),
        Buffer::F64(v) => v.iter().for_each(|&x| out.write_f64::<BigEndian>(x).unwrap()),
    }
    out
}
