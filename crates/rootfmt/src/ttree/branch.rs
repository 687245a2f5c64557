//! Branch descriptor (spec §4.7).
//!
//! A branch owns its basket tables (`basket_bytes`, `basket_entry`,
//! `basket_seek`), pre-sized to the tree's current `basket_capacity`, and
//! the byte positions inside the serialized tree record where its mutable
//! metadata lives — the fields `writer.rs`'s append protocol patches in
//! place every `extend`.

use crate::rntuple::coltype::Dtype;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BranchKind {
    /// Flat numeric data.
    Normal,
    /// Flat i32 that tracks the running maximum value seen, used as the
    /// companion offsets-length branch for a jagged branch.
    Counter,
    /// A virtual grouping that expands to one branch per field; never
    /// itself emits baskets.
    Record,
}

/// `name[d1][d2]/<letter>`-style fixed shape (spec §4.7).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Shape(pub Vec<u32>);

impl Shape {
    pub fn scalar() -> Self {
        Shape(Vec::new())
    }

    pub fn product(&self) -> u64 {
        self.0.iter().map(|&d| d as u64).product::<u64>().max(1)
    }

    pub fn title_suffix(&self) -> String {
        self.0.iter().map(|d| format!("[{d}]")).collect()
    }
}

/// Maps a primitive dtype to ROOT's leaf-letter convention (spec §6):
/// upper/lower case distinguishes signed from unsigned at the same width.
pub fn leaf_letter(dtype: Dtype) -> char {
    match dtype {
        Dtype::Bool => 'O',
        Dtype::I8 => 'B',
        Dtype::U8 => 'b',
        Dtype::I16 => 'S',
        Dtype::U16 => 's',
        Dtype::I32 => 'I',
        Dtype::U32 => 'i',
        Dtype::I64 => 'L',
        Dtype::U64 => 'l',
        Dtype::F32 => 'F',
        Dtype::F64 => 'D',
    }
}

/// Byte positions within the serialized tree record where this branch's
/// mutable fields live, filled in once the record has been serialized at
/// least once (spec §4.7: "metadata_start, basket_metadata_start,
/// leaf_special_struct for counter branches").
#[derive(Clone, Debug, Default)]
pub struct BranchMetadataPositions {
    pub metadata_start: Option<u64>,
    pub basket_metadata_start: Option<u64>,
    pub tleaf_special_struct_start: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct Branch {
    pub name: String,
    pub title: String,
    pub kind: BranchKind,
    pub dtype: Dtype,
    pub shape: Shape,
    /// For a jagged branch, the name of its counter branch.
    pub counter: Option<String>,
    /// Running maximum observed value, maintained for `Counter` branches.
    pub max_value: i64,

    pub basket_bytes: Vec<i32>,
    pub basket_entry: Vec<i64>,
    pub basket_seek: Vec<i64>,
    pub entry_offset_len: u32,

    pub positions: BranchMetadataPositions,

    /// Only populated for `BranchKind::Record`: the sub-branches this
    /// virtual grouping expands to, one per field (spec §4.7). A record
    /// branch never reaches `Tree::branches` itself — `flatten_branches`
    /// consumes this list at `Tree::create` time.
    pub children: Vec<Branch>,
}

impl Branch {
    pub fn new(name: impl Into<String>, dtype: Dtype, shape: Shape) -> Self {
        Self {
            name: name.into(),
            title: String::new(),
            kind: BranchKind::Normal,
            dtype,
            shape,
            counter: None,
            max_value: 0,
            basket_bytes: Vec::new(),
            basket_entry: Vec::new(),
            basket_seek: Vec::new(),
            entry_offset_len: 0,
            positions: BranchMetadataPositions::default(),
            children: Vec::new(),
        }
    }

    pub fn counter(name: impl Into<String>) -> Self {
        Self {
            kind: BranchKind::Counter,
            ..Self::new(name, Dtype::I32, Shape::scalar())
        }
    }

    pub fn jagged(name: impl Into<String>, dtype: Dtype, counter_name: impl Into<String>) -> Self {
        Self {
            counter: Some(counter_name.into()),
            entry_offset_len: 1000,
            ..Self::new(name, dtype, Shape::scalar())
        }
    }

    /// A virtual grouping branch that expands to one physical sub-branch
    /// per field (spec §4.7/§4.8: "record branches accept structured...
    /// inputs and are split into their sub-branches by field name").
    pub fn record(name: impl Into<String>, fields: Vec<Branch>) -> Self {
        Self {
            kind: BranchKind::Record,
            children: fields,
            ..Self::new(name, Dtype::I32, Shape::scalar())
        }
    }

    pub fn is_jagged(&self) -> bool {
        self.counter.is_some()
    }

    /// Resizes the three per-basket arrays to `new_capacity`, setting the
    /// first new slot of `basket_entry` to `fencepost` as the append
    /// protocol requires on capacity growth (spec §4.8).
    pub fn grow_basket_tables(&mut self, new_capacity: usize, fencepost: i64) {
        let old_len = self.basket_entry.len();
        self.basket_bytes.resize(new_capacity, 0);
        self.basket_entry.resize(new_capacity, 0);
        self.basket_seek.resize(new_capacity, 0);
        if old_len < new_capacity {
            self.basket_entry[old_len] = fencepost;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_letters_distinguish_signedness() {
        assert_eq!(leaf_letter(Dtype::I32), 'I');
        assert_eq!(leaf_letter(Dtype::U32), 'i');
    }

    #[test]
    fn test_grow_basket_tables_sets_fencepost() {
        let mut branch = Branch::new("x", Dtype::I32, Shape::scalar());
        branch.basket_entry = vec![0, 5];
        branch.grow_basket_tables(4, 11);
        assert_eq!(branch.basket_entry, vec![0, 5, 11, 0]);
    }
}
