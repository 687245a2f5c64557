#![doc = include_str!("../README.md")]

use thiserror::Error;

pub mod compression;
pub mod crc;
pub mod cursor;
pub mod rntuple;
pub mod source;
pub mod ttree;

pub use rntuple::{Anchor, RNTupleError, RNTupleReader, ReaderOptions};
pub use ttree::{Branch, BranchKind, ExtendValue, MemorySink, Shape, Sink, Tree};

/// Crate-wide error, composing the RNTuple reader's and TTree writer's own
/// error enums for callers that handle both formats through one `Result`.
#[derive(Error, Debug)]
pub enum HepError {
    #[error("RNTuple: {0}")]
    RNTuple(#[from] RNTupleError),
    #[error("TTree: {0}")]
    TTree(#[from] ttree::TTreeError),
}

pub type HepResult<T> = Result<T, HepError>;
