//! TTree writer (spec §4/§3).
//!
//! Submodules: the TKey-style record header and TString codec, the
//! free-space sink abstraction, branch descriptors, basket emission, and
//! finally the tree writer that ties them together.

pub mod basket;
pub mod branch;
pub mod key;
pub mod sink;
pub mod writer;

pub use branch::{Branch, BranchKind, Shape};
pub use sink::{MemorySink, Sink, SinkError};
pub use writer::{ExtendValue, Tree, TTreeError, TTreeResult};
