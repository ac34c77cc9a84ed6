//! `irwi` is a block-structured, disk-backed spatio-textual index for
//! trajectory data: an R-tree whose internal nodes carry an inverted
//! index from label to the set of trajectories reachable beneath them
//! (an IRWI, Inverted R-tree With Index).
//!
//! A tree is a directory on disk: a fixed-size block file holding
//! packed node records, a nested directory of per-node posting lists,
//! and a small state file recording the root handle, height and size.
//! Trees are built in bulk by one of four loaders (§6):
//!
//! - [`loader_str`]: Sort-Tile-Recursive, partitioning entries by a
//!   sequence of sort keys.
//! - [`loader_hilbert`]: sorts entries along a Hilbert space-filling
//!   curve and packs leaves with a bounded-growth heuristic.
//! - [`loader_quickload`]: a single streaming pass with a bounded
//!   number of resident buckets, making no assumption about input
//!   order.
//! - [`loader_obo`]: classic one-by-one R-tree insertion, kept as a
//!   correctness oracle to compare the bulk loaders against.
//!
//! Once built, a tree's leaf entries can be walked back out with
//! [`Tree::leaf_entries`], and its bounding-box invariant checked with
//! [`Tree::check_mbb_invariant`].

mod block;
mod bulk_common;
mod config;
mod dir_alloc;
mod error;
mod extsort;
mod hilbert;
mod invindex;
mod loader_hilbert;
mod loader_obo;
mod loader_quickload;
mod loader_str;
mod node;
mod str_tiling;
mod stream;
mod tree;
mod types;

#[cfg(test)]
mod test_util;

#[cfg(test)]
#[path = "scenarios_test.rs"]
mod scenarios_test;

pub use crate::config::{Algorithm, LoaderConfig, DEFAULT_BLOCK_SIZE, DEFAULT_LAMBDA};
pub use crate::error::{Error, Result};
pub use crate::tree::Tree;
pub use crate::types::{BoundingBox, Label, LeafEntry, Point, TrajectoryId, TrajectoryUnit};

/// Bulk-load `tree` (which must be empty) from the fixed-record
/// [`LeafEntry`] stream at `input_path`, dispatching to the loader
/// named by `config.algorithm` (§6.4).
///
/// `temp_dir` is used for scratch files by the loaders that need
/// external sorting (`str`, `str2`, `hilbert`); it is ignored by
/// `quickload` and `obo`, which need no spill space.
pub fn load(tree: &mut Tree, input_path: &std::path::Path, temp_dir: &std::path::Path, config: &LoaderConfig) -> Result<()> {
    match config.algorithm {
        Algorithm::Str | Algorithm::Str2 => loader_str::load(tree, input_path, temp_dir, config),
        Algorithm::Hilbert => loader_hilbert::load(tree, input_path, temp_dir, config),
        Algorithm::Quickload => loader_quickload::load(tree, input_path, config),
        Algorithm::Obo => loader_obo::load(tree, input_path, config),
    }
}

/// Write `entries` as a leaf-entry input stream (§6.3) at `path`,
/// creating or truncating it first. Higher-level sources that produce
/// this stream are out of scope (§6.3); this is the primitive writer
/// callers use to hand a loader its input file.
pub fn write_leaf_entries(path: &std::path::Path, entries: &[LeafEntry]) -> Result<()> {
    let mut out = stream::FileStream::<LeafEntry>::create(path)?;
    out.append(entries)
}

/// Read back every record of a leaf-entry input stream (§6.3) written
/// by [`write_leaf_entries`].
pub fn read_leaf_entries(path: &std::path::Path) -> Result<Vec<LeafEntry>> {
    stream::FileStream::<LeafEntry>::open(path)?.read_all()
}
