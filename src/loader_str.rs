//! STR loader (§4.7): tile the input by Sort-Tile-Recursive, pack
//! consecutive groups into leaves, then fold leaf summaries into
//! ever-higher internal levels until one node remains.
//!
//! §9 open question: the leaf-grouping size `L = min(leaf_fanout,
//! internal_fanout)` is reused for internal packing too, so when the two
//! fanouts differ the larger is under-utilised. `build_str.hpp` does the
//! same (`min_size` computed once and passed to both packing passes);
//! the behaviour is preserved here rather than "fixed".

use std::cmp::Ordering;
use std::path::Path;

use crate::bulk_common::{self, NodeSummary};
use crate::config::{Algorithm, LoaderConfig};
use crate::error::{Error, Result};
use crate::str_tiling::{self, Comparator};
use crate::stream::FileStream;
use crate::tree::Tree;
use crate::types::LeafEntry;

fn label_cmp(a: &LeafEntry, b: &LeafEntry) -> Ordering {
    a.label().cmp(&b.label())
}

fn x_cmp(a: &LeafEntry, b: &LeafEntry) -> Ordering {
    a.centre().0.partial_cmp(&b.centre().0).unwrap()
}

fn y_cmp(a: &LeafEntry, b: &LeafEntry) -> Ordering {
    a.centre().1.partial_cmp(&b.centre().1).unwrap()
}

fn t_cmp(a: &LeafEntry, b: &LeafEntry) -> Ordering {
    a.centre().2.partial_cmp(&b.centre().2).unwrap()
}

fn comparators(algorithm: Algorithm) -> Result<Vec<Comparator<LeafEntry>>> {
    match algorithm {
        Algorithm::Str => Ok(vec![
            Comparator { name: "label", cmp: label_cmp },
            Comparator { name: "x", cmp: x_cmp },
            Comparator { name: "y", cmp: y_cmp },
            Comparator { name: "t", cmp: t_cmp },
        ]),
        Algorithm::Str2 => Ok(vec![
            Comparator { name: "x", cmp: x_cmp },
            Comparator { name: "y", cmp: y_cmp },
            Comparator { name: "t", cmp: t_cmp },
            Comparator { name: "label", cmp: label_cmp },
        ]),
        other => Err(Error::PreconditionFailed(format!(
            "loader_str::load called with algorithm {:?}",
            other
        ))),
    }
}

/// Bulk-load `tree` from the leaf-entry stream at `input_path` using
/// `str` or `str2` ordering (§6.4). `tree` must be empty.
pub fn load(tree: &mut Tree, input_path: &Path, temp_dir: &Path, config: &LoaderConfig) -> Result<()> {
    config.validate()?;
    tree.require_empty()?;

    let mut stream = FileStream::<LeafEntry>::open(input_path)?;
    let n = match config.limit {
        Some(limit) => limit.min(stream.len()),
        None => stream.len(),
    };
    if n == 0 {
        log::debug!(target: "irwi::loader_str", "empty input, leaving tree empty");
        return Ok(());
    }

    let cmps = comparators(config.algorithm)?;
    // §9 open question: min_size drives both the tiling leaf size and
    // the internal packing fanout below.
    let min_size = config.leaf_fanout().min(config.internal_fanout());

    log::debug!(target: "irwi::loader_str", "tiling {} entries, min_size={}", n, min_size);
    str_tiling::tile(&mut stream, 0, n, &cmps, min_size, config.memory_bound_bytes(), temp_dir)?;

    let mut leaf_summaries: Vec<NodeSummary> = Vec::new();
    let mut pos = 0u64;
    while pos < n {
        let take = (min_size as u64).min(n - pos);
        let entries = stream.read_range(pos, take)?;
        leaf_summaries.push(bulk_common::write_leaf(&mut tree.blocks, &entries, config.lambda)?);
        pos += take;
    }

    let mut level = leaf_summaries;
    let mut height = 1u64;
    while level.len() > 1 {
        level = bulk_common::pack_level(&mut tree.blocks, &mut tree.dirs, &level, min_size, config.lambda)?;
        height += 1;
    }

    let root = level.into_iter().next().map(|s| s.handle);
    tree.set_result(n, height, root);
    tree.persist()?;
    log::debug!(target: "irwi::loader_str", "built tree: size={} height={}", n, height);
    Ok(())
}

#[cfg(test)]
#[path = "loader_str_test.rs"]
mod loader_str_test;
