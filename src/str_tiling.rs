//! Sort-Tile-Recursive tiling (§4.5): recursively sort a file range by
//! the last of a tuple of comparators, then slab-partition and recurse
//! on the remaining comparators. Generic over comparator arity, so
//! `str`/`str2` (§6.4) are two instantiations rather than two code paths
//! (`code/geodb/str.hpp` keeps the same generality).

use std::cmp::Ordering;
use std::path::Path;

use crate::error::{Error, Result};
use crate::extsort;
use crate::stream::{FileStream, FixedRecord};

/// One named ordering on `T`, e.g. "label" or "x". Kept as a plain `fn`
/// pointer (not a trait object) so comparator tuples stay `Copy`.
#[derive(Clone, Copy)]
pub struct Comparator<T> {
    pub name: &'static str,
    pub cmp: fn(&T, &T) -> Ordering,
}

/// Tile `stream[offset, offset+size)` per §4.5. `comparators` is applied
/// last-to-first: the final comparator in the slice sorts the whole
/// range, earlier ones recurse within each slab.
pub fn tile<T: FixedRecord>(
    stream: &mut FileStream<T>,
    offset: u64,
    size: u64,
    comparators: &[Comparator<T>],
    leaf_capacity: usize,
    memory_bound_bytes: usize,
    temp_dir: &Path,
) -> Result<()> {
    if comparators.is_empty() {
        return Err(Error::PreconditionFailed(
            "STR tiling needs at least one comparator".into(),
        ));
    }
    if leaf_capacity == 0 {
        return Err(Error::PreconditionFailed("leaf_capacity must be > 0".into()));
    }
    tile_inner(stream, offset, size, comparators, leaf_capacity, memory_bound_bytes, temp_dir)
}

fn tile_inner<T: FixedRecord>(
    stream: &mut FileStream<T>,
    offset: u64,
    size: u64,
    comparators: &[Comparator<T>],
    leaf_capacity: usize,
    memory_bound_bytes: usize,
    temp_dir: &Path,
) -> Result<()> {
    if size <= 1 {
        return Ok(());
    }
    let k = comparators.len();
    let last = comparators[k - 1];
    log::trace!(
        target: "irwi::str_tiling",
        "sorting [{}, {}) by {}",
        offset,
        offset + size,
        last.name
    );
    extsort::sort_range(stream, offset, size, memory_bound_bytes, temp_dir, last.cmp)?;
    if k == 1 {
        return Ok(());
    }

    let l = leaf_capacity as u64;
    let p = ceil_div(size, l);
    let s = (p as f64).powf((k as f64 - 1.0) / k as f64).ceil().max(1.0) as u64;
    let m = l * s;

    let end = offset + size;
    let mut pos = offset;
    while pos < end {
        let slab = m.min(end - pos);
        log::trace!(
            target: "irwi::str_tiling",
            "recursing into slab [{}, {}) with {} comparator(s) left",
            pos,
            pos + slab,
            k - 1
        );
        tile_inner(stream, pos, slab, &comparators[..k - 1], leaf_capacity, memory_bound_bytes, temp_dir)?;
        pos += slab;
    }
    Ok(())
}

fn ceil_div(n: u64, d: u64) -> u64 {
    (n + d - 1) / d
}

#[cfg(test)]
#[path = "str_tiling_test.rs"]
mod str_tiling_test;
