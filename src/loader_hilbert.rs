//! Hilbert loader (§4.8): rescale every entry's centre into a `(d=3,
//! p=16)` cube relative to the input's total MBB, sort by Hilbert index,
//! then pack leaves with a growth heuristic before folding internal
//! levels exactly as the STR loader does (§4.7).

use std::path::Path;

use crate::bulk_common::{self, NodeSummary};
use crate::config::LoaderConfig;
use crate::error::Result;
use crate::extsort;
use crate::hilbert::HilbertCurve;
use crate::stream::{FileStream, HilbertEntry};
use crate::tree::Tree;
use crate::types::{BoundingBox, LeafEntry};

const HILBERT_DIM: u32 = 3;
const HILBERT_BITS: u32 = 16;
/// Tuned constant, no rationale in the source (§9); kept named so a
/// caller who wants a different growth tolerance can see what to change.
pub const DEFAULT_MAX_GROWTH: f64 = 1.20;

fn total_mbb(stream: &mut FileStream<LeafEntry>, n: u64) -> Result<BoundingBox> {
    // single linear scan (§4.8 step 1), in manageable chunks so this
    // stays well under the loader's memory bound even for huge inputs.
    const CHUNK: u64 = 4096;
    let mut mbb: Option<BoundingBox> = None;
    let mut pos = 0u64;
    while pos < n {
        let take = CHUNK.min(n - pos);
        for e in stream.read_range(pos, take)? {
            mbb = Some(match mbb {
                None => e.mbb(),
                Some(acc) => acc.extend(e.mbb()),
            });
        }
        pos += take;
    }
    Ok(mbb.unwrap_or(BoundingBox {
        min: crate::types::Point::new(0.0, 0.0, 0),
        max: crate::types::Point::new(0.0, 0.0, 0),
    }))
}

fn rescale(v: f64, lo: f64, hi: f64, bits: u32) -> u64 {
    let span = (hi - lo).max(1e-9);
    let max_coord = (1u64 << bits) - 1;
    let scaled = ((v - lo) / span * max_coord as f64).round();
    scaled.max(0.0).min(max_coord as f64) as u64
}

fn hilbert_index(curve: &HilbertCurve, mbb: &BoundingBox, entry: &LeafEntry) -> u64 {
    let (cx, cy, ct) = entry.centre();
    let x = rescale(cx, mbb.min.x as f64, mbb.max.x as f64, HILBERT_BITS);
    let y = rescale(cy, mbb.min.y as f64, mbb.max.y as f64, HILBERT_BITS);
    let t = rescale(ct, mbb.min.t as f64, mbb.max.t as f64, HILBERT_BITS);
    curve.index(&[x, y, t])
}

/// Bulk-load `tree` from the leaf-entry stream at `input_path` using
/// Hilbert-curve ordering (§6.4 `hilbert`). `tree` must be empty.
pub fn load(tree: &mut Tree, input_path: &Path, temp_dir: &Path, config: &LoaderConfig) -> Result<()> {
    config.validate()?;
    tree.require_empty()?;

    let mut input = FileStream::<LeafEntry>::open(input_path)?;
    let n = match config.limit {
        Some(limit) => limit.min(input.len()),
        None => input.len(),
    };
    if n == 0 {
        log::debug!(target: "irwi::loader_hilbert", "empty input, leaving tree empty");
        return Ok(());
    }

    let mbb = total_mbb(&mut input, n)?;
    let curve = HilbertCurve::new(HILBERT_DIM, HILBERT_BITS)?;

    let augmented_path = temp_dir.join(format!("irwi-hilbert-{}.tmp", std::process::id()));
    let mut augmented = FileStream::<HilbertEntry>::create(&augmented_path)?;
    const CHUNK: u64 = 4096;
    let mut pos = 0u64;
    while pos < n {
        let take = CHUNK.min(n - pos);
        let batch: Vec<HilbertEntry> = input
            .read_range(pos, take)?
            .into_iter()
            .map(|entry| HilbertEntry { hilbert: hilbert_index(&curve, &mbb, &entry), entry })
            .collect();
        augmented.append(&batch)?;
        pos += take;
    }

    log::debug!(target: "irwi::loader_hilbert", "sorting {} entries by hilbert index", n);
    extsort::sort_range(&mut augmented, 0, n, config.memory_bound_bytes(), temp_dir, |a: &HilbertEntry, b: &HilbertEntry| {
        a.hilbert.cmp(&b.hilbert)
    })?;

    let leaf_cap = config.leaf_fanout();
    let threshold = (leaf_cap / 2).max(1);
    let sorted = augmented.read_all()?;
    let _ = std::fs::remove_file(&augmented_path);

    let mut leaf_summaries: Vec<NodeSummary> = Vec::new();
    let mut i = 0usize;
    while i < sorted.len() {
        let mut group: Vec<LeafEntry> = Vec::new();
        let mut group_mbb: Option<BoundingBox> = None;
        while i < sorted.len() && group.len() < leaf_cap {
            let candidate = sorted[i].entry;
            let candidate_mbb = match group_mbb {
                None => candidate.mbb(),
                Some(acc) => acc.extend(candidate.mbb()),
            };
            if group.len() >= threshold {
                let current_volume = group_mbb.map(|b| b.volume()).unwrap_or(0.0);
                let grown = candidate_mbb.volume();
                if current_volume > 0.0 && grown > DEFAULT_MAX_GROWTH * current_volume {
                    break;
                }
            }
            group.push(candidate);
            group_mbb = Some(candidate_mbb);
            i += 1;
        }
        leaf_summaries.push(bulk_common::write_leaf(&mut tree.blocks, &group, config.lambda)?);
    }

    let mut level = leaf_summaries;
    let mut height = 1u64;
    while level.len() > 1 {
        level = bulk_common::pack_level(&mut tree.blocks, &mut tree.dirs, &level, config.internal_fanout(), config.lambda)?;
        height += 1;
    }

    let root = level.into_iter().next().map(|s| s.handle);
    tree.set_result(n, height, root);
    tree.persist()?;
    log::debug!(target: "irwi::loader_hilbert", "built tree: size={} height={}", n, height);
    Ok(())
}

#[cfg(test)]
#[path = "loader_hilbert_test.rs"]
mod loader_hilbert_test;
