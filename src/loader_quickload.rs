//! Quickload loader (§4.9): a streaming packer that makes no assumption
//! about input order, packing each level in one pass with a bounded
//! number of resident buckets (`max_leaves`). Per level: pull items one
//! at a time, admit each into the resident bucket with lowest
//! `beta * spatial_enlargement + (1 - beta) * textual_cost`; when no
//! resident bucket has room, evict the oldest full one (subject to the
//! `max_leaves` cap) and start a fresh bucket.

use std::collections::HashSet;
use std::path::Path;

use crate::bulk_common::{self, NodeSummary};
use crate::config::LoaderConfig;
use crate::error::{Error, Result};
use crate::stream::FileStream;
use crate::tree::Tree;
use crate::types::{BoundingBox, Label, LeafEntry};

/// An item the packer can bucket: a leaf entry (label level) or a
/// node summary from the level below (child level). Both contribute an
/// mbb and a set of labels to the cost function (§4.9 step 1).
pub trait Packable: Clone {
    fn mbb(&self) -> BoundingBox;
    fn labels(&self) -> Vec<Label>;
}

impl Packable for LeafEntry {
    fn mbb(&self) -> BoundingBox {
        LeafEntry::mbb(self)
    }

    fn labels(&self) -> Vec<Label> {
        vec![self.label()]
    }
}

impl Packable for NodeSummary {
    fn mbb(&self) -> BoundingBox {
        self.mbb
    }

    fn labels(&self) -> Vec<Label> {
        self.labels.keys().copied().collect()
    }
}

struct Bucket<T: Packable> {
    items: Vec<T>,
    capacity: usize,
    mbb: Option<BoundingBox>,
    label_set: HashSet<Label>,
    created_at: u64,
}

impl<T: Packable> Bucket<T> {
    fn new(capacity: usize, created_at: u64) -> Bucket<T> {
        Bucket { items: Vec::new(), capacity, mbb: None, label_set: HashSet::new(), created_at }
    }

    fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    fn cost(&self, item: &T, beta: f64) -> f64 {
        let spatial = match self.mbb {
            None => 0.0,
            Some(mbb) => (mbb.extend(item.mbb()).volume() - mbb.volume()).max(0.0),
        };
        let textual = item.labels().iter().filter(|l| !self.label_set.contains(l)).count() as f64;
        beta * spatial + (1.0 - beta) * textual
    }

    fn admit(&mut self, item: T) {
        self.mbb = Some(match self.mbb {
            None => item.mbb(),
            Some(mbb) => mbb.extend(item.mbb()),
        });
        self.label_set.extend(item.labels());
        self.items.push(item);
    }
}

/// Pack one level of `items` into groups of at most `capacity`, calling
/// `flush` for each finished group (§4.9 steps 1-3).
pub fn pack_level<T, I, F>(items: I, capacity: usize, max_resident: usize, beta: f64, mut flush: F) -> Result<()>
where
    T: Packable,
    I: IntoIterator<Item = T>,
    F: FnMut(Vec<T>) -> Result<()>,
{
    if capacity == 0 || max_resident == 0 {
        return Err(Error::PreconditionFailed(
            "quickload needs capacity > 0 and max_leaves > 0".into(),
        ));
    }
    let mut resident: Vec<Bucket<T>> = Vec::new();
    let mut clock = 0u64;

    for item in items {
        let best = resident
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_full())
            .map(|(i, b)| (i, b.cost(&item, beta)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

        match best {
            Some((i, _)) => resident[i].admit(item),
            None => {
                if resident.len() >= max_resident {
                    let evict = resident
                        .iter()
                        .enumerate()
                        .min_by_key(|(_, b)| b.created_at)
                        .map(|(i, _)| i)
                        .unwrap();
                    let evicted = resident.remove(evict);
                    flush(evicted.items)?;
                }
                let mut bucket = Bucket::new(capacity, clock);
                clock += 1;
                bucket.admit(item);
                resident.push(bucket);
            }
        }
    }

    for bucket in resident {
        flush(bucket.items)?;
    }
    Ok(())
}

/// Bulk-load `tree` from the leaf-entry stream at `input_path` using the
/// Quickload streaming packer (§6.4 `quickload`). `tree` must be empty.
pub fn load(tree: &mut Tree, input_path: &Path, config: &LoaderConfig) -> Result<()> {
    config.validate()?;
    tree.require_empty()?;

    let mut stream = FileStream::<LeafEntry>::open(input_path)?;
    let n = match config.limit {
        Some(limit) => limit.min(stream.len()),
        None => stream.len(),
    };
    if n == 0 {
        log::debug!(target: "irwi::loader_quickload", "empty input, leaving tree empty");
        return Ok(());
    }

    let entries = stream.read_range(0, n)?;
    let mut leaf_summaries: Vec<NodeSummary> = Vec::new();
    pack_level(entries, config.leaf_fanout(), config.max_leaves, config.beta, |group| {
        leaf_summaries.push(bulk_common::write_leaf(&mut tree.blocks, &group, config.lambda)?);
        Ok(())
    })?;

    let mut level = leaf_summaries;
    let mut height = 1u64;
    while level.len() > 1 {
        let mut next = Vec::new();
        pack_level(level, config.internal_fanout(), config.max_leaves, config.beta, |group| {
            next.push(bulk_common::assemble_internal(&mut tree.blocks, &mut tree.dirs, &group, config.lambda)?);
            Ok(())
        })?;
        level = next;
        height += 1;
    }

    let root = level.into_iter().next().map(|s| s.handle);
    tree.set_result(n, height, root);
    tree.persist()?;
    log::debug!(target: "irwi::loader_quickload", "built tree: size={} height={}", n, height);
    Ok(())
}

#[cfg(test)]
#[path = "loader_quickload_test.rs"]
mod loader_quickload_test;
