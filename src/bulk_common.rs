//! Bulk-load common: node-summary assembly shared by the STR, Hilbert
//! and Quickload loaders (§4.7 steps 2-3, reused verbatim by §4.8 step 5)
//! and by the one-by-one reference oracle's final serialisation pass
//! (§4.10). `code/geodb/irwi/bulk_load_common.hpp`'s node-summary stream
//! is the `Vec<NodeSummary>` level buffer here; `build_str.hpp`'s
//! `leaf_summaries` / `internal_summaries` staging vectors are the
//! `Vec<NodeSummary>` passed between levels.

use std::collections::BTreeMap;

use crate::block::BlockStore;
use crate::dir_alloc::DirectoryAllocator;
use crate::error::Result;
use crate::invindex::{DirInvertedIndex, InvertedIndex, ListSummary, PostingEntry, TrajIdSet};
use crate::node::{BlockHandle, InternalEntry, InternalNode, LeafNode};
use crate::types::{BoundingBox, Label, LeafEntry};

/// The minimal information about a just-written node needed to build its
/// parent (glossary "Node summary"): its handle, mbb, "total" summary and
/// per-label summaries.
#[derive(Debug, Clone)]
pub struct NodeSummary {
    pub handle: BlockHandle,
    pub mbb: BoundingBox,
    pub total: ListSummary,
    pub labels: BTreeMap<Label, ListSummary>,
}

/// Fold a leaf's entries into its total summary and one summary per
/// distinct label (§4.7 step 2).
pub fn summarise_entries(entries: &[LeafEntry], lambda: usize) -> (BoundingBox, ListSummary, BTreeMap<Label, ListSummary>) {
    let mut mbb = entries[0].mbb();
    let mut total = ListSummary::default();
    let mut labels: BTreeMap<Label, ListSummary> = BTreeMap::new();
    for e in entries {
        mbb = mbb.extend(e.mbb());
        total.unit_count += 1;
        total.trajectories = total.trajectories.union_capped(&TrajIdSet::singleton(e.trajectory_id), lambda);
        let entry = labels.entry(e.label()).or_insert_with(ListSummary::default);
        entry.unit_count += 1;
        entry.trajectories = entry.trajectories.union_capped(&TrajIdSet::singleton(e.trajectory_id), lambda);
    }
    (mbb, total, labels)
}

/// Write one leaf node of `entries` to the block store and return its
/// handle plus node summary (§4.7 step 2).
pub fn write_leaf(store: &mut BlockStore, entries: &[LeafEntry], lambda: usize) -> Result<NodeSummary> {
    debug_assert!(!entries.is_empty());
    let node = LeafNode { entries: entries.to_vec() };
    let handle = store.alloc()?;
    let buf = node.encode(store.block_size())?;
    store.write(handle, buf)?;
    let (mbb, total, labels) = summarise_entries(entries, lambda);
    log::debug!(target: "irwi::bulk_common", "wrote leaf {:?} with {} entries", handle, entries.len());
    Ok(NodeSummary { handle, mbb, total, labels })
}

/// Fold a group of children's summaries into one new internal node,
/// assigning it a fresh inverted-index directory and appending one
/// posting per child to the "total" list and to each label-specific list
/// using the child's own summaries (§4.7 step 3).
pub fn assemble_internal(
    store: &mut BlockStore,
    dirs: &mut DirectoryAllocator,
    children: &[NodeSummary],
    lambda: usize,
) -> Result<NodeSummary> {
    debug_assert!(!children.is_empty());
    let dir_id = dirs.alloc()?;
    let mut index = DirInvertedIndex::create(dirs.dir_for(dir_id), lambda)?;

    let mut mbb = children[0].mbb;
    let mut total = ListSummary::default();
    let mut labels: BTreeMap<Label, ListSummary> = BTreeMap::new();

    let total_handle = index.total();
    for (child_index, child) in children.iter().enumerate() {
        mbb = mbb.extend(child.mbb);
        index.append(
            total_handle,
            PostingEntry {
                child_index: child_index as u32,
                unit_count: child.total.unit_count,
                trajectories: child.total.trajectories.clone(),
            },
        )?;
        total = total.merge(&child.total, lambda);

        for (&label, summary) in &child.labels {
            let list = index.find_or_create(label);
            index.append(
                list,
                PostingEntry {
                    child_index: child_index as u32,
                    unit_count: summary.unit_count,
                    trajectories: summary.trajectories.clone(),
                },
            )?;
            let entry = labels.entry(label).or_insert_with(ListSummary::default);
            *entry = entry.merge(summary, lambda);
        }
    }
    index.persist()?;

    let entries: Vec<InternalEntry> = children
        .iter()
        .map(|c| InternalEntry { mbb: c.mbb, child: c.handle })
        .collect();
    let mut node = InternalNode::new(dir_id);
    node.entries = entries;
    let handle = store.alloc()?;
    let buf = node.encode(store.block_size())?;
    store.write(handle, buf)?;

    log::debug!(
        target: "irwi::bulk_common",
        "wrote internal node {:?} with {} children, {} labels",
        handle,
        children.len(),
        labels.len()
    );
    Ok(NodeSummary { handle, mbb, total, labels })
}

/// Fold a full level of node summaries into the next level up, grouping
/// consecutive children into nodes of at most `fanout` (§4.7 step 3).
pub fn pack_level(
    store: &mut BlockStore,
    dirs: &mut DirectoryAllocator,
    children: &[NodeSummary],
    fanout: usize,
    lambda: usize,
) -> Result<Vec<NodeSummary>> {
    debug_assert!(fanout > 0);
    children
        .chunks(fanout)
        .map(|group| assemble_internal(store, dirs, group, lambda))
        .collect()
}

#[cfg(test)]
#[path = "bulk_common_test.rs"]
mod bulk_common_test;
