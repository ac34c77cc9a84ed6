//! One-by-one insertion (§4.10): a correctness oracle, not a bulk loader
//! proper. Inserts entries one at a time via the standard R-tree
//! choose-subtree / split procedure, using the same `beta`-weighted cost
//! as Quickload (§4.9). Builds an in-memory tree during insertion, then
//! serialises it to the block store and inverted-index directories in
//! one bottom-up pass, reusing `bulk_common` exactly as the other
//! loaders do for that final step.
//!
//! Not required in a minimal port (§9); kept here because cross-loader
//! equivalence (§8 scenario 6) needs a reference to compare against.

use std::collections::HashSet;
use std::path::Path;

use crate::bulk_common::{self, NodeSummary};
use crate::config::LoaderConfig;
use crate::error::Result;
use crate::stream::FileStream;
use crate::tree::Tree;
use crate::types::{BoundingBox, Label, LeafEntry};

enum MemNode {
    Leaf { entries: Vec<LeafEntry> },
    Internal { children: Vec<MemChild> },
}

struct MemChild {
    mbb: BoundingBox,
    labels: HashSet<Label>,
    node: Box<MemNode>,
}

impl MemNode {
    fn mbb(&self) -> BoundingBox {
        match self {
            MemNode::Leaf { entries } => entries
                .iter()
                .map(|e| e.mbb())
                .fold(entries[0].mbb(), |acc, m| acc.extend(m)),
            MemNode::Internal { children } => children
                .iter()
                .map(|c| c.mbb)
                .fold(children[0].mbb, |acc, m| acc.extend(m)),
        }
    }
}

/// Cost of adding `entry_mbb`/`entry_labels` to a child, the same
/// `beta * spatial_enlargement + (1 - beta) * textual_cost` function
/// Quickload uses, evaluated against a child's current mbb/label set
/// rather than a resident bucket (§4.9 step 1, §4.10).
fn cost(child: &MemChild, entry_mbb: BoundingBox, entry_labels: &[Label], beta: f64) -> f64 {
    let spatial = (child.mbb.extend(entry_mbb).volume() - child.mbb.volume()).max(0.0);
    let textual = entry_labels.iter().filter(|l| !child.labels.contains(l)).count() as f64;
    beta * spatial + (1.0 - beta) * textual
}

/// Split `items` by sorting on centre-x and dividing in half. §4.10 is a
/// correctness reference, not a performance target: this guarantees a
/// valid, balanced split without implementing a linear/quadratic
/// R*-tree split heuristic.
fn split_leaf(entries: &mut Vec<LeafEntry>) -> MemNode {
    entries.sort_by(|a, b| a.centre().0.partial_cmp(&b.centre().0).unwrap());
    let half = entries.len() / 2;
    let sibling = entries.split_off(half);
    MemNode::Leaf { entries: sibling }
}

fn split_internal(children: &mut Vec<MemChild>) -> MemNode {
    children.sort_by(|a, b| {
        let (ax, _, _) = a.mbb.centre();
        let (bx, _, _) = b.mbb.centre();
        ax.partial_cmp(&bx).unwrap()
    });
    let half = children.len() / 2;
    let sibling = children.split_off(half);
    MemNode::Internal { children: sibling }
}

fn insert(node: &mut MemNode, entry: LeafEntry, leaf_cap: usize, internal_cap: usize, beta: f64) -> Option<MemNode> {
    match node {
        MemNode::Leaf { entries } => {
            entries.push(entry);
            if entries.len() > leaf_cap {
                Some(split_leaf(entries))
            } else {
                None
            }
        }
        MemNode::Internal { children } => {
            let entry_mbb = entry.mbb();
            let entry_labels = [entry.label()];
            let idx = (0..children.len())
                .min_by(|&a, &b| {
                    cost(&children[a], entry_mbb, &entry_labels, beta)
                        .partial_cmp(&cost(&children[b], entry_mbb, &entry_labels, beta))
                        .unwrap()
                })
                .expect("internal node always has at least one child");

            let split = insert(&mut children[idx].node, entry, leaf_cap, internal_cap, beta);
            children[idx].mbb = children[idx].node.mbb();
            children[idx].labels.insert(entry.label());

            if let Some(sibling) = split {
                children.push(MemChild { mbb: sibling.mbb(), labels: labels_of(&sibling), node: Box::new(sibling) });
            }
            if children.len() > internal_cap {
                Some(split_internal(children))
            } else {
                None
            }
        }
    }
}

fn labels_of(node: &MemNode) -> HashSet<Label> {
    match node {
        MemNode::Leaf { entries } => entries.iter().map(|e| e.label()).collect(),
        MemNode::Internal { children } => children.iter().flat_map(|c| c.labels.iter().copied()).collect(),
    }
}

fn serialise(
    node: &MemNode,
    store: &mut crate::block::BlockStore,
    dirs: &mut crate::dir_alloc::DirectoryAllocator,
    lambda: usize,
) -> Result<NodeSummary> {
    match node {
        MemNode::Leaf { entries } => bulk_common::write_leaf(store, entries, lambda),
        MemNode::Internal { children } => {
            let mut child_summaries = Vec::with_capacity(children.len());
            for child in children {
                child_summaries.push(serialise(&child.node, store, dirs, lambda)?);
            }
            bulk_common::assemble_internal(store, dirs, &child_summaries, lambda)
        }
    }
}

/// Bulk-load `tree` one entry at a time via R-tree choose-subtree/split
/// (§6.4 `obo`). `tree` must be empty.
pub fn load(tree: &mut Tree, input_path: &Path, config: &LoaderConfig) -> Result<()> {
    config.validate()?;
    tree.require_empty()?;

    let mut stream = FileStream::<LeafEntry>::open(input_path)?;
    let n = match config.limit {
        Some(limit) => limit.min(stream.len()),
        None => stream.len(),
    };
    if n == 0 {
        log::debug!(target: "irwi::loader_obo", "empty input, leaving tree empty");
        return Ok(());
    }

    let entries = stream.read_range(0, n)?;
    let leaf_cap = config.leaf_fanout();
    let internal_cap = config.internal_fanout();

    let mut root = MemNode::Leaf { entries: Vec::new() };
    let mut height = 1u64;
    for entry in entries {
        if let Some(sibling) = insert(&mut root, entry, leaf_cap, internal_cap, config.beta) {
            let old_root = std::mem::replace(&mut root, MemNode::Internal { children: Vec::new() });
            let old_mbb = old_root.mbb();
            let old_labels = labels_of(&old_root);
            let sib_mbb = sibling.mbb();
            let sib_labels = labels_of(&sibling);
            root = MemNode::Internal {
                children: vec![
                    MemChild { mbb: old_mbb, labels: old_labels, node: Box::new(old_root) },
                    MemChild { mbb: sib_mbb, labels: sib_labels, node: Box::new(sibling) },
                ],
            };
            height += 1;
        }
    }

    let summary = serialise(&root, &mut tree.blocks, &mut tree.dirs, config.lambda)?;
    tree.set_result(n, height, Some(summary.handle));
    tree.persist()?;
    log::debug!(target: "irwi::loader_obo", "built tree: size={} height={}", n, height);
    Ok(())
}

#[cfg(test)]
#[path = "loader_obo_test.rs"]
mod loader_obo_test;
