//! Per-internal-node inverted index (§4.3). The on-disk posting-list
//! format is treated as an opaque append-only list abstraction by the
//! loaders (§1); this module supplies one concrete, capacity-bounded
//! implementation that satisfies the required operations: `total`,
//! `find_or_create`, `append`, `summarise`, `size`, `iterate`.

use std::collections::BTreeMap;
use std::convert::TryInto;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::{Label, TrajectoryId};

/// The per-posting cap on distinct trajectory ids carried inline (λ).
pub const DEFAULT_LAMBDA: usize = crate::config::DEFAULT_LAMBDA;

/// `(child_index, unit_count, trajectories)`: one posting (§3.2).
#[derive(Debug, Clone, PartialEq)]
pub struct PostingEntry {
    pub child_index: u32,
    pub unit_count: u64,
    pub trajectories: TrajIdSet,
}

/// `(unit_count, trajectories)`: the result of folding a posting list,
/// also used as a child's/leaf's own per-label and "total" summary so
/// that summaries compose the same way postings do (§3.2, §4.7 step 2/3).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListSummary {
    pub unit_count: u64,
    pub trajectories: TrajIdSet,
}

impl ListSummary {
    pub fn merge(&self, other: &ListSummary, lambda: usize) -> ListSummary {
        ListSummary {
            unit_count: self.unit_count + other.unit_count,
            trajectories: self.trajectories.union_capped(&other.trajectories, lambda),
        }
    }
}

/// Sorted, deduplicated, capacity-`λ` set of trajectory ids.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrajIdSet {
    ids: Vec<TrajectoryId>,
}

impl TrajIdSet {
    pub fn singleton(id: TrajectoryId) -> TrajIdSet {
        TrajIdSet { ids: vec![id] }
    }

    pub fn ids(&self) -> &[TrajectoryId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: TrajectoryId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    /// Bit-or-sorted union, truncated to the smallest `lambda` ids. The
    /// truncation policy is arbitrary (§4.3 leaves the representation
    /// opaque beyond the capacity bound); smallest-id-first is stable and
    /// deterministic, which is all cross-loader equivalence tests need.
    pub fn union_capped(&self, other: &TrajIdSet, lambda: usize) -> TrajIdSet {
        let mut merged: Vec<TrajectoryId> = Vec::with_capacity(self.ids.len() + other.ids.len());
        let (mut i, mut j) = (0, 0);
        while i < self.ids.len() && j < other.ids.len() {
            match self.ids[i].cmp(&other.ids[j]) {
                std::cmp::Ordering::Less => {
                    merged.push(self.ids[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    merged.push(other.ids[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    merged.push(self.ids[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&self.ids[i..]);
        merged.extend_from_slice(&other.ids[j..]);
        merged.truncate(lambda);
        TrajIdSet { ids: merged }
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(self.ids.len() as u16).to_le_bytes());
        for id in &self.ids {
            buf.extend_from_slice(&id.to_le_bytes());
        }
    }

    pub fn decode(buf: &[u8]) -> (TrajIdSet, usize) {
        let n = u16::from_le_bytes(buf[0..2].try_into().unwrap()) as usize;
        let mut ids = Vec::with_capacity(n);
        let mut off = 2;
        for _ in 0..n {
            ids.push(u64::from_le_bytes(buf[off..off + 8].try_into().unwrap()));
            off += 8;
        }
        (TrajIdSet { ids }, off)
    }
}

/// Handle to one posting list inside a node's inverted index: either the
/// distinguished "total" list or a label-specific one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListHandle {
    Total,
    Label(Label),
}

/// Operations an inverted index must support, consumed by the loaders
/// (§4.3). `DirInvertedIndex` is the one concrete implementation; the
/// trait exists so bulk-load code does not hard-code the representation.
pub trait InvertedIndex {
    fn total(&mut self) -> ListHandle;
    fn find_or_create(&mut self, label: Label) -> ListHandle;
    fn append(&mut self, list: ListHandle, posting: PostingEntry) -> Result<()>;
    fn summarise(&self, list: ListHandle) -> ListSummary;
    fn size(&self) -> usize;
    fn iterate(&self) -> Vec<(Label, ListHandle)>;
}

/// One internal node's inverted index: built entirely in memory across a
/// single node's construction (an internal node's index is never
/// reopened for append once its children are folded, §3.4), then
/// persisted once under its directory-allocator subdirectory.
pub struct DirInvertedIndex {
    dir: PathBuf,
    lambda: usize,
    total: Vec<PostingEntry>,
    labels: BTreeMap<Label, Vec<PostingEntry>>,
}

impl DirInvertedIndex {
    pub fn create(dir: PathBuf, lambda: usize) -> Result<DirInvertedIndex> {
        fs::create_dir_all(&dir)?;
        Ok(DirInvertedIndex {
            dir,
            lambda,
            total: Vec::new(),
            labels: BTreeMap::new(),
        })
    }

    /// Flush every posting list to its own file under `dir` (§6.1).
    /// Format: `count:u32` postings, each
    /// `child_index:u32 | unit_count:u64 | trajectories (len-prefixed)`.
    pub fn persist(&self) -> Result<()> {
        Self::write_list(&self.dir.join("total.postings"), &self.total)?;
        for (label, postings) in &self.labels {
            let path = self.dir.join(format!("{}.postings", label));
            Self::write_list(&path, postings)?;
        }
        Ok(())
    }

    fn write_list(path: &Path, postings: &[PostingEntry]) -> Result<()> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(postings.len() as u32).to_le_bytes());
        for p in postings {
            buf.extend_from_slice(&p.child_index.to_le_bytes());
            buf.extend_from_slice(&p.unit_count.to_le_bytes());
            p.trajectories.encode(&mut buf);
        }
        let mut f = fs::File::create(path)?;
        f.write_all(&buf)?;
        Ok(())
    }

    fn list_mut(&mut self, list: ListHandle) -> &mut Vec<PostingEntry> {
        match list {
            ListHandle::Total => &mut self.total,
            ListHandle::Label(label) => self.labels.entry(label).or_insert_with(Vec::new),
        }
    }

    fn list(&self, list: ListHandle) -> Option<&Vec<PostingEntry>> {
        match list {
            ListHandle::Total => Some(&self.total),
            ListHandle::Label(label) => self.labels.get(&label),
        }
    }
}

impl InvertedIndex for DirInvertedIndex {
    fn total(&mut self) -> ListHandle {
        ListHandle::Total
    }

    fn find_or_create(&mut self, label: Label) -> ListHandle {
        self.labels.entry(label).or_insert_with(Vec::new);
        ListHandle::Label(label)
    }

    fn append(&mut self, list: ListHandle, posting: PostingEntry) -> Result<()> {
        self.list_mut(list).push(posting);
        Ok(())
    }

    fn summarise(&self, list: ListHandle) -> ListSummary {
        let postings = match self.list(list) {
            Some(p) => p,
            None => return ListSummary::default(),
        };
        let mut summary = ListSummary::default();
        for p in postings {
            summary.unit_count += p.unit_count;
            summary.trajectories = summary.trajectories.union_capped(&p.trajectories, self.lambda);
        }
        summary
    }

    fn size(&self) -> usize {
        self.labels.len()
    }

    fn iterate(&self) -> Vec<(Label, ListHandle)> {
        self.labels.keys().map(|&l| (l, ListHandle::Label(l))).collect()
    }
}

#[cfg(test)]
#[path = "invindex_test.rs"]
mod invindex_test;
