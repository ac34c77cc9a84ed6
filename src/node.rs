//! Typed read/write of internal and leaf blocks. Layouts are packed,
//! little-endian and bit-exact; trailing bytes are zero.

use std::convert::TryInto;

use crate::config::{max_internal_entries, max_leaf_entries};
use crate::error::{Error, Result};
use crate::types::{BoundingBox, Label, LeafEntry, Point, TrajectoryId, TrajectoryUnit};

/// A block handle: a dense block index. Byte offset is `index * block_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockHandle(pub u64);

/// `(mbb, child)`: one edge of an internal node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InternalEntry {
    pub mbb: BoundingBox,
    pub child: BlockHandle,
}

pub const INTERNAL_ENTRY_SIZE: usize = 32;
pub const LEAF_ENTRY_SIZE: usize = 40;
pub const INTERNAL_HEADER_SIZE: usize = 12; // inverted_index_id(8) + count(4)
pub const LEAF_HEADER_SIZE: usize = 4; // count(4)

/// Shared with [`crate::stream`], which encodes the same point layout
/// inline as part of its `FixedRecord` impls.
pub(crate) fn encode_point_pub(buf: &mut [u8], p: Point) {
    buf[0..4].copy_from_slice(&p.x.to_le_bytes());
    buf[4..8].copy_from_slice(&p.y.to_le_bytes());
    buf[8..12].copy_from_slice(&p.t.to_le_bytes());
}

pub(crate) fn decode_point_pub(buf: &[u8]) -> Point {
    Point {
        x: f32::from_le_bytes(buf[0..4].try_into().unwrap()),
        y: f32::from_le_bytes(buf[4..8].try_into().unwrap()),
        t: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
    }
}

fn encode_point(buf: &mut [u8], p: Point) {
    encode_point_pub(buf, p)
}

fn decode_point(buf: &[u8]) -> Point {
    decode_point_pub(buf)
}

fn encode_bbox(buf: &mut [u8], b: BoundingBox) {
    encode_point(&mut buf[0..12], b.min);
    encode_point(&mut buf[12..24], b.max);
}

fn decode_bbox(buf: &[u8]) -> BoundingBox {
    BoundingBox {
        min: decode_point(&buf[0..12]),
        max: decode_point(&buf[12..24]),
    }
}

/// An internal node: an inverted-index directory id, plus up to
/// `max_internal_entries(block_size)` child edges.
#[derive(Debug, Clone)]
pub struct InternalNode {
    pub inverted_index_id: u64,
    pub entries: Vec<InternalEntry>,
}

impl InternalNode {
    pub fn new(inverted_index_id: u64) -> InternalNode {
        InternalNode {
            inverted_index_id,
            entries: Vec::new(),
        }
    }

    pub fn mbb(&self) -> Option<BoundingBox> {
        self.entries
            .iter()
            .map(|e| e.mbb)
            .fold(None, |acc, mbb| Some(match acc {
                None => mbb,
                Some(acc) => BoundingBox::union(acc, mbb),
            }))
    }

    pub fn encode(&self, block_size: usize) -> Result<Vec<u8>> {
        let max = max_internal_entries(block_size);
        if self.entries.len() > max {
            return Err(Error::Corruption(format!(
                "internal node has {} entries, capacity is {}",
                self.entries.len(),
                max
            )));
        }
        let mut buf = vec![0u8; block_size];
        buf[0..8].copy_from_slice(&self.inverted_index_id.to_le_bytes());
        buf[8..12].copy_from_slice(&(self.entries.len() as u32).to_le_bytes());
        let mut off = INTERNAL_HEADER_SIZE;
        for entry in &self.entries {
            encode_bbox(&mut buf[off..off + 24], entry.mbb);
            buf[off + 24..off + 32].copy_from_slice(&entry.child.0.to_le_bytes());
            off += INTERNAL_ENTRY_SIZE;
        }
        Ok(buf)
    }

    pub fn decode(buf: &[u8]) -> Result<InternalNode> {
        if buf.len() < INTERNAL_HEADER_SIZE {
            return Err(Error::Corruption("internal block truncated".into()));
        }
        let inverted_index_id = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let count = u32::from_le_bytes(buf[8..12].try_into().unwrap()) as usize;
        let max = max_internal_entries(buf.len());
        if count > max {
            return Err(Error::Corruption(format!(
                "internal block count {} exceeds capacity {}",
                count, max
            )));
        }
        let mut entries = Vec::with_capacity(count);
        let mut off = INTERNAL_HEADER_SIZE;
        for _ in 0..count {
            if off + INTERNAL_ENTRY_SIZE > buf.len() {
                return Err(Error::Corruption("internal block entry truncated".into()));
            }
            let mbb = decode_bbox(&buf[off..off + 24]);
            let child = BlockHandle(u64::from_le_bytes(buf[off + 24..off + 32].try_into().unwrap()));
            entries.push(InternalEntry { mbb, child });
            off += INTERNAL_ENTRY_SIZE;
        }
        Ok(InternalNode { inverted_index_id, entries })
    }
}

/// A leaf node: up to `max_leaf_entries(block_size)` trajectory segments.
#[derive(Debug, Clone, Default)]
pub struct LeafNode {
    pub entries: Vec<LeafEntry>,
}

impl LeafNode {
    pub fn new() -> LeafNode {
        LeafNode { entries: Vec::new() }
    }

    pub fn mbb(&self) -> Option<BoundingBox> {
        self.entries
            .iter()
            .map(|e| e.mbb())
            .fold(None, |acc, mbb| Some(match acc {
                None => mbb,
                Some(acc) => BoundingBox::union(acc, mbb),
            }))
    }

    pub fn encode(&self, block_size: usize) -> Result<Vec<u8>> {
        let max = max_leaf_entries(block_size);
        if self.entries.len() > max {
            return Err(Error::Corruption(format!(
                "leaf node has {} entries, capacity is {}",
                self.entries.len(),
                max
            )));
        }
        let mut buf = vec![0u8; block_size];
        buf[0..4].copy_from_slice(&(self.entries.len() as u32).to_le_bytes());
        let mut off = LEAF_HEADER_SIZE;
        for entry in &self.entries {
            buf[off..off + 8].copy_from_slice(&entry.trajectory_id.to_le_bytes());
            buf[off + 8..off + 12].copy_from_slice(&entry.unit_index.to_le_bytes());
            encode_point(&mut buf[off + 12..off + 24], entry.unit.start);
            encode_point(&mut buf[off + 24..off + 36], entry.unit.end);
            buf[off + 36..off + 40].copy_from_slice(&entry.unit.label.to_le_bytes());
            off += LEAF_ENTRY_SIZE;
        }
        Ok(buf)
    }

    pub fn decode(buf: &[u8]) -> Result<LeafNode> {
        if buf.len() < LEAF_HEADER_SIZE {
            return Err(Error::Corruption("leaf block truncated".into()));
        }
        let count = u32::from_le_bytes(buf[0..4].try_into().unwrap()) as usize;
        let max = max_leaf_entries(buf.len());
        if count > max {
            return Err(Error::Corruption(format!(
                "leaf block count {} exceeds capacity {}",
                count, max
            )));
        }
        let mut entries = Vec::with_capacity(count);
        let mut off = LEAF_HEADER_SIZE;
        for _ in 0..count {
            if off + LEAF_ENTRY_SIZE > buf.len() {
                return Err(Error::Corruption("leaf block entry truncated".into()));
            }
            let trajectory_id: TrajectoryId =
                u64::from_le_bytes(buf[off..off + 8].try_into().unwrap());
            let unit_index = u32::from_le_bytes(buf[off + 8..off + 12].try_into().unwrap());
            let start = decode_point(&buf[off + 12..off + 24]);
            let end = decode_point(&buf[off + 24..off + 36]);
            let label: Label = u32::from_le_bytes(buf[off + 36..off + 40].try_into().unwrap());
            entries.push(LeafEntry {
                trajectory_id,
                unit_index,
                unit: TrajectoryUnit { start, end, label },
            });
            off += LEAF_ENTRY_SIZE;
        }
        Ok(LeafNode { entries })
    }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
