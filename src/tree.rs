//! Tree directory layout (§6.1) and metadata lifecycle (§3.4): opens or
//! creates `tree.blocks`, `tree.state` and the `inverted_index/` root
//! under one directory, and owns the `(size, height, root)` triple that
//! is read at open and written at close.

use std::convert::TryInto;
use std::fs;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::block::BlockStore;
use crate::config::LoaderConfig;
use crate::dir_alloc::DirectoryAllocator;
use crate::error::{Error, Result};
use crate::node::{BlockHandle, InternalNode, LeafNode};
use crate::types::LeafEntry;

const BLOCKS_FILE: &str = "tree.blocks";
const STATE_FILE: &str = "tree.state";
const LOCK_FILE: &str = "tree.lock";
const INDEX_DIR: &str = "inverted_index";

/// One open tree directory: the block store, the directory allocator and
/// the persisted `(size, height, root)` triple (§6.1).
pub struct Tree {
    dir: PathBuf,
    pub blocks: BlockStore,
    pub dirs: DirectoryAllocator,
    pub size: u64,
    pub height: u64,
    pub root: Option<BlockHandle>,
    lock: fs::File,
}

impl Tree {
    /// Open `dir`, creating `tree.blocks`/`tree.state`/`inverted_index/`
    /// on first use. Reopening an existing directory restores the
    /// persisted metadata exactly.
    ///
    /// Takes an exclusive advisory lock on `tree.lock` for the lifetime of
    /// the returned `Tree`, enforcing the single-writer rule of §5 ("a
    /// build owns exclusive access to the destination tree directory").
    /// The lock is released when the `Tree` (and its underlying file
    /// handle) is dropped.
    pub fn open(dir: &Path, config: &LoaderConfig) -> Result<Tree> {
        fs::create_dir_all(dir)?;

        let lock = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(dir.join(LOCK_FILE))?;
        lock.try_lock_exclusive().map_err(|_| {
            Error::ResourceExhausted(format!("tree directory {:?} is already open for writing", dir))
        })?;

        let blocks_path = dir.join(BLOCKS_FILE);
        let blocks = if blocks_path.is_file() {
            BlockStore::open(&blocks_path, config.block_size)?
        } else {
            BlockStore::create(&blocks_path, config.block_size)?
        }
        .with_cache_capacity(crate::block::default_cache_capacity());
        let dirs = DirectoryAllocator::open(&dir.join(INDEX_DIR))?;
        let (size, height, root) = Self::read_state(&dir.join(STATE_FILE))?;
        Ok(Tree { dir: dir.to_path_buf(), blocks, dirs, size, height, root, lock })
    }

    fn read_state(path: &Path) -> Result<(u64, u64, Option<BlockHandle>)> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(_) => return Ok((0, 0, None)),
        };
        if bytes.len() != 24 {
            return Err(Error::Corruption("tree.state is not 24 bytes".into()));
        }
        let size = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let height = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
        let root_raw = u64::from_le_bytes(bytes[16..24].try_into().unwrap());
        let root = if height == 0 { None } else { Some(BlockHandle(root_raw)) };
        Ok((size, height, root))
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0
    }

    /// Raise `PreconditionFailed` unless the tree is empty (§4.7 failure
    /// model, reused verbatim by every loader's entry point).
    pub fn require_empty(&self) -> Result<()> {
        if !self.is_empty() {
            return Err(Error::PreconditionFailed("tree is not empty".into()));
        }
        Ok(())
    }

    /// Record the outcome of a completed bulk load.
    pub fn set_result(&mut self, size: u64, height: u64, root: Option<BlockHandle>) {
        self.size = size;
        self.height = height;
        self.root = root;
    }

    /// Flush the block cache and persist `(size, height, root)` (§3.4,
    /// written at close).
    pub fn persist(&mut self) -> Result<()> {
        self.blocks.flush()?;
        let mut buf = Vec::with_capacity(24);
        buf.extend_from_slice(&self.size.to_le_bytes());
        buf.extend_from_slice(&self.height.to_le_bytes());
        buf.extend_from_slice(&self.root.map(|h| h.0).unwrap_or(0).to_le_bytes());
        let tmp = self.dir.join(format!("{}.tmp", STATE_FILE));
        fs::write(&tmp, &buf)?;
        fs::rename(&tmp, self.dir.join(STATE_FILE))?;
        Ok(())
    }

    /// Walk the whole tree and return every leaf entry, in storage order.
    /// Used by tests to check the §3.3/§8 invariants; not part of the
    /// query engine (out of scope, §1).
    pub fn leaf_entries(&mut self) -> Result<Vec<LeafEntry>> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.walk(root, 1, &mut out)?;
        }
        Ok(out)
    }

    fn walk(&mut self, handle: BlockHandle, depth: u64, out: &mut Vec<LeafEntry>) -> Result<()> {
        let buf = self.blocks.read(handle)?;
        if depth == self.height {
            let leaf = LeafNode::decode(&buf)?;
            out.extend(leaf.entries);
        } else {
            let internal = InternalNode::decode(&buf)?;
            for entry in internal.entries {
                self.walk(entry.child, depth + 1, out)?;
            }
        }
        Ok(())
    }

    /// Recompute every internal entry's `mbb` by walking its subtree and
    /// compare against the stored value (§3.3, §8). Used by tests only.
    pub fn check_mbb_invariant(&mut self) -> Result<bool> {
        match self.root {
            None => Ok(true),
            Some(root) => {
                let (ok, _) = self.check_node(root, 1)?;
                Ok(ok)
            }
        }
    }

    fn check_node(&mut self, handle: BlockHandle, depth: u64) -> Result<(bool, crate::types::BoundingBox)> {
        let buf = self.blocks.read(handle)?;
        if depth == self.height {
            let leaf = LeafNode::decode(&buf)?;
            let mbb = leaf
                .mbb()
                .ok_or_else(|| Error::Corruption("empty leaf has no mbb".into()))?;
            Ok((true, mbb))
        } else {
            let internal = InternalNode::decode(&buf)?;
            let mut ok = true;
            let mut mbb = internal.entries[0].mbb;
            for entry in &internal.entries {
                let (child_ok, child_mbb) = self.check_node(entry.child, depth + 1)?;
                ok &= child_ok;
                ok &= child_mbb.min.x == entry.mbb.min.x
                    && child_mbb.min.y == entry.mbb.min.y
                    && child_mbb.min.t == entry.mbb.min.t
                    && child_mbb.max.x == entry.mbb.max.x
                    && child_mbb.max.y == entry.mbb.max.y
                    && child_mbb.max.t == entry.mbb.max.t;
                mbb = mbb.extend(entry.mbb);
            }
            Ok((ok, mbb))
        }
    }
}

impl Drop for Tree {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.lock);
    }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
