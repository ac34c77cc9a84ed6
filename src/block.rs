//! Fixed-size block file with a bounded write-back cache.
//!
//! An append-only file of fixed-size block records, similar in spirit to
//! a log-structured flusher but synchronous: the tree directory has a
//! single writer, so a background flush thread would only add failure
//! modes without buying concurrency.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::Result;
use crate::node::BlockHandle;

/// Cache must hold at least this many blocks.
pub const MIN_CACHE_BLOCKS: usize = 32;

/// Default cache capacity when the caller does not size one explicitly:
/// scales with the number of cores the same way the template crate sizes
/// its worker thread pool (`util::thread::Config::default`), on the
/// heuristic that a wider machine can also afford a wider block cache.
pub fn default_cache_capacity() -> usize {
    (num_cpus::get() * 16).max(MIN_CACHE_BLOCKS)
}

struct CacheEntry {
    data: Vec<u8>,
    dirty: bool,
}

/// Fixed-size block file: `alloc`, `read`, `mark_dirty`/`write`, `flush`.
/// Allocation is append-only within a load; blocks live at
/// `handle.0 * block_size` in `tree.blocks`.
pub struct BlockStore {
    file: fs::File,
    block_size: usize,
    capacity: usize,
    next_index: u64,
    cache: HashMap<u64, CacheEntry>,
    // LRU order, most-recently-used at the back.
    order: VecDeque<u64>,
}

impl BlockStore {
    pub fn create(path: &Path, block_size: usize) -> Result<BlockStore> {
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(BlockStore {
            file,
            block_size,
            capacity: MIN_CACHE_BLOCKS,
            next_index: 0,
            cache: HashMap::new(),
            order: VecDeque::new(),
        })
    }

    pub fn open(path: &Path, block_size: usize) -> Result<BlockStore> {
        let file = fs::OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        let next_index = len / block_size as u64;
        Ok(BlockStore {
            file,
            block_size,
            capacity: MIN_CACHE_BLOCKS,
            next_index,
            cache: HashMap::new(),
            order: VecDeque::new(),
        })
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> BlockStore {
        self.capacity = capacity.max(MIN_CACHE_BLOCKS);
        self
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Allocate a fresh, zeroed block and return its handle.
    pub fn alloc(&mut self) -> Result<BlockHandle> {
        let index = self.next_index;
        self.next_index += 1;
        self.touch(index, vec![0u8; self.block_size], true)?;
        Ok(BlockHandle(index))
    }

    /// Read a block's current contents (from cache if resident).
    pub fn read(&mut self, handle: BlockHandle) -> Result<Vec<u8>> {
        if let Some(entry) = self.cache.get(&handle.0) {
            return Ok(entry.data.clone());
        }
        let mut buf = vec![0u8; self.block_size];
        self.file.seek(SeekFrom::Start(handle.0 * self.block_size as u64))?;
        self.file.read_exact(&mut buf)?;
        self.touch(handle.0, buf.clone(), false)?;
        Ok(buf)
    }

    /// Replace a block's contents and mark it dirty.
    pub fn write(&mut self, handle: BlockHandle, data: Vec<u8>) -> Result<()> {
        debug_assert_eq!(data.len(), self.block_size);
        self.touch(handle.0, data, true)?;
        Ok(())
    }

    /// Mark an already-cached block dirty (e.g. after mutating the `Vec`
    /// returned by a prior `read`, then writing it back with `write`).
    pub fn mark_dirty(&mut self, handle: BlockHandle) {
        if let Some(entry) = self.cache.get_mut(&handle.0) {
            entry.dirty = true;
        }
    }

    /// Write every dirty cached block back to the file and fsync.
    pub fn flush(&mut self) -> Result<()> {
        for (&index, entry) in self.cache.iter_mut() {
            if entry.dirty {
                self.file.seek(SeekFrom::Start(index * self.block_size as u64))?;
                self.file.write_all(&entry.data)?;
                entry.dirty = false;
            }
        }
        self.file.sync_data()?;
        Ok(())
    }

    fn touch(&mut self, index: u64, data: Vec<u8>, dirty: bool) -> Result<()> {
        if self.cache.contains_key(&index) {
            self.order.retain(|&i| i != index);
        } else if self.cache.len() >= self.capacity {
            self.evict_one()?;
        }
        self.cache.insert(index, CacheEntry { data, dirty });
        self.order.push_back(index);
        Ok(())
    }

    fn evict_one(&mut self) -> Result<()> {
        while let Some(index) = self.order.pop_front() {
            if let Some(entry) = self.cache.remove(&index) {
                if entry.dirty {
                    self.file.seek(SeekFrom::Start(index * self.block_size as u64))?;
                    self.file.write_all(&entry.data)?;
                }
                return Ok(());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "block_test.rs"]
mod block_test;
