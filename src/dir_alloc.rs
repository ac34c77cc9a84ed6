//! Directory allocator: dense, non-reused `u64` ids, each mapped to a
//! filesystem subdirectory under `inverted_index/`. The highest assigned
//! id is persisted; a crash mid-load is unsupported, since the tree
//! directory has a single writer for the duration of a build.

use std::convert::TryInto;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

const COUNTER_FILE: &str = ".next_id";

pub struct DirectoryAllocator {
    root: PathBuf,
    next_id: u64,
}

impl DirectoryAllocator {
    /// Open (or create) the `inverted_index/` root, restoring the next id
    /// from the counter file if present.
    pub fn open(root: &Path) -> Result<DirectoryAllocator> {
        fs::create_dir_all(root)?;
        let counter_path = root.join(COUNTER_FILE);
        let next_id = match fs::read(&counter_path) {
            Ok(bytes) if bytes.len() == 8 => u64::from_le_bytes(bytes.try_into().unwrap()),
            _ => 0,
        };
        Ok(DirectoryAllocator {
            root: root.to_path_buf(),
            next_id,
        })
    }

    /// Assign the next id, create its subdirectory, and persist the new
    /// high-water mark.
    pub fn alloc(&mut self) -> Result<u64> {
        let id = self.next_id;
        self.next_id += 1;
        fs::create_dir_all(self.dir_for(id))?;
        self.persist_counter()?;
        Ok(id)
    }

    pub fn dir_for(&self, id: u64) -> PathBuf {
        self.root.join(id.to_string())
    }

    fn persist_counter(&self) -> Result<()> {
        let tmp = self.root.join(format!("{}.tmp", COUNTER_FILE));
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(&self.next_id.to_le_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp, self.root.join(COUNTER_FILE))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "dir_alloc_test.rs"]
mod dir_alloc_test;
