//! The leaf-entry input stream (§6.3) as a random-access, fixed-record
//! file, plus the `FixedRecord` codec it shares with the external sort
//! and STR tiling (§4.5, §4.6) and the Hilbert loader's augmented stream
//! (§4.8).

use std::convert::TryInto;
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::node::{decode_point_pub, encode_point_pub};
use crate::types::{LeafEntry, Point, TrajectoryUnit};

/// A type with a fixed, known-in-advance on-disk encoding. Every record
/// type the loaders stream to disk (raw leaf entries, Hilbert-augmented
/// leaf entries) implements this.
pub trait FixedRecord: Sized + Clone {
    const SIZE: usize;
    fn encode(&self, buf: &mut [u8]);
    fn decode(buf: &[u8]) -> Result<Self>;
}

impl FixedRecord for LeafEntry {
    const SIZE: usize = 40;

    fn encode(&self, buf: &mut [u8]) {
        buf[0..8].copy_from_slice(&self.trajectory_id.to_le_bytes());
        buf[8..12].copy_from_slice(&self.unit_index.to_le_bytes());
        encode_point_pub(&mut buf[12..24], self.unit.start);
        encode_point_pub(&mut buf[24..36], self.unit.end);
        buf[36..40].copy_from_slice(&self.unit.label.to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Result<LeafEntry> {
        if buf.len() < Self::SIZE {
            return Err(Error::ParseError {
                offset: 0,
                message: "truncated leaf entry".into(),
            });
        }
        Ok(LeafEntry {
            trajectory_id: u64::from_le_bytes(buf[0..8].try_into().unwrap()),
            unit_index: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            unit: TrajectoryUnit {
                start: decode_point_pub(&buf[12..24]),
                end: decode_point_pub(&buf[24..36]),
                label: u32::from_le_bytes(buf[36..40].try_into().unwrap()),
            },
        })
    }
}

/// A leaf entry augmented with its Hilbert index (§4.8 step 2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HilbertEntry {
    pub entry: LeafEntry,
    pub hilbert: u64,
}

impl FixedRecord for HilbertEntry {
    const SIZE: usize = LeafEntry::SIZE + 8;

    fn encode(&self, buf: &mut [u8]) {
        self.entry.encode(&mut buf[0..LeafEntry::SIZE]);
        buf[LeafEntry::SIZE..Self::SIZE].copy_from_slice(&self.hilbert.to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Result<HilbertEntry> {
        let entry = LeafEntry::decode(&buf[0..LeafEntry::SIZE])?;
        let hilbert = u64::from_le_bytes(buf[LeafEntry::SIZE..Self::SIZE].try_into().unwrap());
        Ok(HilbertEntry { entry, hilbert })
    }
}

/// A flat, random-access file of fixed-size records.
pub struct FileStream<T: FixedRecord> {
    file: fs::File,
    len: u64,
    _marker: std::marker::PhantomData<T>,
}

impl<T: FixedRecord> FileStream<T> {
    pub fn create(path: &Path) -> Result<FileStream<T>> {
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(FileStream {
            file,
            len: 0,
            _marker: std::marker::PhantomData,
        })
    }

    pub fn open(path: &Path) -> Result<FileStream<T>> {
        let file = fs::OpenOptions::new().read(true).write(true).open(path)?;
        let bytes = file.metadata()?.len();
        if bytes % T::SIZE as u64 != 0 {
            return Err(Error::ParseError {
                offset: bytes,
                message: "stream length is not a multiple of the record size".into(),
            });
        }
        Ok(FileStream {
            file,
            len: bytes / T::SIZE as u64,
            _marker: std::marker::PhantomData,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn append(&mut self, items: &[T]) -> Result<()> {
        let mut buf = vec![0u8; items.len() * T::SIZE];
        for (i, item) in items.iter().enumerate() {
            item.encode(&mut buf[i * T::SIZE..(i + 1) * T::SIZE]);
        }
        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&buf)?;
        self.len += items.len() as u64;
        Ok(())
    }

    pub fn read_range(&mut self, offset: u64, count: u64) -> Result<Vec<T>> {
        if offset + count > self.len {
            return Err(Error::Corruption(format!(
                "read_range[{}, {}) exceeds stream length {}",
                offset,
                offset + count,
                self.len
            )));
        }
        let mut buf = vec![0u8; (count as usize) * T::SIZE];
        self.file.seek(SeekFrom::Start(offset * T::SIZE as u64))?;
        self.file.read_exact(&mut buf)?;
        let mut out = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            out.push(T::decode(&buf[i * T::SIZE..(i + 1) * T::SIZE])?);
        }
        Ok(out)
    }

    pub fn write_range(&mut self, offset: u64, items: &[T]) -> Result<()> {
        if offset + items.len() as u64 > self.len {
            return Err(Error::Corruption("write_range exceeds stream length".into()));
        }
        let mut buf = vec![0u8; items.len() * T::SIZE];
        for (i, item) in items.iter().enumerate() {
            item.encode(&mut buf[i * T::SIZE..(i + 1) * T::SIZE]);
        }
        self.file.seek(SeekFrom::Start(offset * T::SIZE as u64))?;
        self.file.write_all(&buf)?;
        Ok(())
    }

    /// Read every record, in order. Only meant for streams small enough
    /// to fit in memory (prepasses, tests); bulk code uses `read_range`.
    pub fn read_all(&mut self) -> Result<Vec<T>> {
        self.read_range(0, self.len)
    }
}

#[cfg(test)]
#[path = "stream_test.rs"]
mod stream_test;
