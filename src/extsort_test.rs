use std::convert::TryInto;

use rand::prelude::random;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::*;
use crate::test_util::TempDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct U32Rec(u32);

impl FixedRecord for U32Rec {
    const SIZE: usize = 4;

    fn encode(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.0.to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Result<U32Rec> {
        Ok(U32Rec(u32::from_le_bytes(buf[0..4].try_into().unwrap())))
    }
}

fn cmp(a: &U32Rec, b: &U32Rec) -> Ordering {
    a.0.cmp(&b.0)
}

fn shuffled(n: u32) -> Vec<U32Rec> {
    let seed: u64 = random();
    println!("seed:{}", seed);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut items: Vec<U32Rec> = (0..n).map(U32Rec).collect();
    items.shuffle(&mut rng);
    items
}

#[test]
fn test_small_range_sorts_in_memory() {
    let dir = TempDir::new("extsort-small");
    let path = dir.path().join("nums.bin");
    let mut stream = FileStream::<U32Rec>::create(&path).unwrap();
    let items = vec![U32Rec(5), U32Rec(1), U32Rec(4), U32Rec(2), U32Rec(3)];
    stream.append(&items).unwrap();

    sort_range(&mut stream, 0, 5, 4096, dir.path(), cmp).unwrap();
    let sorted = stream.read_all().unwrap();
    assert_eq!(sorted, vec![U32Rec(1), U32Rec(2), U32Rec(3), U32Rec(4), U32Rec(5)]);
}

#[test]
fn test_large_range_spills_runs_and_merges() {
    let dir = TempDir::new("extsort-large");
    let path = dir.path().join("nums.bin");
    let mut stream = FileStream::<U32Rec>::create(&path).unwrap();
    let items = shuffled(500);
    stream.append(&items).unwrap();

    // force multiple runs: 16 records/run.
    sort_range(&mut stream, 0, 500, 16 * U32Rec::SIZE, dir.path(), cmp).unwrap();
    let sorted = stream.read_all().unwrap();
    let mut expected = items.clone();
    expected.sort_by(cmp);
    assert_eq!(sorted, expected);
}

#[test]
fn test_sort_range_preserves_items_outside_range() {
    let dir = TempDir::new("extsort-partial");
    let path = dir.path().join("nums.bin");
    let mut stream = FileStream::<U32Rec>::create(&path).unwrap();
    let mut items = vec![U32Rec(99)];
    items.extend(shuffled(40));
    items.push(U32Rec(77));
    stream.append(&items).unwrap();

    sort_range(&mut stream, 1, 40, 8 * U32Rec::SIZE, dir.path(), cmp).unwrap();
    let after = stream.read_all().unwrap();
    assert_eq!(after[0], U32Rec(99));
    assert_eq!(after[41], U32Rec(77));
    let mut middle = after[1..41].to_vec();
    let sorted_middle = middle.clone();
    middle.sort_by(cmp);
    assert_eq!(middle, sorted_middle);
}

#[test]
fn test_k_smallest_is_sorted_prefix() {
    let dir = TempDir::new("extsort-ksmallest");
    let path = dir.path().join("nums.bin");
    let mut stream = FileStream::<U32Rec>::create(&path).unwrap();
    let items = shuffled(200);
    stream.append(&items).unwrap();

    let k = 17u64;
    let got = k_smallest(&mut stream, 0, 200, k, 32 * U32Rec::SIZE, dir.path(), cmp).unwrap();
    let mut expected = items.clone();
    expected.sort_by(cmp);
    assert_eq!(got, expected[0..k as usize]);
}
