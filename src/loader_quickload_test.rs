use super::*;
use crate::config::Algorithm;
use crate::test_util::TempDir;
use crate::types::{Point, TrajectoryUnit};

fn entry(id: u64, label: u32, x: f32, y: f32, t: u32) -> LeafEntry {
    LeafEntry {
        trajectory_id: id,
        unit_index: 0,
        unit: TrajectoryUnit {
            start: Point::new(x, y, t),
            end: Point::new(x, y, t),
            label,
        },
    }
}

fn write_input(dir: &TempDir, entries: &[LeafEntry]) -> std::path::PathBuf {
    let path = dir.path().join("input.bin");
    let mut stream = FileStream::<LeafEntry>::create(&path).unwrap();
    stream.append(entries).unwrap();
    path
}

#[test]
fn test_empty_input_leaves_tree_empty() {
    let dir = TempDir::new("loader-ql-empty");
    let input = write_input(&dir, &[]);
    let config = LoaderConfig::new(Algorithm::Quickload).set_block_size(256);
    let mut tree = Tree::open(&dir.path().join("tree"), &config).unwrap();
    load(&mut tree, &input, &config).unwrap();
    assert_eq!(tree.size, 0);
}

#[test]
fn test_rejects_out_of_range_beta() {
    let config = LoaderConfig::new(Algorithm::Quickload).set_beta(-0.1);
    assert!(matches!(config.validate(), Err(Error::PreconditionFailed(_))));
}

#[test]
fn test_pack_level_respects_capacity_and_max_resident() {
    let items: Vec<LeafEntry> = (0..40).map(|i| entry(i, (i % 4) as u32, i as f32, 0.0, 0)).collect();
    let mut groups: Vec<Vec<LeafEntry>> = Vec::new();
    pack_level(items.clone(), 6, 3, 0.5, |g| {
        groups.push(g);
        Ok(())
    })
    .unwrap();

    let total: usize = groups.iter().map(|g| g.len()).sum();
    assert_eq!(total, items.len());
    for g in &groups {
        assert!(g.len() <= 6);
    }
}

#[test]
fn test_quickload_covers_all_entries_with_random_order() {
    let dir = TempDir::new("loader-ql-order");
    let n = 300u64;
    // deliberately not spatially/label sorted: quickload must not assume order.
    let mut entries: Vec<LeafEntry> = (0..n)
        .map(|i| entry(i, (i % 9) as u32, ((i * 31) % 500) as f32, ((i * 17) % 500) as f32, (i % 500) as u32))
        .collect();
    entries.reverse();
    let input = write_input(&dir, &entries);
    let config = LoaderConfig::new(Algorithm::Quickload).set_block_size(256).set_max_leaves(8);
    let mut tree = Tree::open(&dir.path().join("tree"), &config).unwrap();
    load(&mut tree, &input, &config).unwrap();

    assert_eq!(tree.size, n);
    let mut got: Vec<u64> = tree.leaf_entries().unwrap().iter().map(|e| e.trajectory_id).collect();
    got.sort_unstable();
    let want: Vec<u64> = (0..n).collect();
    assert_eq!(got, want);
    assert!(tree.check_mbb_invariant().unwrap());
}
