//! Per-worker shard planning

use std::path::{Path, PathBuf};

/// One worker's assignment: a dedicated file and a byte quota
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerShard {
    pub index: usize,
    pub path: PathBuf,
    pub size: u64,
}

/// File used by worker `index` inside the workspace
pub fn shard_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("shard-{}.dat", index))
}

/// Split `total_bytes` evenly across `workers` shards
///
/// The remainder of the division goes to the first worker, so the shard
/// sizes always sum to exactly `total_bytes`.
pub fn plan_shards(dir: &Path, total_bytes: u64, workers: usize) -> Vec<WorkerShard> {
    if workers == 0 {
        return Vec::new();
    }

    let base = total_bytes / workers as u64;
    let remainder = total_bytes % workers as u64;

    (0..workers)
        .map(|index| WorkerShard {
            index,
            path: shard_path(dir, index),
            size: if index == 0 { base + remainder } else { base },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split() {
        let shards = plan_shards(Path::new("/w"), 4096, 4);
        assert_eq!(shards.len(), 4);
        assert!(shards.iter().all(|s| s.size == 1024));
        assert_eq!(shards[2].path, PathBuf::from("/w/shard-2.dat"));
    }

    #[test]
    fn test_remainder_goes_to_first_worker() {
        let shards = plan_shards(Path::new("/w"), 10, 3);
        let sizes: Vec<u64> = shards.iter().map(|s| s.size).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
    }

    #[test]
    fn test_sizes_sum_to_total() {
        for workers in 1..=17 {
            for total in [1u64, 7, 1000, 65_537, 1 << 30] {
                let shards = plan_shards(Path::new("/w"), total, workers);
                assert_eq!(shards.len(), workers);
                assert_eq!(shards.iter().map(|s| s.size).sum::<u64>(), total);
            }
        }
    }

    #[test]
    fn test_more_workers_than_bytes() {
        let shards = plan_shards(Path::new("/w"), 2, 4);
        let sizes: Vec<u64> = shards.iter().map(|s| s.size).collect();
        assert_eq!(sizes, vec![2, 0, 0, 0]);
    }

    #[test]
    fn test_paths_are_distinct() {
        let shards = plan_shards(Path::new("/w"), 100, 8);
        let mut paths: Vec<_> = shards.iter().map(|s| s.path.clone()).collect();
        paths.dedup();
        assert_eq!(paths.len(), 8);
    }
}
