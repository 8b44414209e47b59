//! Uniform random offsets
//!
//! Every block of a shard is equally likely. Backed by xoshiro256++, which is
//! cheap enough to be called once or twice per IOPS operation.

use super::Distribution;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Uniform block number generator, one per worker
#[derive(Debug, Clone)]
pub struct UniformDistribution {
    rng: Xoshiro256PlusPlus,
}

impl UniformDistribution {
    /// Entropy-seeded generator
    pub fn new() -> Self {
        Self {
            rng: Xoshiro256PlusPlus::from_entropy(),
        }
    }

    /// Fixed-seed generator for reproducible access patterns
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// Generator for worker `index`
    ///
    /// With a base seed, worker `i` uses `seed + i` so that workers do not
    /// replay each other's offsets. Without one, each worker draws entropy.
    pub fn for_worker(seed: Option<u64>, index: usize) -> Self {
        match seed {
            Some(seed) => Self::with_seed(seed.wrapping_add(index as u64)),
            None => Self::new(),
        }
    }
}

impl Default for UniformDistribution {
    fn default() -> Self {
        Self::new()
    }
}

impl Distribution for UniformDistribution {
    #[inline(always)]
    fn next_block(&mut self, num_blocks: u64) -> u64 {
        match num_blocks {
            0 => 0,
            n => self.rng.gen_range(0..n),
        }
    }

    #[inline(always)]
    fn chance(&mut self, percent: u8) -> bool {
        match percent {
            0 => false,
            p if p >= 100 => true,
            p => self.rng.gen_range(0..100u8) < p,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_range() {
        let mut dist = UniformDistribution::with_seed(42);
        for _ in 0..1000 {
            assert!(dist.next_block(100) < 100);
        }
        assert_eq!(dist.next_block(0), 0);
        assert_eq!(dist.next_block(1), 0);
    }

    #[test]
    fn test_uniform_covers_range() {
        let mut dist = UniformDistribution::with_seed(7);
        let mut seen = [false; 16];
        for _ in 0..2000 {
            seen[dist.next_block(16) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_uniform_seed_reproducible() {
        let mut a = UniformDistribution::with_seed(9);
        let mut b = UniformDistribution::with_seed(9);
        for _ in 0..100 {
            assert_eq!(a.next_block(1 << 20), b.next_block(1 << 20));
        }
    }

    #[test]
    fn test_chance_extremes_and_ratio() {
        let mut dist = UniformDistribution::with_seed(3);
        assert!((0..100).all(|_| !dist.chance(0)));
        assert!((0..100).all(|_| dist.chance(100)));

        let hits = (0..10_000).filter(|_| dist.chance(10)).count();
        assert!(hits > 700 && hits < 1300, "hits = {}", hits);
    }

    #[test]
    fn test_workers_get_distinct_streams() {
        let mut first = UniformDistribution::for_worker(Some(5), 0);
        let mut second = UniformDistribution::for_worker(Some(5), 1);
        let mut again = UniformDistribution::for_worker(Some(5), 1);

        let a: Vec<u64> = (0..32).map(|_| first.next_block(1 << 30)).collect();
        let b: Vec<u64> = (0..32).map(|_| second.next_block(1 << 30)).collect();
        let c: Vec<u64> = (0..32).map(|_| again.next_block(1 << 30)).collect();
        assert_ne!(a, b);
        assert_eq!(b, c);
    }
}
