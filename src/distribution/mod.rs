//! Random offset distributions
//!
//! Distributions generate block numbers (0, 1, 2, ..., N-1) rather than byte
//! offsets, so offsets stay aligned to the operation size. The IOPS worker
//! converts: `offset = block_num * block_size`.
//!
//! # Example
//!
//! ```
//! use diskspeed::distribution::{Distribution, uniform::UniformDistribution};
//!
//! let mut dist = UniformDistribution::with_seed(1);
//! let block_num = dist.next_block(1024);
//! assert!(block_num < 1024);
//! ```

/// Distribution trait for block number generation
///
/// Each worker owns its own instance, so implementations need `Send` but no
/// internal synchronization.
pub trait Distribution: Send {
    /// Block number in the range [0, num_blocks); 0 when `num_blocks` is 0
    fn next_block(&mut self, num_blocks: u64) -> u64;

    /// True with probability `percent`/100
    fn chance(&mut self, percent: u8) -> bool;
}

pub mod uniform;
