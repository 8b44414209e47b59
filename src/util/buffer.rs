//! Random payload block
//!
//! A single block of pseudo-random bytes is generated once per session and
//! written repeatedly by every sequential writer. Generating it once keeps the
//! write phase dominated by IO rather than by random number generation.
//!
//! The block is immutable after creation, so it can be shared between worker
//! threads by reference (or `Arc`) without locking.

use rand::RngCore;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::collections::TryReserveError;
use std::ops::Deref;

/// Immutable block of pseudo-random bytes
#[derive(Debug)]
pub struct RandomBlock {
    data: Box<[u8]>,
}

impl RandomBlock {
    /// Allocate and fill a block of `size` bytes from an entropy-seeded PRNG
    ///
    /// # Errors
    ///
    /// Returns the allocator's error if `size` bytes cannot be reserved.
    pub fn generate(size: usize) -> Result<Self, TryReserveError> {
        Self::fill_with(size, Xoshiro256PlusPlus::from_entropy())
    }

    /// Allocate and fill a block from a fixed seed
    ///
    /// Useful for reproducible tests.
    pub fn with_seed(size: usize, seed: u64) -> Result<Self, TryReserveError> {
        Self::fill_with(size, Xoshiro256PlusPlus::seed_from_u64(seed))
    }

    fn fill_with(size: usize, mut rng: Xoshiro256PlusPlus) -> Result<Self, TryReserveError> {
        let mut data = Vec::new();
        data.try_reserve_exact(size)?;
        data.resize(size, 0);
        rng.fill_bytes(&mut data);

        Ok(Self {
            data: data.into_boxed_slice(),
        })
    }

    /// Size of the block in bytes
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Payload bytes a sequential writer places at `offset` of a shard file
    ///
    /// Writers repeat the block from offset 0, so the byte at `offset` is
    /// `block[offset % len]`. Returns at most `len` bytes, stopping at the
    /// end of the block.
    pub fn slice_at(&self, offset: u64, len: usize) -> &[u8] {
        if self.data.is_empty() {
            return &[];
        }
        let start = (offset % self.data.len() as u64) as usize;
        let end = (start + len).min(self.data.len());
        &self.data[start..end]
    }

    /// Compare `buffer` (read from `offset`) against the expected payload
    ///
    /// Returns the absolute file offset of the first mismatching byte.
    pub fn verify(&self, buffer: &[u8], offset: u64) -> Result<(), u64> {
        let mut checked = 0usize;
        while checked < buffer.len() {
            let position = offset + checked as u64;
            let expected = self.slice_at(position, buffer.len() - checked);
            if expected.is_empty() {
                return Err(position);
            }
            let actual = &buffer[checked..checked + expected.len()];
            if let Some(i) = actual.iter().zip(expected).position(|(a, e)| a != e) {
                return Err(position + i as u64);
            }
            checked += expected.len();
        }
        Ok(())
    }
}

impl Deref for RandomBlock {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_size() {
        let block = RandomBlock::generate(65536).unwrap();
        assert_eq!(block.len(), 65536);
        // 64 KiB of xoshiro output is not all zeros
        assert!(block.iter().any(|&b| b != 0));
    }

    #[test]
    fn test_seeded_blocks_are_reproducible() {
        let a = RandomBlock::with_seed(4096, 7).unwrap();
        let b = RandomBlock::with_seed(4096, 7).unwrap();
        let c = RandomBlock::with_seed(4096, 8).unwrap();
        assert_eq!(&a[..], &b[..]);
        assert_ne!(&a[..], &c[..]);
    }

    #[test]
    fn test_allocation_failure_is_reported() {
        assert!(RandomBlock::generate(usize::MAX).is_err());
    }

    #[test]
    fn test_slice_at_wraps() {
        let block = RandomBlock::with_seed(16, 1).unwrap();
        assert_eq!(block.slice_at(0, 4), &block[0..4]);
        assert_eq!(block.slice_at(20, 4), &block[4..8]);
        // Stops at the end of the block
        assert_eq!(block.slice_at(14, 8), &block[14..16]);
    }

    #[test]
    fn test_verify_repeated_payload() {
        let block = RandomBlock::with_seed(8, 3).unwrap();
        let mut file = Vec::new();
        file.extend_from_slice(&block);
        file.extend_from_slice(&block);
        file.extend_from_slice(&block[..3]);

        assert_eq!(block.verify(&file, 0), Ok(()));
        assert_eq!(block.verify(&file[8..], 8), Ok(()));

        file[13] ^= 0xFF;
        assert_eq!(block.verify(&file, 0), Err(13));
        assert_eq!(block.verify(&file[8..], 8), Err(13));
    }
}
