//! Random IOPS phase
//!
//! Every worker opens its shard for reading and writing and issues
//! operations of `block_size` bytes at block-aligned, uniformly random
//! offsets until the shared deadline (release instant + duration). A share
//! of `write_percent` operations are writes. Writes put back the payload
//! bytes the sequential writer placed at that offset, so the shard content
//! never changes.

use super::Phase;
use crate::distribution::uniform::UniformDistribution;
use crate::distribution::Distribution;
use crate::engine::{EngineFile, IOEngine, OpenFlags};
use crate::target::WorkerShard;
use crate::util::buffer::RandomBlock;
use crate::worker::run_phase;
use crate::Result;
use anyhow::Context;
use std::time::{Duration, Instant};
use tracing::debug;

/// Parameters of the IOPS phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IopsSettings {
    /// Time each worker keeps issuing operations
    pub duration: Duration,
    /// Size of one operation
    pub block_size: usize,
    /// Share of operations that are writes (0-100)
    pub write_percent: u8,
    /// Base seed for the offset generators; worker `i` uses `seed + i`
    pub seed: Option<u64>,
}

/// Aggregate result of the IOPS phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IopsOutcome {
    /// Operations completed by all workers
    pub operations: u64,
    /// Release to slowest-worker finish
    pub elapsed: Duration,
}

/// Run random operations on every shard until the deadline
pub fn run_iops_phase(
    engine: &dyn IOEngine,
    shards: &[WorkerShard],
    block: &RandomBlock,
    settings: &IopsSettings,
) -> Result<IopsOutcome> {
    let timing = run_phase(Phase::Iops.worker_name(), shards.len(), |index, released_at| {
        let mut distribution = UniformDistribution::for_worker(settings.seed, index);
        let deadline = released_at
            .checked_add(settings.duration)
            .context("IOPS duration out of range")?;
        iops_shard(engine, &shards[index], block, settings, &mut distribution, deadline)
    })?;

    Ok(IopsOutcome {
        operations: timing.outputs.iter().sum(),
        elapsed: timing.elapsed,
    })
}

/// Issue random operations on one shard until `deadline`
///
/// The clock is checked before every operation, so an operation in flight at
/// the deadline still completes and counts. An empty shard returns at once.
pub fn iops_shard(
    engine: &dyn IOEngine,
    shard: &WorkerShard,
    block: &RandomBlock,
    settings: &IopsSettings,
    distribution: &mut dyn Distribution,
    deadline: Instant,
) -> Result<u64> {
    if shard.size == 0 || settings.block_size == 0 {
        return Ok(0);
    }

    // A shard smaller than one operation gets a single whole-file operation
    let op_size = (settings.block_size as u64).min(shard.size);
    let num_blocks = shard.size / op_size;

    let mut file = engine
        .open(&shard.path, OpenFlags::read_write())
        .with_context(|| format!("Failed to open shard {}", shard.index))?;
    let mut buffer = vec![0u8; op_size as usize];
    let mut operations = 0u64;

    while Instant::now() < deadline {
        let offset = distribution.next_block(num_blocks) * op_size;

        if distribution.chance(settings.write_percent) {
            write_payload(&mut *file, block, offset, op_size as usize)?;
        } else {
            let n = file.read_at(&mut buffer, offset)?;
            if n != buffer.len() {
                anyhow::bail!(
                    "short read from {} at offset {}: {} of {} bytes",
                    shard.path.display(),
                    offset,
                    n,
                    buffer.len()
                );
            }
        }
        operations += 1;
    }

    debug!(worker = shard.index, operations, "IOPS worker done");
    Ok(operations)
}

/// Rewrite `len` payload bytes at `offset`
fn write_payload(file: &mut dyn EngineFile, block: &RandomBlock, offset: u64, len: usize) -> Result<()> {
    let mut done = 0usize;
    while done < len {
        let position = offset + done as u64;
        let piece = block.slice_at(position, len - done);
        if piece.is_empty() {
            anyhow::bail!("empty payload block");
        }
        file.write_at(piece, position)?;
        done += piece.len();
    }
    Ok(())
}
