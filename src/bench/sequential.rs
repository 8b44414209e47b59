//! Sequential write and read phases
//!
//! Each worker owns one shard file. The writer repeats the payload block from
//! offset 0 until the shard quota is reached (the last write is truncated to
//! the remaining bytes) and syncs the file so the phase includes device
//! completion. The reader reads the file back in block-sized chunks until end
//! of file and checks that exactly the shard size came back.

use super::Phase;
use crate::engine::{IOEngine, OpenFlags};
use crate::target::WorkerShard;
use crate::util::buffer::RandomBlock;
use crate::worker::run_phase;
use crate::Result;
use anyhow::Context;
use std::time::Duration;
use tracing::debug;

/// Aggregate result of a sequential phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequentialOutcome {
    /// Bytes transferred by all workers
    pub bytes: u64,
    /// Release to slowest-worker finish
    pub elapsed: Duration,
}

/// Write every shard in parallel
pub fn run_write_phase(
    engine: &dyn IOEngine,
    shards: &[WorkerShard],
    block: &RandomBlock,
) -> Result<SequentialOutcome> {
    let timing = run_phase(
        Phase::SequentialWrite.worker_name(),
        shards.len(),
        |index, _| write_shard(engine, &shards[index], block),
    )?;

    Ok(SequentialOutcome {
        bytes: timing.outputs.iter().sum(),
        elapsed: timing.elapsed,
    })
}

/// Read every shard back in parallel
///
/// With `verify` set each chunk is compared against the payload written at
/// the same offset.
pub fn run_read_phase(
    engine: &dyn IOEngine,
    shards: &[WorkerShard],
    block: &RandomBlock,
    verify: bool,
) -> Result<SequentialOutcome> {
    let timing = run_phase(
        Phase::SequentialRead.worker_name(),
        shards.len(),
        |index, _| read_shard(engine, &shards[index], block, verify),
    )?;

    Ok(SequentialOutcome {
        bytes: timing.outputs.iter().sum(),
        elapsed: timing.elapsed,
    })
}

/// Fill one shard with the repeated payload and sync it
///
/// Returns the number of bytes written, always `shard.size` on success.
pub fn write_shard(engine: &dyn IOEngine, shard: &WorkerShard, block: &RandomBlock) -> Result<u64> {
    if block.is_empty() && shard.size > 0 {
        anyhow::bail!("empty payload block cannot fill {}", shard.path.display());
    }

    let mut file = engine
        .open(&shard.path, OpenFlags::create_write())
        .with_context(|| format!("Failed to create shard {}", shard.index))?;

    let mut offset = 0u64;
    while offset < shard.size {
        let len = (shard.size - offset).min(block.len() as u64) as usize;
        file.write_at(&block[..len], offset)?;
        offset += len as u64;
    }
    file.sync_data()?;

    debug!(worker = shard.index, bytes = offset, "shard written");
    Ok(offset)
}

/// Read one shard until end of file
///
/// Fails if the byte count differs from `shard.size`, or on the first
/// payload mismatch when `verify` is set.
pub fn read_shard(
    engine: &dyn IOEngine,
    shard: &WorkerShard,
    block: &RandomBlock,
    verify: bool,
) -> Result<u64> {
    let mut file = engine
        .open(&shard.path, OpenFlags::read_only())
        .with_context(|| format!("Failed to open shard {}", shard.index))?;

    let mut buffer = vec![0u8; block.len()];
    let mut total = 0u64;

    loop {
        let n = file.read_at(&mut buffer, total)?;
        if n == 0 {
            break;
        }
        if verify {
            block.verify(&buffer[..n], total).map_err(|at| {
                anyhow::anyhow!(
                    "payload mismatch in {} at offset {}",
                    shard.path.display(),
                    at
                )
            })?;
        }
        total += n as u64;
    }

    if total != shard.size {
        anyhow::bail!(
            "short read from {}: expected {} bytes, got {}",
            shard.path.display(),
            shard.size,
            total
        );
    }

    debug!(worker = shard.index, bytes = total, "shard read");
    Ok(total)
}
