//! Walk manager: per-block walker queues and their movement between memory
//! and disk.
//!
//! Every block owns two disjoint queues: the memory-resident queue feeding
//! the active batch while the block occupies a cache slot, and the
//! disk-resident queue (an on-disk record stream plus an in-memory append
//! buffer flushed each round). A walker is always in exactly one of them
//! until it completes; the `created`, `completed` and `lost` counters make
//! that conservation checkable from the outside.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::block::BlockPartitioning;
use crate::driver::StorageDriver;
use crate::error::{Result, WalkError};
use crate::types::{Bid, Walker};

pub struct WalkManager {
    partition: Arc<BlockPartitioning>,
    driver: Arc<dyn StorageDriver>,
    mem: Vec<Mutex<Vec<Walker>>>,
    disk_buf: Vec<Mutex<Vec<Walker>>>,
    /// Records in each block's on-disk queue file.
    disk_total: Vec<AtomicU64>,
    /// Consumed prefix of each queue file; records before it are already
    /// drained into batches.
    disk_head: Vec<AtomicU64>,
    created: AtomicU64,
    completed: AtomicU64,
    lost: AtomicU64,
}

impl WalkManager {
    pub fn new(partition: Arc<BlockPartitioning>, driver: Arc<dyn StorageDriver>) -> Self {
        let nblocks = partition.nblocks();
        Self {
            partition,
            driver,
            mem: (0..nblocks).map(|_| Mutex::new(Vec::new())).collect(),
            disk_buf: (0..nblocks).map(|_| Mutex::new(Vec::new())).collect(),
            disk_total: (0..nblocks).map(|_| AtomicU64::new(0)).collect(),
            disk_head: (0..nblocks).map(|_| AtomicU64::new(0)).collect(),
            created: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            lost: AtomicU64::new(0),
        }
    }

    pub fn nblocks(&self) -> usize {
        self.mem.len()
    }

    pub fn partition(&self) -> &BlockPartitioning {
        &self.partition
    }

    /// Walkers waiting in block `b`'s memory-resident queue.
    pub fn mem_pending(&self, b: Bid) -> usize {
        self.mem[b as usize].lock().len()
    }

    /// Walkers waiting in block `b`'s disk-resident queue, buffered appends
    /// included.
    pub fn disk_pending(&self, b: Bid) -> u64 {
        self.disk_file_pending(b) + self.disk_buf[b as usize].lock().len() as u64
    }

    /// Unconsumed records in block `b`'s queue file.
    pub fn disk_file_pending(&self, b: Bid) -> u64 {
        self.disk_total[b as usize].load(Ordering::Acquire)
            - self.disk_head[b as usize].load(Ordering::Acquire)
    }

    /// Total pending walkers per block, the scheduler's dominant signal.
    pub fn pending_counts(&self) -> Vec<u64> {
        (0..self.nblocks() as Bid)
            .map(|b| self.mem_pending(b) as u64 + self.disk_pending(b))
            .collect()
    }

    /// Walkers pending anywhere.
    pub fn nwalks(&self) -> u64 {
        (0..self.nblocks() as Bid)
            .map(|b| self.mem_pending(b) as u64 + self.disk_pending(b))
            .sum()
    }

    /// True once every queue is empty; the engine's termination predicate.
    pub fn test_finished_walks(&self) -> bool {
        self.nwalks() == 0
    }

    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Acquire)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    /// Walkers dropped as corrupt; a non-zero value is the discrepancy the
    /// conservation check will report.
    pub fn lost(&self) -> u64 {
        self.lost.load(Ordering::Acquire)
    }

    pub(crate) fn mark_completed(&self) {
        self.completed.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn mark_lost(&self, n: u64) {
        self.lost.fetch_add(n, Ordering::AcqRel);
    }

    /// Registers a newly created walker and routes it; seeding entry point.
    pub fn add_walk(&self, walker: Walker) {
        self.created.fetch_add(1, Ordering::AcqRel);
        self.move_walk(walker);
    }

    /// Routes a walker into its destination block's queue: memory-resident
    /// when that block currently occupies a cache slot, the disk append
    /// buffer otherwise. Safe to call from worker threads; the per-block
    /// lock is held only for the push.
    pub fn move_walk(&self, walker: Walker) {
        let b = walker.cur_block as usize;
        if b >= self.nblocks() {
            warn!(
                walker = walker.id,
                block = walker.cur_block,
                "walker routed to nonexistent block, dropping"
            );
            self.mark_lost(1);
            return;
        }
        if self.partition.slot_of(walker.cur_block).is_some() {
            self.mem[b].lock().push(walker);
        } else {
            self.disk_buf[b].lock().push(walker);
        }
    }

    /// Moves up to `limit` walkers from block `b`'s memory queue into
    /// `batch`. Returns the number moved.
    pub fn load_memory_walks(&self, b: Bid, limit: usize, batch: &mut Vec<Walker>) -> usize {
        let mut queue = self.mem[b as usize].lock();
        let take = limit.min(queue.len());
        batch.extend(queue.drain(..take));
        take
    }

    /// Reads up to `limit` walkers from block `b`'s on-disk queue, starting
    /// `offset` records past the consumed prefix, into `batch`. Corrupt or
    /// out-of-range records are dropped and counted as lost. Returns the
    /// number of valid walkers loaded; the caller accounts consumed records
    /// through [`WalkManager::finish_disk_drain`].
    pub fn load_disk_walks(
        &self,
        b: Bid,
        limit: usize,
        offset: u64,
        batch: &mut Vec<Walker>,
    ) -> Result<usize> {
        let head = self.disk_head[b as usize].load(Ordering::Acquire);
        let chunk = self.driver.read_walk_queue(b, head + offset, limit)?;
        let mut invalid = chunk.dropped;
        let mut loaded = 0;
        for w in chunk.walkers {
            if self.validate(&w) {
                batch.push(w);
                loaded += 1;
            } else {
                invalid += 1;
            }
        }
        if invalid > 0 {
            warn!(block = b, dropped = invalid, "dropped corrupt walker records");
            self.mark_lost(invalid);
        }
        Ok(loaded)
    }

    /// Commits a round's drain of block `b`: advances the consumed prefix by
    /// `consumed` records and truncates the queue file once fully consumed.
    pub fn finish_disk_drain(&self, b: Bid, consumed: u64) -> Result<()> {
        let head = self.disk_head[b as usize].fetch_add(consumed, Ordering::AcqRel) + consumed;
        let total = self.disk_total[b as usize].load(Ordering::Acquire);
        if head > total {
            return Err(WalkError::Storage(format!(
                "block {b} drained {head} of {total} queued records"
            )));
        }
        if total > 0 && head == total {
            self.driver.write_walk_queue(b, &[])?;
            self.disk_head[b as usize].store(0, Ordering::Release);
            self.disk_total[b as usize].store(0, Ordering::Release);
        }
        Ok(())
    }

    /// Persists block `b`'s leftover memory-resident walkers and buffered
    /// appends, clearing both in-memory queues; called when the block leaves
    /// the working set.
    pub fn dump_walks(&self, b: Bid) -> Result<()> {
        let mut out = std::mem::take(&mut *self.mem[b as usize].lock());
        out.append(&mut self.disk_buf[b as usize].lock());

        let head = self.disk_head[b as usize].load(Ordering::Acquire);
        let total = self.disk_total[b as usize].load(Ordering::Acquire);
        if head == total {
            // Fully consumed file: rewriting drops the stale prefix.
            if head > 0 || !out.is_empty() {
                self.driver.write_walk_queue(b, &out)?;
                self.disk_head[b as usize].store(0, Ordering::Release);
                self.disk_total[b as usize].store(out.len() as u64, Ordering::Release);
            }
        } else if !out.is_empty() {
            self.driver.append_walk_queue(b, &out)?;
            self.disk_total[b as usize]
                .fetch_add(out.len() as u64, Ordering::AcqRel);
        }
        Ok(())
    }

    /// Flushes every block's append buffer to disk. Called at the end of
    /// each round so dumps are durable before the next schedule, and after
    /// seeding.
    pub fn flush_pending(&self) -> Result<()> {
        for b in 0..self.nblocks() as Bid {
            let buffered = std::mem::take(&mut *self.disk_buf[b as usize].lock());
            if !buffered.is_empty() {
                self.driver.append_walk_queue(b, &buffered)?;
                self.disk_total[b as usize]
                    .fetch_add(buffered.len() as u64, Ordering::AcqRel);
            }
        }
        Ok(())
    }

    fn validate(&self, w: &Walker) -> bool {
        let nblocks = self.partition.nblocks() as Bid;
        if w.cur_block >= nblocks || w.source_block >= nblocks {
            return false;
        }
        let (first, end) = self.partition.range(w.cur_block);
        (first..end).contains(&w.cur) && w.source < self.partition.nvertices()
    }
}
