//! Bounded pool of in-memory block slots.
//!
//! The cache holds no replacement policy of its own: it realizes whatever
//! working set the scheduler decided, evicting everything else. Eviction
//! flushes the departing block's walk queues through the walk manager before
//! the slot is reused.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::block::{BlockPartitioning, BlockView};
use crate::config::GraphConfig;
use crate::driver::StorageDriver;
use crate::error::{Result, WalkError};
use crate::schedule::WorkingSet;
use crate::types::Bid;
use crate::walk::WalkManager;

/// One fixed buffer; holds the edge data of at most one block.
struct CacheSlot {
    block: Option<Bid>,
    buf: Vec<u8>,
}

pub struct BlockCache {
    partition: Arc<BlockPartitioning>,
    driver: Arc<dyn StorageDriver>,
    slots: Vec<CacheSlot>,
    weighted: bool,
}

impl BlockCache {
    pub fn new(
        conf: &GraphConfig,
        partition: Arc<BlockPartitioning>,
        driver: Arc<dyn StorageDriver>,
    ) -> Result<Self> {
        conf.validate()?;
        let ncblock = conf.ncblock().min(partition.nblocks());
        let slots = (0..ncblock)
            .map(|_| CacheSlot {
                block: None,
                buf: Vec::with_capacity(conf.blocksize),
            })
            .collect();
        Ok(Self {
            partition,
            driver,
            slots,
            weighted: conf.weighted,
        })
    }

    /// Number of cache slots (`ncblock`).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slot currently holding block `b`, if resident.
    pub fn slot_of(&self, b: Bid) -> Option<usize> {
        self.partition.slot_of(b)
    }

    pub fn partition(&self) -> &BlockPartitioning {
        &self.partition
    }

    /// Blocks currently occupying slots, in slot order.
    pub fn resident_blocks(&self) -> Vec<Bid> {
        self.slots.iter().filter_map(|s| s.block).collect()
    }

    /// Realizes the scheduler's plan: evicts blocks absent from `ws`
    /// (dumping their walk queues first), then reads edge data for newly
    /// scheduled blocks into their assigned slots.
    pub fn assign(&mut self, ws: &WorkingSet, walks: &WalkManager) -> Result<()> {
        if ws.len() > self.slots.len() {
            return Err(WalkError::SchedulerInfeasible(format!(
                "{} assignments for {} slots",
                ws.len(),
                self.slots.len()
            )));
        }
        let wanted: HashSet<Bid> = ws.iter().map(|a| a.dst).collect();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if let Some(b) = slot.block {
                if !wanted.contains(&b) {
                    walks.dump_walks(b)?;
                    self.partition.set_slot(b, None);
                    slot.block = None;
                    debug!(block = b, slot = i, "evicted block");
                }
            }
        }
        for a in ws {
            if a.slot >= self.slots.len() {
                return Err(WalkError::SchedulerInfeasible(format!(
                    "slot {} out of range",
                    a.slot
                )));
            }
            match self.partition.slot_of(a.dst) {
                Some(s) if s == a.slot => {}
                Some(s) => {
                    return Err(WalkError::SchedulerInfeasible(format!(
                        "block {} resident in slot {s} but scheduled into {}",
                        a.dst, a.slot
                    )));
                }
                None => {
                    let slot = &mut self.slots[a.slot];
                    if let Some(held) = slot.block {
                        return Err(WalkError::SchedulerInfeasible(format!(
                            "slot {} still holds block {held}",
                            a.slot
                        )));
                    }
                    self.driver.read_block_edges(a.dst, &mut slot.buf)?;
                    slot.block = Some(a.dst);
                    self.partition.set_slot(a.dst, Some(a.slot));
                    debug!(block = a.dst, slot = a.slot, "loaded block");
                }
            }
        }
        Ok(())
    }

    /// Edge view of a resident block; `None` when not resident.
    pub fn view(&self, b: Bid) -> Option<BlockView<'_>> {
        let idx = self.partition.slot_of(b)?;
        let slot = &self.slots[idx];
        if slot.block != Some(b) {
            return None;
        }
        let (first, end) = self.partition.range(b);
        BlockView::new(&slot.buf, first, (end - first) as usize, self.weighted).ok()
    }
}
