//! The round loop.
//!
//! One round is a bulk-synchronous pass: ask the scheduler for a working
//! set, realize it in the cache, drain the scheduled blocks' walk queues
//! into interval-bounded batches (memory-resident first, then disk in
//! chunks), execute each batch on the worker pool, and make the round's
//! queue appends durable before the next schedule. Only the controlling
//! thread touches disk; workers never block on I/O.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::app::WalkApp;
use crate::block::BlockPartitioning;
use crate::cache::BlockCache;
use crate::config::{GraphConfig, SEQUENTIAL_EXEC_THRESHOLD};
use crate::driver::StorageDriver;
use crate::error::{Result, WalkError};
use crate::schedule::Scheduler;
use crate::types::Walker;
use crate::walk::WalkManager;

/// What a finished (or capped) run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub rounds: u64,
    pub completed: u64,
    /// Walkers dropped as corrupt; non-zero values flag a conservation
    /// discrepancy without failing the run.
    pub lost: u64,
    /// Walkers still queued; non-zero only when the round cap cut the run
    /// short.
    pub pending: u64,
    pub elapsed: Duration,
}

pub struct Engine {
    conf: GraphConfig,
    partition: Arc<BlockPartitioning>,
    cache: BlockCache,
    walks: WalkManager,
    pool: rayon::ThreadPool,
    round: u64,
    batches: AtomicU64,
}

impl Engine {
    pub fn new(
        conf: GraphConfig,
        partition: BlockPartitioning,
        driver: Arc<dyn StorageDriver>,
    ) -> Result<Self> {
        conf.validate()?;
        let partition = Arc::new(partition);
        let cache = BlockCache::new(&conf, partition.clone(), driver.clone())?;
        let walks = WalkManager::new(partition.clone(), driver);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(conf.nthreads)
            .build()
            .map_err(|e| WalkError::Config(format!("worker pool: {e}")))?;
        Ok(Self {
            conf,
            partition,
            cache,
            walks,
            pool,
            round: 0,
            batches: AtomicU64::new(0),
        })
    }

    pub fn walk_manager(&self) -> &WalkManager {
        &self.walks
    }

    pub fn cache(&self) -> &BlockCache {
        &self.cache
    }

    pub fn partition(&self) -> &BlockPartitioning {
        &self.partition
    }

    /// Rounds completed so far.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Seeds the walker population. Invoked exactly once, before the round
    /// loop: runs the app's prologue hook, then the caller's init closure,
    /// then flushes the seeded walkers to their block queues.
    pub fn prologue<A: WalkApp>(
        &mut self,
        app: &A,
        init: impl FnOnce(&WalkManager),
    ) -> Result<()> {
        info!("=================  started  ======================");
        info!(
            vertices = self.conf.nvertices,
            edges = self.conf.nedges,
            threads = self.conf.nthreads,
            "random walk engine"
        );
        app.prologue(&self.walks);
        init(&self.walks);
        self.walks.flush_pending()?;
        info!(walks = self.walks.created(), "seeded walker population");
        Ok(())
    }

    /// Runs rounds until every walker has completed, or the configured round
    /// cap cuts the run short.
    pub fn run<A: WalkApp>(
        &mut self,
        app: &A,
        scheduler: &mut dyn Scheduler,
    ) -> Result<RunSummary> {
        debug!(
            nblocks = self.partition.nblocks(),
            ncblock = self.cache.capacity(),
            "graph blocks"
        );
        info!("executing random walks");
        let start = Instant::now();
        while !self.walks.test_finished_walks() {
            if let Some(cap) = self.conf.max_rounds {
                if self.round >= cap {
                    warn!(
                        rounds = self.round,
                        pending = self.walks.nwalks(),
                        "round cap reached with walks pending"
                    );
                    break;
                }
            }
            self.run_round(app, scheduler)?;
        }
        let summary = RunSummary {
            rounds: self.round,
            completed: self.walks.completed(),
            lost: self.walks.lost(),
            pending: self.walks.nwalks(),
            elapsed: start.elapsed(),
        };
        info!(
            rounds = summary.rounds,
            completed = summary.completed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "run finished"
        );
        Ok(summary)
    }

    /// Finalizes user aggregate state. Invoked exactly once, after the round
    /// loop.
    pub fn epilogue<A: WalkApp>(&self, app: &A) {
        app.epilogue();
        info!("=================  finished ======================");
    }

    /// One full schedule → assign → load/execute → dump cycle. Public so
    /// callers can interleave their own checks between rounds.
    pub fn run_round<A: WalkApp>(
        &mut self,
        app: &A,
        scheduler: &mut dyn Scheduler,
    ) -> Result<()> {
        debug!(
            round = self.round,
            walks = self.walks.nwalks(),
            "scheduling round"
        );
        let ws = scheduler.schedule(&self.cache, &self.walks)?;
        self.cache.assign(&ws, &self.walks)?;
        debug!(working_set = ws.len(), "cache assigned");

        let interval = self.conf.interval_max_walks();

        // Memory-resident walks first: cheap, already in their queues. One
        // batch accumulates across consecutive working-set entries up to the
        // interval bound, and executes before the next batch loads.
        let mut pos = 0;
        while pos < ws.len() {
            let mut batch = Vec::new();
            while pos < ws.len() && batch.len() < interval {
                let room = interval - batch.len();
                self.walks.load_memory_walks(ws[pos].dst, room, &mut batch);
                if self.walks.mem_pending(ws[pos].dst) == 0 {
                    pos += 1;
                } else {
                    break;
                }
            }
            if !batch.is_empty() {
                debug!(pos, walks = batch.len(), "loaded memory walks");
                self.execute_batch(app, batch);
            }
        }

        // Disk-resident backlogs drain per block, chunked against the same
        // bound so a deep backlog never inflates a single parallel pass.
        for a in &ws {
            let b = a.dst;
            let mut remaining = self.walks.disk_file_pending(b);
            let mut consumed = 0u64;
            while remaining > 0 {
                let take = remaining.min(interval as u64) as usize;
                let mut batch = Vec::with_capacity(take);
                let loaded = self.walks.load_disk_walks(b, take, consumed, &mut batch)?;
                debug!(block = b, walks = loaded, "loaded disk walks");
                consumed += take as u64;
                remaining -= take as u64;
                self.execute_batch(app, batch);
            }
            self.walks.finish_disk_drain(b, consumed)?;
        }

        // Make this round's appends durable before the next schedule sees
        // them.
        self.walks.flush_pending()?;
        self.round += 1;
        Ok(())
    }

    /// Executes one batch of walkers on the worker pool; small batches run
    /// on the controlling thread instead.
    fn execute_batch<A: WalkApp>(&self, app: &A, batch: Vec<Walker>) {
        if batch.is_empty() {
            return;
        }
        let batch_no = self.batches.fetch_add(1, Ordering::AcqRel);
        let base = self.conf.seed.wrapping_add(batch_no.wrapping_mul(0x9e37_79b9));
        if batch.len() < SEQUENTIAL_EXEC_THRESHOLD {
            let mut rng = ChaCha8Rng::seed_from_u64(base);
            for w in batch {
                self.walk_task(app, w, &mut rng);
            }
        } else {
            self.pool.install(|| {
                batch.into_par_iter().for_each_init(
                    || {
                        let tid = rayon::current_thread_index().unwrap_or(0) as u64;
                        ChaCha8Rng::seed_from_u64(base.wrapping_add(1 + tid))
                    },
                    |rng, w| self.walk_task(app, w, rng),
                );
            });
        }
    }

    /// One walker's activation: single-step transitions repeated while the
    /// walker stays inside the block it was batched under, then either
    /// completion or a queue move to its next block.
    fn walk_task<A: WalkApp>(&self, app: &A, mut w: Walker, rng: &mut ChaCha8Rng) {
        let Some(view) = self.cache.view(w.cur_block) else {
            warn!(
                walker = w.id,
                block = w.cur_block,
                "walker batched against a non-resident block, dropping"
            );
            self.walks.mark_lost(1);
            return;
        };
        loop {
            match app.transition(&w, &view, rng) {
                None => {
                    self.walks.mark_completed();
                    return;
                }
                Some(next) => {
                    w.prev = w.cur;
                    w.cur = next;
                    w.step = w.step.saturating_add(1);
                    let nb = self.partition.block_of(next);
                    if nb != w.cur_block {
                        w.source_block = w.cur_block;
                        w.cur_block = nb;
                        self.walks.move_walk(w);
                        return;
                    }
                }
            }
        }
    }
}
