//! Round scheduling: which blocks occupy the cache next.
//!
//! A scheduler is a pure decision component. Once per round the engine hands
//! it the cache state and the per-block walk distribution, and it returns a
//! working set of at most `capacity` block assignments for the cache to
//! realize. Five interchangeable policies share the contract; they differ
//! only in how they trade pending walks against the I/O cost of swapping
//! blocks in.

use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::cache::BlockCache;
use crate::error::{Result, WalkError};
use crate::types::Bid;
use crate::walk::WalkManager;

/// One scheduled block pair tagged with the cache slot it occupies.
///
/// `src` records the predecessor block for pair-aware policies; the shipped
/// first-order policies schedule single blocks, so `src == dst`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub src: Bid,
    pub dst: Bid,
    pub slot: usize,
}

impl Assignment {
    /// First-order assignment: the pair degenerates to one block.
    pub fn single(block: Bid, slot: usize) -> Self {
        Self {
            src: block,
            dst: block,
            slot,
        }
    }
}

/// The scheduler's output for one round. Never larger than the cache
/// capacity; recomputed every round, never persisted.
pub type WorkingSet = Vec<Assignment>;

/// Per-round block selection contract.
pub trait Scheduler {
    fn schedule(&mut self, cache: &BlockCache, walks: &WalkManager) -> Result<WorkingSet>;
}

/// Blocks with pending walkers, as `(block, pending)` pairs.
fn pending_blocks(walks: &WalkManager) -> Vec<(Bid, u64)> {
    walks
        .pending_counts()
        .into_iter()
        .enumerate()
        .filter(|&(_, n)| n > 0)
        .map(|(b, n)| (b as Bid, n))
        .collect()
}

/// Maps chosen blocks onto cache slots: resident blocks keep their slot,
/// the rest take freed slots in index order.
fn plan_slots(chosen: &[Bid], cache: &BlockCache) -> Result<WorkingSet> {
    if chosen.len() > cache.capacity() {
        return Err(WalkError::SchedulerInfeasible(format!(
            "{} blocks chosen for {} slots",
            chosen.len(),
            cache.capacity()
        )));
    }
    let kept: Vec<Option<usize>> = chosen.iter().map(|&b| cache.slot_of(b)).collect();
    let used: Vec<usize> = kept.iter().flatten().copied().collect();
    let mut free = (0..cache.capacity()).filter(|s| !used.contains(s));
    chosen
        .iter()
        .zip(kept)
        .map(|(&b, slot)| {
            let slot = match slot {
                Some(s) => s,
                None => free.next().ok_or_else(|| {
                    WalkError::SchedulerInfeasible("ran out of cache slots".into())
                })?,
            };
            Ok(Assignment::single(b, slot))
        })
        .collect()
}

/// Cost of bringing `b` into the cache, in units of the mean block size;
/// zero when already resident.
fn load_cost(b: Bid, cache: &BlockCache, mean_bytes: f64) -> f64 {
    if cache.slot_of(b).is_some() {
        0.0
    } else {
        cache.partition().block_bytes(b) as f64 / mean_bytes
    }
}

fn mean_block_bytes(cache: &BlockCache) -> f64 {
    let p = cache.partition();
    let total: u64 = (0..p.nblocks() as Bid).map(|b| p.block_bytes(b)).sum();
    (total as f64 / p.nblocks() as f64).max(1.0)
}

/// Largest pending-walk counts win, ties broken by block index.
#[derive(Debug, Default)]
pub struct NaiveScheduler;

impl NaiveScheduler {
    pub fn new() -> Self {
        Self
    }
}

fn naive_pick(walks: &WalkManager, capacity: usize) -> Vec<Bid> {
    let mut pending = pending_blocks(walks);
    pending.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    pending.truncate(capacity);
    pending.into_iter().map(|(b, _)| b).collect()
}

impl Scheduler for NaiveScheduler {
    fn schedule(&mut self, cache: &BlockCache, walks: &WalkManager) -> Result<WorkingSet> {
        plan_slots(&naive_pick(walks, cache.capacity()), cache)
    }
}

/// Incrementally adds the block with the best marginal walks-per-load-cost
/// until capacity is exhausted. Resident blocks cost nothing to keep, so
/// the policy leans toward cache stability.
#[derive(Debug, Default)]
pub struct GreedyScheduler;

impl GreedyScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for GreedyScheduler {
    fn schedule(&mut self, cache: &BlockCache, walks: &WalkManager) -> Result<WorkingSet> {
        let mean = mean_block_bytes(cache);
        let mut remaining = pending_blocks(walks);
        let mut chosen = Vec::new();
        while chosen.len() < cache.capacity() && !remaining.is_empty() {
            let (idx, _) = remaining
                .iter()
                .enumerate()
                .map(|(i, &(b, n))| (i, n as f64 / (1.0 + load_cost(b, cache, mean)), b))
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)
                    .then(b.2.cmp(&a.2)))
                .map(|(i, s, _)| (i, s))
                .expect("remaining is non-empty");
            chosen.push(remaining.swap_remove(idx).0);
        }
        chosen.sort_unstable();
        plan_slots(&chosen, cache)
    }
}

/// Samples blocks weighted by pending-walk count; the empirical baseline.
#[derive(Debug)]
pub struct RandomScheduler {
    rng: ChaCha8Rng,
}

impl RandomScheduler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Scheduler for RandomScheduler {
    fn schedule(&mut self, cache: &BlockCache, walks: &WalkManager) -> Result<WorkingSet> {
        let mut pending = pending_blocks(walks);
        let mut chosen = Vec::new();
        while chosen.len() < cache.capacity() && !pending.is_empty() {
            let weights: Vec<u64> = pending.iter().map(|&(_, n)| n).collect();
            let dist = WeightedIndex::new(&weights).map_err(|e| {
                WalkError::SchedulerInfeasible(format!("bad sampling weights: {e}"))
            })?;
            let idx = dist.sample(&mut self.rng);
            chosen.push(pending.swap_remove(idx).0);
        }
        chosen.sort_unstable();
        plan_slots(&chosen, cache)
    }
}

/// Simulated annealing over single-block swaps.
///
/// Starts from the naive pick and iterates candidate working sets, scoring
/// each by pending walks served minus a churn penalty for blocks that would
/// have to be read from disk. Worsening swaps are accepted with probability
/// `exp(delta / T)` under geometric cooling, so the search can escape the
/// naive pick when cache stability pays better.
#[derive(Debug)]
pub struct AnnealingScheduler {
    rng: ChaCha8Rng,
    max_iter: usize,
    churn_penalty: f64,
}

impl AnnealingScheduler {
    pub fn new(seed: u64, max_iter: usize) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            max_iter,
            churn_penalty: 0.5,
        }
    }
}

impl Scheduler for AnnealingScheduler {
    fn schedule(&mut self, cache: &BlockCache, walks: &WalkManager) -> Result<WorkingSet> {
        let mean = mean_block_bytes(cache);
        let counts = walks.pending_counts();
        let avg_pending =
            (counts.iter().sum::<u64>() as f64 / counts.len() as f64).max(1.0);
        let churn = self.churn_penalty;
        // Objective stays in walk units: walks a block serves minus the
        // churn penalty scaled by its load cost.
        let gain =
            |b: Bid| counts[b as usize] as f64 - churn * avg_pending * load_cost(b, cache, mean);

        let mut selected = naive_pick(walks, cache.capacity());
        let mut others: Vec<Bid> = pending_blocks(walks)
            .into_iter()
            .map(|(b, _)| b)
            .filter(|b| !selected.contains(b))
            .collect();
        if !selected.is_empty() && !others.is_empty() {
            let mut temp = (counts.iter().sum::<u64>() as f64 / 10.0).max(1.0);
            for _ in 0..self.max_iter {
                let i = self.rng.gen_range(0..selected.len());
                let j = self.rng.gen_range(0..others.len());
                let delta = gain(others[j]) - gain(selected[i]);
                if delta > 0.0 || self.rng.gen::<f64>() < (delta / temp).exp() {
                    std::mem::swap(&mut selected[i], &mut others[j]);
                }
                temp = (temp * 0.97).max(1e-3);
            }
        }
        selected.sort_unstable();
        plan_slots(&selected, cache)
    }
}

/// Linear-programming relaxation of the block assignment.
///
/// With unit slot weights the relaxed problem is a fractional knapsack:
/// maximize pending walks served minus churn, subject to at most `capacity`
/// chosen blocks. The optimum sorts blocks by adjusted score and the
/// integral rounding takes the top prefix; fully deterministic.
#[derive(Debug)]
pub struct LpScheduler {
    churn_penalty: f64,
}

impl LpScheduler {
    pub fn new() -> Self {
        Self { churn_penalty: 0.5 }
    }
}

impl Default for LpScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for LpScheduler {
    fn schedule(&mut self, cache: &BlockCache, walks: &WalkManager) -> Result<WorkingSet> {
        let mean = mean_block_bytes(cache);
        let mut scored: Vec<(f64, Bid)> = pending_blocks(walks)
            .into_iter()
            .map(|(b, n)| (n as f64 - self.churn_penalty * load_cost(b, cache, mean), b))
            .collect();
        // Progress needs a non-empty working set while walks remain, so
        // negative scores still rank rather than being dropped.
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        scored.truncate(cache.capacity());
        let mut chosen: Vec<Bid> = scored.into_iter().map(|(_, b)| b).collect();
        chosen.sort_unstable();
        plan_slots(&chosen, cache)
    }
}
