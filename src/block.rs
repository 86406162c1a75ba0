//! Static block partitioning of the vertex space and the per-block edge
//! layout the cache serves to executing walkers.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::config::GraphConfig;
use crate::error::{Result, WalkError};
use crate::types::{Bid, Vid};

const NOT_RESIDENT: u32 = u32::MAX;

/// Ordered division of `[0, nvertices)` into contiguous, gap-free blocks.
///
/// Identity is immutable after construction; the only mutable state is the
/// block-to-cache-slot assignment, stored as atomics so residency checks
/// during batch execution are lock-free.
pub struct BlockPartitioning {
    /// `nblocks + 1` range boundaries; `starts[0] == 0`, last is `nvertices`.
    starts: Vec<Vid>,
    /// Edge-data byte size per block, the scheduler's I/O cost signal.
    bytes: Vec<u64>,
    slots: Vec<AtomicU32>,
}

impl BlockPartitioning {
    /// Splits the vertex space evenly so each block's estimated edge data
    /// fits the configured block size.
    pub fn uniform(conf: &GraphConfig) -> Result<Self> {
        conf.validate()?;
        let esize = if conf.weighted { 8u64 } else { 4u64 };
        let est_total = (conf.nvertices as u64 + 1) * 8 + conf.nedges * esize;
        let mut nblocks = est_total.div_ceil(conf.blocksize as u64) as usize;
        nblocks = nblocks.clamp(1, conf.nvertices as usize);

        let mut starts = Vec::with_capacity(nblocks + 1);
        for i in 0..=nblocks {
            starts.push((i as u64 * conf.nvertices as u64 / nblocks as u64) as Vid);
        }
        let bytes = (0..nblocks)
            .map(|b| {
                let nverts = (starts[b + 1] - starts[b]) as u64;
                (nverts + 1) * 8 + conf.nedges * esize * nverts / conf.nvertices as u64
            })
            .collect();
        Ok(Self::with_parts(starts, bytes))
    }

    /// Builds a partitioning from explicit range boundaries and per-block
    /// byte sizes. Boundaries must start at zero and strictly increase.
    pub fn from_block_sizes(starts: Vec<Vid>, bytes: Vec<u64>) -> Result<Self> {
        if starts.len() < 2 || starts[0] != 0 {
            return Err(WalkError::Config(
                "partitioning needs at least one block starting at vertex 0".into(),
            ));
        }
        if starts.windows(2).any(|w| w[0] >= w[1]) {
            return Err(WalkError::Config(
                "block boundaries must strictly increase".into(),
            ));
        }
        if bytes.len() != starts.len() - 1 {
            return Err(WalkError::Config(format!(
                "{} byte sizes for {} blocks",
                bytes.len(),
                starts.len() - 1
            )));
        }
        Ok(Self::with_parts(starts, bytes))
    }

    fn with_parts(starts: Vec<Vid>, bytes: Vec<u64>) -> Self {
        let nblocks = starts.len() - 1;
        let slots = (0..nblocks).map(|_| AtomicU32::new(NOT_RESIDENT)).collect();
        Self {
            starts,
            bytes,
            slots,
        }
    }

    pub fn nblocks(&self) -> usize {
        self.starts.len() - 1
    }

    pub fn nvertices(&self) -> Vid {
        *self.starts.last().expect("non-empty boundaries")
    }

    /// Owning block of `vertex`; binary search over the range boundaries.
    pub fn block_of(&self, vertex: Vid) -> Bid {
        debug_assert!(vertex < self.nvertices());
        (self.starts.partition_point(|&s| s <= vertex) - 1) as Bid
    }

    /// Half-open vertex range `[first, end)` of block `b`.
    pub fn range(&self, b: Bid) -> (Vid, Vid) {
        (self.starts[b as usize], self.starts[b as usize + 1])
    }

    pub fn nverts(&self, b: Bid) -> usize {
        let (first, end) = self.range(b);
        (end - first) as usize
    }

    pub fn block_bytes(&self, b: Bid) -> u64 {
        self.bytes[b as usize]
    }

    /// Replaces the byte-size estimates with measured sizes.
    pub fn update_block_bytes(&mut self, sizes: &[u64]) -> Result<()> {
        if sizes.len() != self.nblocks() {
            return Err(WalkError::Config(format!(
                "{} sizes for {} blocks",
                sizes.len(),
                self.nblocks()
            )));
        }
        self.bytes.copy_from_slice(sizes);
        Ok(())
    }

    /// Cache slot currently holding block `b`, if resident.
    pub fn slot_of(&self, b: Bid) -> Option<usize> {
        match self.slots[b as usize].load(Ordering::Acquire) {
            NOT_RESIDENT => None,
            s => Some(s as usize),
        }
    }

    pub(crate) fn set_slot(&self, b: Bid, slot: Option<usize>) {
        let raw = slot.map_or(NOT_RESIDENT, |s| s as u32);
        self.slots[b as usize].store(raw, Ordering::Release);
    }
}

/// Builder for one block's edge data: CSR over the block's vertex range.
pub struct BlockEdges {
    first: Vid,
    offsets: Vec<u64>,
    neighbors: Vec<Vid>,
    weights: Option<Vec<f32>>,
}

impl BlockEdges {
    pub fn new(first: Vid, weighted: bool) -> Self {
        Self {
            first,
            offsets: vec![0],
            neighbors: Vec::new(),
            weights: weighted.then(Vec::new),
        }
    }

    /// Appends the adjacency list of the next vertex in range order.
    pub fn push_vertex(&mut self, neighbors: &[Vid], weights: &[f32]) {
        self.neighbors.extend_from_slice(neighbors);
        if let Some(w) = self.weights.as_mut() {
            debug_assert_eq!(neighbors.len(), weights.len());
            w.extend_from_slice(weights);
        }
        self.offsets.push(self.neighbors.len() as u64);
    }

    pub fn first_vertex(&self) -> Vid {
        self.first
    }

    pub fn nverts(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Serializes to the on-disk block layout: `nverts + 1` offsets (u64 LE),
    /// neighbor ids (u32 LE), then one f32 LE weight per neighbor iff
    /// weighted.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            self.offsets.len() * 8
                + self.neighbors.len() * 4
                + self.weights.as_ref().map_or(0, |w| w.len() * 4),
        );
        for off in &self.offsets {
            buf.extend_from_slice(&off.to_le_bytes());
        }
        for n in &self.neighbors {
            buf.extend_from_slice(&n.to_le_bytes());
        }
        if let Some(w) = &self.weights {
            for x in w {
                buf.extend_from_slice(&x.to_le_bytes());
            }
        }
        buf
    }
}

/// Zero-copy reader over a resident block's edge buffer.
///
/// Edge data is read-only for as long as the block occupies a cache slot, so
/// views can be shared freely across worker threads within a round.
pub struct BlockView<'a> {
    data: &'a [u8],
    first: Vid,
    nverts: usize,
    nedges: usize,
    weighted: bool,
}

impl<'a> BlockView<'a> {
    pub fn new(data: &'a [u8], first: Vid, nverts: usize, weighted: bool) -> Result<Self> {
        let header = (nverts + 1) * 8;
        if data.len() < header {
            return Err(WalkError::Corruption(format!(
                "block buffer of {} bytes too small for {} offsets",
                data.len(),
                nverts + 1
            )));
        }
        let nedges = read_u64(data, nverts * 8) as usize;
        let expected = header + nedges * if weighted { 8 } else { 4 };
        if data.len() != expected {
            return Err(WalkError::Corruption(format!(
                "block buffer is {} bytes, layout says {expected}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            first,
            nverts,
            nedges,
            weighted,
        })
    }

    pub fn first_vertex(&self) -> Vid {
        self.first
    }

    pub fn weighted(&self) -> bool {
        self.weighted
    }

    fn local(&self, vertex: Vid) -> Option<usize> {
        let idx = vertex.checked_sub(self.first)? as usize;
        (idx < self.nverts).then_some(idx)
    }

    pub fn degree(&self, vertex: Vid) -> usize {
        match self.local(vertex) {
            Some(i) => (read_u64(self.data, (i + 1) * 8) - read_u64(self.data, i * 8)) as usize,
            None => 0,
        }
    }

    /// `i`-th out-neighbor of `vertex`.
    pub fn neighbor(&self, vertex: Vid, i: usize) -> Vid {
        let idx = self.local(vertex).expect("vertex outside block range");
        let off = read_u64(self.data, idx * 8) as usize;
        debug_assert!(i < self.degree(vertex));
        read_u32(self.data, (self.nverts + 1) * 8 + (off + i) * 4)
    }

    /// Weight of the `i`-th out-edge; 1.0 on unweighted graphs.
    pub fn weight(&self, vertex: Vid, i: usize) -> f32 {
        if !self.weighted {
            return 1.0;
        }
        let idx = self.local(vertex).expect("vertex outside block range");
        let off = read_u64(self.data, idx * 8) as usize;
        let base = (self.nverts + 1) * 8 + self.nedges * 4;
        f32::from_le_bytes(
            self.data[base + (off + i) * 4..base + (off + i) * 4 + 4]
                .try_into()
                .expect("4 bytes"),
        )
    }

    pub fn neighbors(&self, vertex: Vid) -> impl Iterator<Item = Vid> + '_ {
        let deg = self.degree(vertex);
        (0..deg).map(move |i| self.neighbor(vertex, i))
    }
}

fn read_u64(data: &[u8], at: usize) -> u64 {
    u64::from_le_bytes(data[at..at + 8].try_into().expect("8 bytes"))
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(data[at..at + 4].try_into().expect("4 bytes"))
}
