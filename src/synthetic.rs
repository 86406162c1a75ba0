//! Synthetic graph generation for demos and tests.
//!
//! Real deployments convert edge lists into the block layout with an
//! external preprocessing step; this module fabricates a dataset with the
//! same on-disk shape so the engine can be exercised without one. The graph
//! is a ring (guaranteeing every vertex an out-edge) plus `degree` uniformly
//! random extra edges per vertex.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::block::{BlockEdges, BlockPartitioning};
use crate::driver::StorageDriver;
use crate::error::Result;
use crate::types::{Bid, Vid, Walker};
use crate::walk::WalkManager;

#[derive(Debug, Clone)]
pub struct SyntheticGraph {
    pub nvertices: Vid,
    /// Random out-edges per vertex on top of the ring edge.
    pub degree: usize,
    pub weighted: bool,
    pub seed: u64,
}

impl SyntheticGraph {
    pub fn new(nvertices: Vid, degree: usize, seed: u64) -> Self {
        Self {
            nvertices,
            degree,
            weighted: false,
            seed,
        }
    }

    /// Total edges the generator will emit.
    pub fn nedges(&self) -> u64 {
        self.nvertices as u64 * (self.degree as u64 + 1)
    }

    /// Writes one edge file per block through the driver. Returns each
    /// block's actual byte size, for feeding back into the partitioning's
    /// cost model.
    pub fn materialize(
        &self,
        partition: &BlockPartitioning,
        driver: &dyn StorageDriver,
    ) -> Result<Vec<u64>> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut sizes = Vec::with_capacity(partition.nblocks());
        for b in 0..partition.nblocks() as Bid {
            let (first, end) = partition.range(b);
            let mut edges = BlockEdges::new(first, self.weighted);
            let mut nbrs = Vec::with_capacity(self.degree + 1);
            let mut weights = Vec::with_capacity(self.degree + 1);
            for v in first..end {
                nbrs.clear();
                weights.clear();
                nbrs.push((v + 1) % self.nvertices);
                for _ in 0..self.degree {
                    nbrs.push(rng.gen_range(0..self.nvertices));
                }
                if self.weighted {
                    for _ in 0..nbrs.len() {
                        weights.push(rng.gen_range(0.1..1.0));
                    }
                }
                edges.push_vertex(&nbrs, &weights);
            }
            let buf = edges.encode();
            driver.write_block_edges(b, &buf)?;
            sizes.push(buf.len() as u64);
        }
        Ok(sizes)
    }

    /// Seeds `nwalks` walkers at uniformly random vertices.
    pub fn seed_walkers(&self, walks: &WalkManager, nwalks: u64) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(1));
        for id in 0..nwalks {
            let v = rng.gen_range(0..self.nvertices);
            let b = walks.partition().block_of(v);
            walks.add_walk(Walker::seeded(id, v, b));
        }
    }
}
