#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;
use vagar::{BlockPartitioning, Engine, FileDriver, GraphConfig, SyntheticGraph};

/// Engine over a freshly materialized synthetic dataset in a tempdir.
pub struct Fixture {
    pub conf: GraphConfig,
    pub synth: SyntheticGraph,
    pub engine: Engine,
    pub dir: TempDir,
}

/// Builds a dataset with exactly `nblocks` blocks and a cache of `ncblock`
/// slots.
pub fn fixture(nvertices: u32, nblocks: u32, ncblock: usize, seed: u64) -> Fixture {
    fixture_opts(nvertices, nblocks, ncblock, seed, |_| {})
}

/// Same as [`fixture`], with a hook to adjust the config before the engine
/// is built.
pub fn fixture_opts(
    nvertices: u32,
    nblocks: u32,
    ncblock: usize,
    seed: u64,
    tweak: impl FnOnce(&mut GraphConfig),
) -> Fixture {
    let synth = SyntheticGraph::new(nvertices, 3, seed);
    let starts: Vec<u32> = (0..=nblocks)
        .map(|i| (i as u64 * nvertices as u64 / nblocks as u64) as u32)
        .collect();
    let mut partition =
        BlockPartitioning::from_block_sizes(starts, vec![1; nblocks as usize]).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let driver = Arc::new(FileDriver::new(dir.path()).unwrap());
    let sizes = synth.materialize(&partition, driver.as_ref()).unwrap();
    partition.update_block_bytes(&sizes).unwrap();

    let mut conf = GraphConfig::new(nvertices, synth.nedges());
    conf.blocksize = *sizes.iter().max().unwrap() as usize;
    conf.cache_bytes = conf.blocksize * ncblock;
    conf.nthreads = 2;
    conf.seed = seed;
    tweak(&mut conf);

    let engine = Engine::new(conf.clone(), partition, driver).unwrap();
    Fixture {
        conf,
        synth,
        engine,
        dir,
    }
}
