//! Demo driver: synthesizes a block-partitioned graph on disk and runs a
//! batch of random walks over it with a bounded cache.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use vagar::{
    AnnealingScheduler, BlockPartitioning, Engine, FileDriver, GraphConfig, GreedyScheduler,
    LpScheduler, NaiveScheduler, RandomScheduler, Result, Scheduler, StorageDriver,
    SyntheticGraph, UniformWalk,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchedulerKind {
    Naive,
    Greedy,
    Random,
    Annealing,
    Lp,
}

#[derive(Debug, Parser)]
#[command(name = "vagar", version, about = "Out-of-core random walks over a synthetic graph")]
struct Args {
    /// Dataset directory; defaults to a scratch directory under the system
    /// temp dir.
    #[arg(long)]
    data: Option<PathBuf>,
    #[arg(long, default_value_t = 100_000)]
    vertices: u32,
    /// Random out-edges per vertex on top of the ring edge.
    #[arg(long, default_value_t = 4)]
    degree: usize,
    #[arg(long)]
    weighted: bool,
    /// Number of walkers to seed.
    #[arg(long, default_value_t = 100_000)]
    walks: u64,
    /// Steps per walk.
    #[arg(long, default_value_t = 20)]
    length: u16,
    /// Restart-to-source probability.
    #[arg(long, default_value_t = 0.0)]
    restart: f32,
    /// Block size in bytes.
    #[arg(long, default_value_t = 1 << 20)]
    blocksize: usize,
    /// Cache budget in bytes.
    #[arg(long, default_value_t = 4 << 20)]
    cache: usize,
    #[arg(long, default_value_t = 4)]
    threads: usize,
    #[arg(long, default_value_t = 9898676785859)]
    seed: u64,
    #[arg(long, value_enum, default_value_t = SchedulerKind::Naive)]
    scheduler: SchedulerKind,
    /// Stop after this many rounds even with walks pending.
    #[arg(long)]
    max_rounds: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    let args = Args::parse();

    let data = args
        .data
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("vagar-demo"));

    let synth = SyntheticGraph {
        nvertices: args.vertices,
        degree: args.degree,
        weighted: args.weighted,
        seed: args.seed,
    };
    let mut conf = GraphConfig::new(args.vertices, synth.nedges());
    conf.weighted = args.weighted;
    conf.nthreads = args.threads;
    conf.blocksize = args.blocksize;
    conf.cache_bytes = args.cache;
    conf.seed = args.seed;
    conf.max_rounds = args.max_rounds;

    let mut partition = BlockPartitioning::uniform(&conf)?;
    let driver = Arc::new(FileDriver::new(&data)?);
    let sizes = synth.materialize(&partition, driver.as_ref())?;
    partition.update_block_bytes(&sizes)?;
    // Clear any walk queues a previous run left in the dataset directory.
    for b in 0..partition.nblocks() as u32 {
        driver.write_walk_queue(b, &[])?;
    }

    let mut engine = Engine::new(conf, partition, driver)?;
    let app = UniformWalk::with_restart(args.length, args.restart);
    let mut scheduler: Box<dyn Scheduler> = match args.scheduler {
        SchedulerKind::Naive => Box::new(NaiveScheduler::new()),
        SchedulerKind::Greedy => Box::new(GreedyScheduler::new()),
        SchedulerKind::Random => Box::new(RandomScheduler::new(args.seed)),
        SchedulerKind::Annealing => Box::new(AnnealingScheduler::new(args.seed, 200)),
        SchedulerKind::Lp => Box::new(LpScheduler::new()),
    };

    engine.prologue(&app, |walks| synth.seed_walkers(walks, args.walks))?;
    let summary = engine.run(&app, scheduler.as_mut())?;
    engine.epilogue(&app);

    println!(
        "completed {} of {} walks in {} rounds ({:.2?}){}",
        summary.completed,
        engine.walk_manager().created(),
        summary.rounds,
        summary.elapsed,
        if summary.lost > 0 {
            format!(", {} lost to corruption", summary.lost)
        } else {
            String::new()
        }
    );
    Ok(())
}
