//! Out-of-core random walk engine over block-partitioned graphs.
//!
//! Graphs too large for memory are split into fixed-size blocks on disk and
//! walks execute in bulk-synchronous rounds: a [`schedule::Scheduler`] picks
//! the round's working set, the [`cache::BlockCache`] realizes it, the
//! [`walk::WalkManager`] feeds interval-bounded walker batches from memory
//! and disk queues, and the [`engine::Engine`] drives the user's
//! [`app::WalkApp`] transition callback over each batch in parallel.

pub mod app;
pub mod block;
pub mod cache;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod synthetic;
pub mod types;
pub mod walk;

pub use app::{UniformWalk, WalkApp};
pub use block::{BlockEdges, BlockPartitioning, BlockView};
pub use cache::BlockCache;
pub use config::GraphConfig;
pub use driver::{FileDriver, StorageDriver};
pub use engine::{Engine, RunSummary};
pub use error::{Result, WalkError};
pub use schedule::{
    AnnealingScheduler, Assignment, GreedyScheduler, LpScheduler, NaiveScheduler,
    RandomScheduler, Scheduler, WorkingSet,
};
pub use synthetic::SyntheticGraph;
pub use types::{Bid, Hid, Vid, Walker, Wid, WALKER_RECORD_LEN};
pub use walk::WalkManager;
