#![allow(missing_docs)]

mod common;

use vagar::{NaiveScheduler, UniformWalk, WALKER_RECORD_LEN};

use common::fixture;

#[test]
fn thousand_walks_over_ten_blocks_complete() {
    let mut fx = fixture(1000, 10, 3, 42);
    let app = UniformWalk::new(5);
    let mut sched = NaiveScheduler::new();

    fx.engine
        .prologue(&app, |walks| fx.synth.seed_walkers(walks, 1000))
        .unwrap();
    let summary = fx.engine.run(&app, &mut sched).unwrap();
    fx.engine.epilogue(&app);

    assert_eq!(fx.engine.walk_manager().created(), 1000);
    assert_eq!(summary.completed, 1000);
    assert_eq!(summary.lost, 0);
    assert_eq!(summary.pending, 0);
    assert!(fx.engine.walk_manager().test_finished_walks());
}

#[test]
fn degenerate_single_block_partitioning_terminates() {
    let mut fx = fixture(200, 1, 1, 7);
    let app = UniformWalk::new(8);
    let mut sched = NaiveScheduler::new();

    fx.engine
        .prologue(&app, |walks| fx.synth.seed_walkers(walks, 150))
        .unwrap();
    while !fx.engine.walk_manager().test_finished_walks() {
        fx.engine.run_round(&app, &mut sched).unwrap();
        // The only block must be the working set every round.
        assert_eq!(fx.engine.cache().resident_blocks(), vec![0]);
    }
    assert_eq!(fx.engine.walk_manager().completed(), 150);
}

#[test]
fn cache_as_large_as_graph_keeps_disk_queues_empty() {
    let mut fx = fixture(400, 8, 8, 13);
    let app = UniformWalk::new(6);
    let mut sched = NaiveScheduler::new();

    fx.engine
        .prologue(&app, |walks| fx.synth.seed_walkers(walks, 500))
        .unwrap();
    while !fx.engine.walk_manager().test_finished_walks() {
        fx.engine.run_round(&app, &mut sched).unwrap();
        // Every pending block fits in the cache, so walkers only ever move
        // between resident blocks: no resident block accumulates disk walks.
        let walks = fx.engine.walk_manager();
        for b in fx.engine.cache().resident_blocks() {
            assert_eq!(walks.disk_pending(b), 0, "block {b} spilled to disk");
        }
    }
    assert_eq!(fx.engine.walk_manager().completed(), 500);
}

#[test]
fn corrupted_record_is_dropped_and_counted() {
    let mut fx = fixture(300, 5, 2, 99);
    let app = UniformWalk::new(4);
    let mut sched = NaiveScheduler::new();

    fx.engine
        .prologue(&app, |walks| fx.synth.seed_walkers(walks, 200))
        .unwrap();

    // Flip one byte inside the first record of some seeded queue file.
    let mut corrupted = false;
    for entry in std::fs::read_dir(fx.dir.path()).unwrap() {
        let path = entry.unwrap().path();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        if name.starts_with("walk_") && path.metadata().unwrap().len() >= WALKER_RECORD_LEN as u64
        {
            let mut raw = std::fs::read(&path).unwrap();
            raw[8] ^= 0xff;
            std::fs::write(&path, raw).unwrap();
            corrupted = true;
            break;
        }
    }
    assert!(corrupted, "no seeded walk queue found to corrupt");

    let summary = fx.engine.run(&app, &mut sched).unwrap();
    assert_eq!(summary.lost, 1);
    assert_eq!(summary.completed, 199);
    assert_eq!(summary.pending, 0);
    // Conservation closes with the lost counter carrying the discrepancy.
    assert_eq!(
        fx.engine.walk_manager().created(),
        summary.completed + summary.lost
    );
}

#[test]
fn round_cap_stops_a_run_short() {
    let mut fx = common::fixture_opts(500, 10, 2, 5, |conf| conf.max_rounds = Some(1));
    let app = UniformWalk::new(50);
    let mut sched = NaiveScheduler::new();

    fx.engine
        .prologue(&app, |walks| fx.synth.seed_walkers(walks, 400))
        .unwrap();
    let summary = fx.engine.run(&app, &mut sched).unwrap();
    assert_eq!(summary.rounds, 1);
    assert!(summary.pending > 0, "long walks cannot finish in one round");
    // Nothing lost: the pending walkers are all still accounted for.
    assert_eq!(
        fx.engine.walk_manager().created(),
        summary.completed + summary.pending
    );
}
