#![allow(missing_docs)]

mod common;

use vagar::{GreedyScheduler, NaiveScheduler, UniformWalk};

use common::fixture;

/// The core correctness property: no walker is ever created or lost.
/// `created == completed + lost + pending` must hold after every round.
#[test]
fn walker_count_is_conserved_every_round() {
    let mut fx = fixture(600, 6, 2, 21);
    let app = UniformWalk::new(10);
    let mut sched = NaiveScheduler::new();

    fx.engine
        .prologue(&app, |walks| fx.synth.seed_walkers(walks, 350))
        .unwrap();
    let walks = fx.engine.walk_manager();
    assert_eq!(walks.created(), 350);
    assert_eq!(walks.created(), walks.completed() + walks.lost() + walks.nwalks());

    let mut rounds = 0;
    while !fx.engine.walk_manager().test_finished_walks() {
        fx.engine.run_round(&app, &mut sched).unwrap();
        rounds += 1;
        let walks = fx.engine.walk_manager();
        assert_eq!(
            walks.created(),
            walks.completed() + walks.lost() + walks.nwalks(),
            "conservation broke after round {rounds}"
        );
        // Working-set bound.
        assert!(fx.engine.cache().resident_blocks().len() <= fx.engine.cache().capacity());
        assert!(rounds < 10_000, "engine failed to terminate");
    }
    assert_eq!(fx.engine.walk_manager().completed(), 350);
}

/// Eviction must not drop walkers parked in a block's memory queue: with a
/// single cache slot the working set changes almost every round.
#[test]
fn single_slot_cache_churns_without_losing_walkers() {
    let mut fx = fixture(400, 8, 1, 33);
    let app = UniformWalk::new(6);
    let mut sched = GreedyScheduler::new();

    fx.engine
        .prologue(&app, |walks| fx.synth.seed_walkers(walks, 250))
        .unwrap();
    let mut rounds = 0u64;
    while !fx.engine.walk_manager().test_finished_walks() {
        fx.engine.run_round(&app, &mut sched).unwrap();
        rounds += 1;
        let walks = fx.engine.walk_manager();
        assert_eq!(
            walks.created(),
            walks.completed() + walks.lost() + walks.nwalks()
        );
        assert!(fx.engine.cache().resident_blocks().len() <= 1);
        assert!(rounds < 10_000, "engine failed to terminate");
    }
    let summary_completed = fx.engine.walk_manager().completed();
    assert_eq!(summary_completed, 250);
    assert_eq!(fx.engine.walk_manager().lost(), 0);
}
