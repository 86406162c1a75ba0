#![allow(missing_docs)]

mod common;

use vagar::{
    AnnealingScheduler, GreedyScheduler, LpScheduler, NaiveScheduler, RandomScheduler,
    Scheduler, UniformWalk,
};

use common::fixture;

fn run_policy(mut sched: Box<dyn Scheduler>, seed: u64) {
    let mut fx = fixture(500, 10, 3, seed);
    let app = UniformWalk::new(7);

    fx.engine
        .prologue(&app, |walks| fx.synth.seed_walkers(walks, 300))
        .unwrap();
    let mut rounds = 0u64;
    while !fx.engine.walk_manager().test_finished_walks() {
        fx.engine.run_round(&app, sched.as_mut()).unwrap();
        rounds += 1;
        assert!(
            fx.engine.cache().resident_blocks().len() <= fx.engine.cache().capacity(),
            "working set exceeded the cache capacity"
        );
        assert!(rounds < 10_000, "policy failed to terminate");
    }
    assert_eq!(fx.engine.walk_manager().completed(), 300);
    assert_eq!(fx.engine.walk_manager().lost(), 0);
}

#[test]
fn naive_policy_completes_all_walks() {
    run_policy(Box::new(NaiveScheduler::new()), 1);
}

#[test]
fn greedy_policy_completes_all_walks() {
    run_policy(Box::new(GreedyScheduler::new()), 2);
}

#[test]
fn random_policy_completes_all_walks() {
    run_policy(Box::new(RandomScheduler::new(12345)), 3);
}

#[test]
fn annealing_policy_completes_all_walks() {
    run_policy(Box::new(AnnealingScheduler::new(12345, 100)), 4);
}

#[test]
fn lp_policy_completes_all_walks() {
    run_policy(Box::new(LpScheduler::new()), 5);
}
