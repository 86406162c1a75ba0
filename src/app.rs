//! User-facing walk semantics.
//!
//! The engine is polymorphic over what a walk *is*: it only moves walkers
//! between blocks and invokes [`WalkApp::transition`] one step at a time.
//! Restart bias, step limits, second-order memory and any aggregate state
//! live behind this trait.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::block::BlockView;
use crate::types::{Hid, Vid, Walker};
use crate::walk::WalkManager;

/// Walk transition policy.
///
/// `transition` is called once per step with the walker, a read-only view of
/// the block owning its current vertex, and the worker's private generator.
/// Returning `Some(v)` commits the step to vertex `v`; `None` terminates the
/// walker (step limit hit, absorbed, or otherwise done). Implementations
/// must be reentrant: the engine invokes them concurrently for different
/// walkers.
pub trait WalkApp: Send + Sync {
    fn transition(&self, walker: &Walker, view: &BlockView<'_>, rng: &mut ChaCha8Rng)
        -> Option<Vid>;

    /// Invoked exactly once before the round loop.
    fn prologue(&self, _walks: &WalkManager) {}

    /// Invoked exactly once after the round loop.
    fn epilogue(&self) {}
}

/// Plain random walk: uniform neighbor choice (weight-proportional on
/// weighted graphs), optional restart-to-source, fixed step limit.
#[derive(Debug, Clone, Copy)]
pub struct UniformWalk {
    pub step_limit: Hid,
    /// Probability of jumping back to the source instead of following an
    /// edge; zero disables restarts.
    pub restart: f32,
}

impl UniformWalk {
    pub fn new(step_limit: Hid) -> Self {
        Self {
            step_limit,
            restart: 0.0,
        }
    }

    pub fn with_restart(step_limit: Hid, restart: f32) -> Self {
        Self {
            step_limit,
            restart,
        }
    }
}

impl WalkApp for UniformWalk {
    fn transition(
        &self,
        walker: &Walker,
        view: &BlockView<'_>,
        rng: &mut ChaCha8Rng,
    ) -> Option<Vid> {
        if walker.step >= self.step_limit {
            return None;
        }
        if self.restart > 0.0 && rng.gen::<f32>() < self.restart {
            return Some(walker.source);
        }
        let deg = view.degree(walker.cur);
        if deg == 0 {
            // Sink vertex: restart if the walk has restart mass, else absorb.
            return (self.restart > 0.0).then_some(walker.source);
        }
        let pick = if view.weighted() {
            let total: f32 = (0..deg).map(|i| view.weight(walker.cur, i)).sum();
            let mut x = rng.gen::<f32>() * total;
            let mut pick = deg - 1;
            for i in 0..deg {
                x -= view.weight(walker.cur, i);
                if x <= 0.0 {
                    pick = i;
                    break;
                }
            }
            pick
        } else {
            rng.gen_range(0..deg)
        };
        Some(view.neighbor(walker.cur, pick))
    }
}
