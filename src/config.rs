use crate::error::{Result, WalkError};
use crate::types::Vid;

/// Walkers one worker is expected to handle per batch unit.
pub const MAX_THREAD_WALKS: usize = 2048;

/// Batches below this size run on the controlling thread; parallel dispatch
/// costs more than it buys for so few walkers.
pub const SEQUENTIAL_EXEC_THRESHOLD: usize = 100;

/// Immutable run parameters.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub nvertices: Vid,
    pub nedges: u64,
    pub weighted: bool,
    /// Worker pool size for batch execution.
    pub nthreads: usize,
    /// Target on-disk size of one block's edge data, in bytes.
    pub blocksize: usize,
    /// Memory budget for the block cache, in bytes.
    pub cache_bytes: usize,
    /// Base seed for per-worker random generators.
    pub seed: u64,
    /// Hard cap on engine rounds; `None` runs to exhaustion.
    pub max_rounds: Option<u64>,
}

impl GraphConfig {
    pub fn new(nvertices: Vid, nedges: u64) -> Self {
        Self {
            nvertices,
            nedges,
            weighted: false,
            nthreads: 4,
            blocksize: 1 << 20,
            cache_bytes: 4 << 20,
            seed: 9898676785859,
            max_rounds: None,
        }
    }

    /// Number of cache slots the byte budget affords.
    pub fn ncblock(&self) -> usize {
        if self.blocksize == 0 {
            0
        } else {
            self.cache_bytes / self.blocksize
        }
    }

    /// Upper bound on walkers in one processing batch.
    pub fn interval_max_walks(&self) -> usize {
        self.nthreads * MAX_THREAD_WALKS * 5
    }

    /// Rejects parameter combinations the engine cannot run with. Called
    /// before the round loop starts.
    pub fn validate(&self) -> Result<()> {
        if self.nvertices == 0 {
            return Err(WalkError::Config("graph has no vertices".into()));
        }
        if self.blocksize == 0 {
            return Err(WalkError::Config("block size must be positive".into()));
        }
        if self.nthreads == 0 {
            return Err(WalkError::Config("thread count must be positive".into()));
        }
        if self.ncblock() == 0 {
            return Err(WalkError::Config(format!(
                "cache budget of {} bytes holds no {}-byte block",
                self.cache_bytes, self.blocksize
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parameters_validate() {
        assert!(GraphConfig::new(100, 400).validate().is_ok());
    }

    #[test]
    fn zero_capacity_cache_rejected() {
        let mut conf = GraphConfig::new(100, 400);
        conf.cache_bytes = conf.blocksize - 1;
        assert!(matches!(
            conf.validate().unwrap_err(),
            WalkError::Config(_)
        ));
    }

    #[test]
    fn zero_blocksize_rejected() {
        let mut conf = GraphConfig::new(100, 400);
        conf.blocksize = 0;
        assert!(conf.validate().is_err());
    }
}
