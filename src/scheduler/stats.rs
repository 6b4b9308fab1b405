//! Per-scheduler counters.

use serde::{Deserialize, Serialize};

/// Counters accumulated over the life of one `Hydra`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydraStats {
    /// Requests handed to the transport, retries included.
    pub admitted: u64,
    /// Completions delivered to callbacks, followers included.
    pub completed: u64,
    pub retries: u64,
    pub stub_hits: u64,
    pub cache_hits: u64,
    /// Requests answered through memoization instead of dispatch.
    pub memo_hits: u64,
    pub callback_failures: u64,
    /// Swallowed cache getter/setter failures.
    pub cache_errors: u64,
}

impl HydraStats {
    /// Requests resolved without their own transport call.
    pub fn intercepted(&self) -> u64 {
        self.stub_hits + self.cache_hits + self.memo_hits
    }
}
