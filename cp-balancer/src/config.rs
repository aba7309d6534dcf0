use std::net::SocketAddr;
use std::time::Duration;

use common::{DEFAULT_BALANCER_PORT, DEFAULT_CHUNK_SIZE};

/// Knobs of the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Attempts a chunk gets before the job is aborted. Values below 1 are
    /// treated as 1.
    pub max_chunk_attempts: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_chunk_attempts: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BalancerConfig {
    pub listen: SocketAddr,

    /// Chunk size used when a `RunJob` request passes 0.
    pub chunk_size: usize,

    pub dispatch: DispatchConfig,

    /// Bound on each readiness probe. `None` waits forever.
    pub probe_timeout: Option<Duration>,

    /// Bound on each chunk execution. `None` waits forever.
    pub execute_timeout: Option<Duration>,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], DEFAULT_BALANCER_PORT)),
            chunk_size: DEFAULT_CHUNK_SIZE,
            dispatch: DispatchConfig::default(),
            probe_timeout: Some(Duration::from_secs(5)),
            execute_timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl BalancerConfig {
    /// Defaults, listening on `listen`.
    pub fn new(listen: SocketAddr) -> Self {
        Self {
            listen,
            ..Self::default()
        }
    }
}
