use crate::common::error::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// Size in bytes of a single page / frame. A build-time constant per §6 of
/// the buffer pool contract.
pub const PAGE_SIZE: usize = 4096;

/// Sentinel page-id that never names a real page. Allocators must never
/// return it; operations against it fail fast.
pub const INVALID_PAGE_ID: PageId = -1;

/// Default number of frames per pool instance, used when no configuration
/// source overrides it.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Default shard count for the parallel pool.
pub const DEFAULT_NUM_INSTANCES: usize = 4;

pub type PageId = i64;
pub type FrameId = usize;

/// Construction-time configuration for the buffer pool.
///
/// Pool size (frames per instance) and instance count are supplied at
/// construction and both must be positive (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferPoolConfig {
    pub pool_size: usize,
    pub num_instances: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            num_instances: DEFAULT_NUM_INSTANCES,
        }
    }
}

impl BufferPoolConfig {
    pub fn new(pool_size: usize, num_instances: usize) -> Self {
        assert!(pool_size > 0, "pool_size must be positive");
        assert!(num_instances > 0, "num_instances must be positive");
        Self {
            pool_size,
            num_instances,
        }
    }

    pub fn builder() -> BufferPoolConfigBuilder {
        BufferPoolConfigBuilder::default()
    }

    /// Loads overrides layered on top of the defaults from a `config::Config`
    /// source (file, environment, ...). Unset keys fall back to
    /// [`BufferPoolConfig::default`].
    pub fn from_config(source: &config::Config) -> Result<Self> {
        let pool_size = source
            .get_int("buffer_pool.pool_size")
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_POOL_SIZE);
        let num_instances = source
            .get_int("buffer_pool.num_instances")
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_NUM_INSTANCES);
        if pool_size == 0 || num_instances == 0 {
            return Err(crate::common::error::Error::Config(
                "pool_size and num_instances must be positive".to_string(),
            ));
        }
        Ok(Self {
            pool_size,
            num_instances,
        })
    }
}

/// Process-wide configuration, set at most once. Several library consumers
/// in one process (e.g. multiple storage engines sharing a binary) can
/// agree on a single pool shape without threading a `BufferPoolConfig`
/// through every constructor call site.
static GLOBAL_CONFIG: OnceCell<BufferPoolConfig> = OnceCell::new();

/// Installs `config` as the process-wide default. Returns it back,
/// unchanged, if a global config was already set.
pub fn set_global_config(config: BufferPoolConfig) -> std::result::Result<(), BufferPoolConfig> {
    GLOBAL_CONFIG.set(config)
}

/// Returns the process-wide config, falling back to [`BufferPoolConfig::default`]
/// if [`set_global_config`] was never called.
pub fn global_config() -> BufferPoolConfig {
    *GLOBAL_CONFIG.get_or_init(BufferPoolConfig::default)
}

#[derive(Default)]
pub struct BufferPoolConfigBuilder {
    pool_size: Option<usize>,
    num_instances: Option<usize>,
}

impl BufferPoolConfigBuilder {
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = Some(pool_size);
        self
    }

    pub fn num_instances(mut self, num_instances: usize) -> Self {
        self.num_instances = Some(num_instances);
        self
    }

    pub fn build(self) -> BufferPoolConfig {
        BufferPoolConfig::new(
            self.pool_size.unwrap_or(DEFAULT_POOL_SIZE),
            self.num_instances.unwrap_or(DEFAULT_NUM_INSTANCES),
        )
    }
}
