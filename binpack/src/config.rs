//! Engine configuration.
//!
//! ```
//! use binpack::{Config, Engine};
//!
//! let config = Config::new()
//!     .with_cache_capacity(64)
//!     .with_preallocation_size_limit(1 << 16);
//! let engine = Engine::with_config(config);
//! assert_eq!(engine.schemas().capacity(), 64);
//! ```

pub const DEFAULT_CACHE_CAPACITY: usize = 1000;
pub const DEFAULT_PREALLOCATION_SIZE_LIMIT: usize = 4 << 20; // 4 MiB
pub const PREALLOCATION_SIZE_LIMIT_DISABLED: usize = usize::MAX;
pub const DEFAULT_POOL_CAPACITY: usize = 64;

/// Runtime configuration of an [`Engine`](crate::Engine).
///
/// Defaults:
/// - Schema cache capacity is 1000 types.
/// - Preallocation size limit is 4 MiB.
/// - At most 64 idle encoders and 64 idle decoders are pooled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    cache_capacity: usize,
    preallocation_size_limit: usize,
    pool_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub const fn new() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            preallocation_size_limit: DEFAULT_PREALLOCATION_SIZE_LIMIT,
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }

    /// Maximum number of codecs the engine keeps. The oldest entry is evicted on overflow.
    pub const fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Largest allocation, in bytes, a decoded length prefix may request up front.
    ///
    /// When decoding from a byte slice, lengths the remaining input can back are always
    /// accepted and only the initial reservation is capped. Stream sources cannot see how much
    /// input is left, so there every length must fit the limit. Zero-sized elements count as
    /// one byte each.
    pub const fn with_preallocation_size_limit(mut self, limit: usize) -> Self {
        self.preallocation_size_limit = limit;
        self
    }

    /// Disable the preallocation size limit.
    ///
    /// Only do this for trusted input; a corrupt length prefix can then request any amount of
    /// memory.
    pub const fn disable_preallocation_size_limit(self) -> Self {
        self.with_preallocation_size_limit(PREALLOCATION_SIZE_LIMIT_DISABLED)
    }

    /// Maximum number of idle encoders (and, separately, decoders) kept for reuse.
    pub const fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    pub const fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    pub const fn preallocation_size_limit(&self) -> usize {
        self.preallocation_size_limit
    }

    pub const fn pool_capacity(&self) -> usize {
        self.pool_capacity
    }
}
