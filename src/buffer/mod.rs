//! Page cache: bounded in-memory pages with frequency-first eviction.
//!
//! Pages are evicted lowest use count first, least recently used among
//! equals. Dirty pages stay resident until flushed or discarded.

mod eviction;
mod lock;
mod pool;

pub use eviction::EvictionIndex;
pub use lock::{LockManager, NoopLockManager};
pub use pool::{CacheStats, PageCache, SharedPage};
