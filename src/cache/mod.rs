//! Cache module - keyed caches shared across widget refreshes.
//!
//! Two structures live here:
//! - `ExpiringCache` - string keys to values, each stamped with an expiry.
//!   Expired entries are never served and are dropped on the read that
//!   finds them, or in bulk by `sweep`.
//! - `LazyPool` - string keys to expensive resources (API clients), built
//!   at most once per key and kept for the life of the pool.
//!
//! Both are plain owned values. Callers wrap them in `Arc` and hand them to
//! whatever needs them; nothing here is a global.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let ids = ExpiringCache::new("account_ids");
//! ids.insert("alice", "account:123".to_string(), config.ttl);
//! let id = ids.get("alice");
//!
//! let clients = LazyPool::new("logs_clients");
//! let client = clients.get_or_create("sub1", || build_client("sub1"))?;
//! ```

mod clock;
mod config;
mod expiring;
mod pool;

#[cfg(test)]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use config::CacheConfig;
pub use expiring::{ExpiringCache, spawn_sweeper};
pub use pool::LazyPool;
