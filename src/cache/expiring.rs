//! String-keyed cache with a per-entry expiry instant.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use super::clock::{Clock, SystemClock};

/// Stored value plus the instant it stops being served.
struct Entry<V> {
    value: V,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    /// An entry is live while `now` is strictly before its expiry.
    #[inline]
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// Thread-safe cache whose entries each carry their own expiry.
///
/// Expired entries are never returned. A `get` that finds one removes it
/// before reporting the miss; [`ExpiringCache::sweep`] drops every expired
/// entry at once for keys that are written but never read again.
///
/// Reads share a lock. Only eviction, `insert`, and `sweep` take it
/// exclusively.
pub struct ExpiringCache<V, C = SystemClock> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    clock: C,
    name: Arc<str>,
}

impl<V> ExpiringCache<V, SystemClock>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache on the system clock.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::with_clock(name, SystemClock)
    }
}

impl<V, C> ExpiringCache<V, C>
where
    V: Clone + Send + Sync + 'static,
    C: Clock,
{
    /// Create an empty cache reading time from `clock`.
    pub fn with_clock(name: impl Into<Arc<str>>, clock: C) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            name: name.into(),
        }
    }

    /// Get the name of this cache.
    #[allow(dead_code)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a live value.
    ///
    /// Returns `None` when the key is absent or expired. An expired entry
    /// is deleted before returning.
    pub fn get(&self, key: &str) -> Option<V> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.is_live(self.clock.now()) => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        // The read guard is gone; another writer may have removed or
        // refreshed the key since. Only delete what is still expired.
        let mut entries = self.entries.write();
        let now = self.clock.now();
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
            debug!(cache = %self.name, key, "evicted expired entry");
        }
        None
    }

    /// Insert or overwrite `key`, valid for `ttl` from now.
    ///
    /// A zero `ttl` stores an entry that is already expired. A `ttl` too
    /// large to add to the current instant never expires.
    pub fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let expires_at = self.clock.now().checked_add(ttl);

        self.entries
            .write()
            .insert(key.into(), Entry { value, expires_at });
    }

    /// Remove every entry whose expiry is at or before now.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let mut entries = self.entries.write();
        let now = self.clock.now();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(cache = %self.name, removed, "swept expired entries");
        }
        removed
    }

    /// Number of stored entries, expired ones included until evicted.
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if nothing is stored.
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Whether `key` is physically stored, live or not.
    #[cfg(test)]
    pub(crate) fn is_stored(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }
}

/// Run [`ExpiringCache::sweep`] every `interval` until the cache is dropped.
pub fn spawn_sweeper<V, C>(cache: &Arc<ExpiringCache<V, C>>, interval: Duration) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
    C: Clock,
{
    let cache: Weak<ExpiringCache<V, C>> = Arc::downgrade(cache);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(cache) = cache.upgrade() else {
                break;
            };
            cache.sweep();
        }
    })
}

impl<V, C> std::fmt::Debug for ExpiringCache<V, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("name", &self.name)
            .field("entry_count", &self.entries.read().len())
            .finish()
    }
}
