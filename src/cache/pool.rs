//! Lazily built, per-key shared resources.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::debug;

type Slot<R> = Arc<OnceCell<Arc<R>>>;

/// Pool of expensive resources built at most once per key.
///
/// The first caller for a key runs the factory; concurrent callers for the
/// same key wait for it and share the result. A failed factory stores
/// nothing, so the next call retries from scratch. Built resources live as
/// long as the pool.
///
/// The map lock is never held while a factory runs: each key owns a
/// [`OnceCell`] slot, and only callers of that key wait on it.
pub struct LazyPool<R> {
    slots: RwLock<HashMap<String, Slot<R>>>,
    name: Arc<str>,
}

impl<R> LazyPool<R>
where
    R: Send + Sync + 'static,
{
    /// Create an empty pool.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            name: name.into(),
        }
    }

    /// Get the name of this pool.
    #[allow(dead_code)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get an already built resource without building one.
    pub fn get(&self, key: &str) -> Option<Arc<R>> {
        self.slots
            .read()
            .get(key)
            .and_then(|slot| slot.get().cloned())
    }

    /// Get the resource for `key`, building it with `factory` on first use.
    ///
    /// The factory's error is returned unchanged and leaves the key unbuilt.
    pub fn get_or_create<F, E>(&self, key: &str, factory: F) -> Result<Arc<R>, E>
    where
        F: FnOnce() -> Result<R, E>,
    {
        let slot = self.slots.read().get(key).cloned();
        if let Some(resource) = slot.as_ref().and_then(|slot| slot.get()) {
            return Ok(Arc::clone(resource));
        }

        // Re-check under the write lock: a racing caller may have inserted
        // the slot between the two guards.
        let slot = match slot {
            Some(slot) => slot,
            None => Arc::clone(self.slots.write().entry(key.to_owned()).or_default()),
        };

        let mut built = false;
        let result = slot
            .get_or_try_init(|| {
                built = true;
                factory().map(Arc::new)
            })
            .map(Arc::clone);

        match result {
            Ok(resource) => {
                if built {
                    debug!(pool = %self.name, key, "constructed resource");
                }
                Ok(resource)
            }
            Err(e) => {
                debug!(pool = %self.name, key, "resource construction failed");
                self.discard_empty_slot(key, slot);
                Err(e)
            }
        }
    }

    /// Release our handle on an unbuilt slot and drop it from the map if
    /// nobody else holds one. Handles are only cloned under a map guard and
    /// released here under the write guard, so the last failing caller sees
    /// the map as the only owner.
    fn discard_empty_slot(&self, key: &str, slot: Slot<R>) {
        let mut slots = self.slots.write();
        drop(slot);
        let orphaned = slots
            .get(key)
            .is_some_and(|stored| stored.get().is_none() && Arc::strong_count(stored) == 1);
        if orphaned {
            slots.remove(key);
        }
    }

    /// Whether a built resource exists for `key`.
    #[allow(dead_code)]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of built resources.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    /// Check if no resource has been built yet.
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R> std::fmt::Debug for LazyPool<R>
where
    R: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyPool")
            .field("name", &self.name)
            .field("resource_count", &self.len())
            .finish()
    }
}
