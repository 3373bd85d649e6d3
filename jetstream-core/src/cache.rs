//! Memoisation of computed results keyed by a value object
//!
//! Results are stored behind an [`Arc`] so they can be handed out without
//! copying. Entries only leave the cache when it is full, oldest first, or on
//! [`MemoCache::clear`], which owners call whenever an input that is not part of
//! the key changes.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
struct Entries<K, V> {
    values: HashMap<K, Arc<V>>,
    /// Keys in insertion order, oldest first
    order: VecDeque<K>,
}

/// Cache holding at most `capacity` values, evicting the oldest insertion first
#[derive(Debug)]
pub struct MemoCache<K, V> {
    capacity: usize,
    entries: Mutex<Entries<K, V>>,
}

impl<K, V> Default for MemoCache<K, V> {
    fn default() -> Self {
        Self::with_capacity(usize::MAX)
    }
}

impl<K, V> MemoCache<K, V> {
    /// A capacity of zero stores nothing
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(Entries {
                values: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<K: Eq + Hash + Clone, V> MemoCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Entries<K, V>> {
        // A panic while holding the lock cannot leave a half-written entry behind
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.lock().values.get(key).cloned()
    }

    /// Return the cached value for `key`, computing and storing it if missing
    ///
    /// Errors are returned to the caller and nothing is cached. The lock is not
    /// held while `f` runs, so two threads may compute the same entry; the first
    /// stored value wins. Storing past the capacity evicts the oldest entry.
    pub fn get_or_try_insert_with<E, F>(&self, key: K, f: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = Arc::new(f()?);
        if self.capacity == 0 {
            return Ok(value);
        }

        let mut entries = self.lock();
        if let Some(existing) = entries.values.get(&key) {
            return Ok(existing.clone());
        }
        while entries.values.len() >= self.capacity {
            match entries.order.pop_front() {
                Some(oldest) => {
                    entries.values.remove(&oldest);
                }
                None => break,
            }
        }
        entries.order.push_back(key.clone());
        entries.values.insert(key, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().values.is_empty()
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.values.clear();
        entries.order.clear();
    }
}
