// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    collections::{HashMap, VecDeque},
    hash::Hash,
    sync::Arc,
};

use parking_lot::Mutex;

use memora_store::{CacheEntry, Clock, Error, Store};

struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Keys in strict insertion order, oldest first. Kept exact: removals
    /// drop the key from the queue, so the front is always the eviction
    /// candidate.
    order: VecDeque<K>,
}

/// A bounded in-memory storage tier with FIFO eviction.
///
/// Entries live in a map guarded by a short-held mutex; structural
/// mutations (insert, evict, remove) are serialized against readers, which
/// is all the engine's invariants need — the slow path (user computations)
/// never runs under this lock.
///
/// When `put` introduces a new key at capacity, the entry that was inserted
/// earliest is removed first. Overwriting an existing key refreshes its
/// queue position and never evicts.
///
/// Cloning a `MemoryStore` yields a handle to the same underlying storage.
#[derive(Clone)]
pub struct MemoryStore<K, V> {
    inner: Arc<Mutex<Inner<K, V>>>,
    max_entries: Option<u64>,
    clock: Clock,
}

impl<K, V> std::fmt::Debug for MemoryStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("len", &self.inner.lock().entries.len())
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}

impl<K, V> Default for MemoryStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MemoryStore<K, V> {
    /// Creates a new unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(None)
    }

    /// Creates a new store holding at most `max_entries` entries.
    ///
    /// # Panics
    ///
    /// Panics if `max_entries` is 0. A cache that can hold nothing is a
    /// configuration error; the engine's builder reports it as such before
    /// ever constructing a store.
    #[must_use]
    pub fn with_capacity(max_entries: u64) -> Self {
        assert!(max_entries > 0, "max_entries must be at least 1");
        Self::with_limit(Some(max_entries))
    }

    fn with_limit(max_entries: Option<u64>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            })),
            max_entries,
            clock: Clock::system(),
        }
    }

    /// Replaces the clock used to stamp `last_touch` on hits.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the configured capacity, if bounded.
    #[must_use]
    pub fn max_entries(&self) -> Option<u64> {
        self.max_entries
    }
}

impl<K, V> Store<K, V> for MemoryStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        Ok(inner.entries.get_mut(key).map(|entry| {
            entry.touch(now);
            entry.clone()
        }))
    }

    async fn put(&self, key: &K, entry: CacheEntry<V>) -> Result<(), Error> {
        let mut inner = self.inner.lock();

        if inner.entries.contains_key(key) {
            // Overwrite: refresh the queue position, never evict.
            inner.order.retain(|k| k != key);
        } else if let Some(max) = self.max_entries {
            // New key at capacity: evict from the front until there is room.
            while inner.entries.len() as u64 >= max {
                let Some(oldest) = inner.order.pop_front() else {
                    break;
                };
                inner.entries.remove(&oldest);
            }
        }

        inner.entries.insert(key.clone(), entry);
        inner.order.push_back(key.clone());
        Ok(())
    }

    async fn remove(&self, key: &K) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        if inner.entries.remove(key).is_some() {
            inner.order.retain(|k| k != key);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
        Ok(())
    }

    fn len(&self) -> Option<u64> {
        Some(self.inner.lock().entries.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memora_store::ClockControl;
    use std::time::Duration;

    fn block_on<F: Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    #[test]
    fn fifo_evicts_oldest_inserted() {
        block_on(async {
            let store = MemoryStore::with_capacity(2);
            store.put(&1, CacheEntry::new("a")).await?;
            store.put(&2, CacheEntry::new("b")).await?;
            store.put(&3, CacheEntry::new("c")).await?;

            assert!(store.get(&1).await?.is_none());
            assert!(store.get(&2).await?.is_some());
            assert!(store.get(&3).await?.is_some());
            assert_eq!(store.len(), Some(2));
            Ok::<(), Error>(())
        })
        .unwrap();
    }

    #[test]
    fn access_does_not_rescue_the_oldest() {
        block_on(async {
            let store = MemoryStore::with_capacity(2);
            store.put(&1, CacheEntry::new("a")).await?;
            store.put(&2, CacheEntry::new("b")).await?;

            // Touch key 1; under LRU this would protect it. Not here.
            let _ = store.get(&1).await?;

            store.put(&3, CacheEntry::new("c")).await?;
            assert!(store.get(&1).await?.is_none());
            assert!(store.get(&2).await?.is_some());
            Ok::<(), Error>(())
        })
        .unwrap();
    }

    #[test]
    fn overwriting_does_not_evict() {
        block_on(async {
            let store = MemoryStore::with_capacity(2);
            store.put(&1, CacheEntry::new("a")).await?;
            store.put(&2, CacheEntry::new("b")).await?;
            store.put(&1, CacheEntry::new("a2")).await?;

            assert_eq!(store.len(), Some(2));
            assert_eq!(*store.get(&1).await?.unwrap().value(), "a2");
            assert!(store.get(&2).await?.is_some());
            Ok::<(), Error>(())
        })
        .unwrap();
    }

    #[test]
    fn overwrite_refreshes_queue_position() {
        block_on(async {
            let store = MemoryStore::with_capacity(2);
            store.put(&1, CacheEntry::new("a")).await?;
            store.put(&2, CacheEntry::new("b")).await?;
            // Re-inserting key 1 moves it to the back of the queue,
            // so key 2 is now the eviction candidate.
            store.put(&1, CacheEntry::new("a2")).await?;
            store.put(&3, CacheEntry::new("c")).await?;

            assert!(store.get(&2).await?.is_none());
            assert!(store.get(&1).await?.is_some());
            assert!(store.get(&3).await?.is_some());
            Ok::<(), Error>(())
        })
        .unwrap();
    }

    #[test]
    fn unbounded_store_never_evicts() {
        block_on(async {
            let store = MemoryStore::new();
            for i in 0..100 {
                store.put(&i, CacheEntry::new(i)).await?;
            }
            assert_eq!(store.len(), Some(100));
            Ok::<(), Error>(())
        })
        .unwrap();
    }

    #[test]
    fn remove_and_clear() {
        block_on(async {
            let store = MemoryStore::with_capacity(3);
            store.put(&1, CacheEntry::new("a")).await?;
            store.put(&2, CacheEntry::new("b")).await?;

            store.remove(&1).await?;
            assert!(store.get(&1).await?.is_none());
            assert_eq!(store.len(), Some(1));

            // Removing an absent key is not an error.
            store.remove(&1).await?;

            store.clear().await?;
            assert_eq!(store.len(), Some(0));
            assert_eq!(store.is_empty(), Some(true));
            Ok::<(), Error>(())
        })
        .unwrap();
    }

    #[test]
    fn removal_keeps_eviction_order_exact() {
        block_on(async {
            let store = MemoryStore::with_capacity(2);
            store.put(&1, CacheEntry::new("a")).await?;
            store.put(&2, CacheEntry::new("b")).await?;
            store.remove(&1).await?;
            store.put(&3, CacheEntry::new("c")).await?;
            // Capacity is 2 and only {2, 3} are present; nothing evicts.
            store.put(&4, CacheEntry::new("d")).await?;

            assert!(store.get(&2).await?.is_none());
            assert!(store.get(&3).await?.is_some());
            assert!(store.get(&4).await?.is_some());
            Ok::<(), Error>(())
        })
        .unwrap();
    }

    #[test]
    fn hits_stamp_last_touch() {
        block_on(async {
            let control = ClockControl::new();
            let store = MemoryStore::new().with_clock(control.to_clock());
            store.put(&1, CacheEntry::new("a")).await?;

            control.advance(Duration::from_secs(5));
            let entry = store.get(&1).await?.unwrap();
            assert_eq!(entry.last_touch(), Some(control.system_time()));
            Ok::<(), Error>(())
        })
        .unwrap();
    }

    #[test]
    #[should_panic(expected = "max_entries must be at least 1")]
    fn zero_capacity_is_rejected() {
        let _ = MemoryStore::<u32, u32>::with_capacity(0);
    }
}
