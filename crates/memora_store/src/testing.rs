// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock storage backend for testing.
//!
//! [`RecordingStore`] keeps entries in memory, records every operation, and
//! supports failure injection so engine error paths (best-effort durable
//! writes, read failures treated as misses) can be exercised.

use std::{collections::HashMap, hash::Hash, sync::Arc};

use parking_lot::Mutex;

use crate::{CacheEntry, Error, Store};

/// A recorded storage operation with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp<K, V> {
    /// A get was performed for the given key.
    Get(K),
    /// A put was performed with the given key and entry.
    Put {
        /// The key that was written.
        key: K,
        /// The entry that was written.
        entry: CacheEntry<V>,
    },
    /// A remove was performed for the given key.
    Remove(K),
    /// A clear was performed.
    Clear,
}

type FailPredicate<K, V> = Box<dyn Fn(&StoreOp<K, V>) -> bool + Send + Sync>;

/// A configurable mock store for testing.
///
/// Stores entries in memory and records all operations for later
/// verification. A failure predicate installed via
/// [`fail_when`](RecordingStore::fail_when) makes matching operations
/// return a backend error instead of executing.
///
/// # Examples
///
/// ```
/// use memora_store::{CacheEntry, Store, testing::{RecordingStore, StoreOp}};
/// # futures::executor::block_on(async {
///
/// let store = RecordingStore::<String, i32>::new();
/// store.put(&"key".to_string(), CacheEntry::new(42)).await?;
///
/// let entry = store.get(&"key".to_string()).await?;
/// assert_eq!(*entry.unwrap().value(), 42);
///
/// // Inject a failure for every subsequent put.
/// store.fail_when(|op| matches!(op, StoreOp::Put { .. }));
/// assert!(store.put(&"key".to_string(), CacheEntry::new(7)).await.is_err());
/// # Ok::<(), memora_store::Error>(())
/// # });
/// ```
pub struct RecordingStore<K, V> {
    data: Arc<Mutex<HashMap<K, CacheEntry<V>>>>,
    operations: Arc<Mutex<Vec<StoreOp<K, V>>>>,
    fail_when: Arc<Mutex<Option<FailPredicate<K, V>>>>,
}

impl<K, V> std::fmt::Debug for RecordingStore<K, V>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingStore")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl<K, V> Clone for RecordingStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
        }
    }
}

impl<K, V> Default for RecordingStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RecordingStore<K, V> {
    /// Creates a new empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }

    /// Installs a predicate; operations it matches fail with a backend error.
    pub fn fail_when(&self, predicate: impl Fn(&StoreOp<K, V>) -> bool + Send + Sync + 'static) {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Removes any installed failure predicate.
    pub fn fail_never(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns all operations recorded so far.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp<K, V>>
    where
        K: Clone,
        V: Clone,
    {
        self.operations.lock().clone()
    }

    /// Returns how many operations matched the given predicate.
    #[must_use]
    pub fn count_ops(&self, predicate: impl Fn(&StoreOp<K, V>) -> bool) -> usize {
        self.operations.lock().iter().filter(|op| predicate(op)).count()
    }

    fn record(&self, op: StoreOp<K, V>) -> Result<(), Error> {
        let should_fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        self.operations.lock().push(op);
        if should_fail {
            return Err(Error::backend("injected failure"));
        }
        Ok(())
    }
}

impl<K, V> Store<K, V> for RecordingStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error> {
        self.record(StoreOp::Get(key.clone()))?;
        Ok(self.data.lock().get(key).cloned())
    }

    async fn put(&self, key: &K, entry: CacheEntry<V>) -> Result<(), Error> {
        self.record(StoreOp::Put {
            key: key.clone(),
            entry: entry.clone(),
        })?;
        self.data.lock().insert(key.clone(), entry);
        Ok(())
    }

    async fn remove(&self, key: &K) -> Result<(), Error> {
        self.record(StoreOp::Remove(key.clone()))?;
        self.data.lock().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.record(StoreOp::Clear)?;
        self.data.lock().clear();
        Ok(())
    }

    fn len(&self) -> Option<u64> {
        Some(self.data.lock().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    #[test]
    fn records_operations_in_order() {
        block_on(async {
            let store = RecordingStore::<String, i32>::new();
            store.put(&"a".to_string(), CacheEntry::new(1)).await?;
            let _ = store.get(&"a".to_string()).await?;
            store.remove(&"a".to_string()).await?;
            store.clear().await?;

            let ops = store.operations();
            assert_eq!(ops.len(), 4);
            assert!(matches!(ops[0], StoreOp::Put { .. }));
            assert!(matches!(ops[1], StoreOp::Get(_)));
            assert!(matches!(ops[2], StoreOp::Remove(_)));
            assert!(matches!(ops[3], StoreOp::Clear));
            Ok::<(), Error>(())
        })
        .unwrap();
    }

    #[test]
    fn injected_failure_leaves_data_untouched() {
        block_on(async {
            let store = RecordingStore::<String, i32>::new();
            store.fail_when(|op| matches!(op, StoreOp::Put { .. }));

            assert!(store.put(&"a".to_string(), CacheEntry::new(1)).await.is_err());
            assert_eq!(store.len(), Some(0));

            store.fail_never();
            assert!(store.put(&"a".to_string(), CacheEntry::new(1)).await.is_ok());
            assert_eq!(store.len(), Some(1));
        });
    }
}
